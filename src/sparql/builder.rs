use crate::error::{Result, SimilarError};

/// Assembles length-bounded SPARQL SELECT queries from textual conditions.
///
/// The builder knows nothing about what a condition means; each group is a
/// list of already-rendered WHERE clauses.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    max_query_length: usize,
}

impl QueryBuilder {
    pub fn new(max_query_length: usize) -> Self {
        Self { max_query_length }
    }

    /// Build a single query requiring all `conditions`.
    ///
    /// Fails with [`SimilarError::QuerySize`] if it does not fit the length budget.
    pub fn build_query<S: AsRef<str>>(
        &self,
        fields: &[&str],
        conditions: &[S],
        limit: usize,
    ) -> Result<String> {
        let query = render::<S, _>(fields, std::slice::from_ref(&conditions), limit);
        if query.len() > self.max_query_length {
            return Err(size_error(query.len(), self.max_query_length));
        }
        Ok(query)
    }

    /// Build UNION queries covering every group, in order.
    ///
    /// Groups are packed greedily: each query takes as many of the remaining
    /// leading groups as fit within the length budget. Every group ends up in
    /// exactly one query. A group that does not fit on its own is an error.
    pub fn build_union_queries<S: AsRef<str>>(
        &self,
        fields: &[&str],
        groups: &[Vec<S>],
        limit: usize,
    ) -> Result<Vec<String>> {
        let mut queries = Vec::new();
        let mut remaining = groups;
        let mut chunk_size = remaining.len();

        while !remaining.is_empty() {
            let query = render::<S, _>(fields, &remaining[..chunk_size], limit);

            if query.len() > self.max_query_length {
                if chunk_size == 1 {
                    return Err(size_error(query.len(), self.max_query_length));
                }
                chunk_size -= 1;
                continue;
            }

            log::debug!(
                "Built query with {} union group(s), {} bytes",
                chunk_size,
                query.len()
            );
            queries.push(query);
            remaining = &remaining[chunk_size..];
            chunk_size = remaining.len();
        }

        Ok(queries)
    }
}

fn size_error(length: usize, max: usize) -> SimilarError {
    SimilarError::QuerySize(format!(
        "Could not build a single query with the specified length limit ({} > {})",
        length, max
    ))
}

fn render<S: AsRef<str>, G: AsRef<[S]>>(fields: &[&str], groups: &[G], limit: usize) -> String {
    let mut query = format!("SELECT {} WHERE {{\n", fields.join(" "));

    let parts: Vec<String> = groups
        .iter()
        .map(|group| {
            group
                .as_ref()
                .iter()
                .map(|c| c.as_ref())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();

    if parts.len() > 1 {
        query.push('{');
        query.push_str(&parts.join("\n} UNION {\n"));
        query.push_str("}\n");
    } else if let Some(part) = parts.first() {
        query.push_str(part);
        query.push('\n');
    }

    query.push_str(&format!("}} LIMIT {}", limit));
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(conditions: &[&str]) -> Vec<String> {
        conditions.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_build_query_single_group() {
        let builder = QueryBuilder::new(4000);
        let query = builder
            .build_query(&["?item"], &["?item wdt:P31 wd:Q5 .", "?item wdt:P21 wd:Q6581097 ."], 3)
            .unwrap();

        assert_eq!(
            query,
            "SELECT ?item WHERE {\n?item wdt:P31 wd:Q5 .\n?item wdt:P21 wd:Q6581097 .\n} LIMIT 3"
        );
        assert!(!query.contains("UNION"));
    }

    #[test]
    fn test_union_query_format() {
        let builder = QueryBuilder::new(4000);
        let queries = builder
            .build_union_queries(&["?item"], &[group(&["a ."]), group(&["b .", "c ."])], 5)
            .unwrap();

        assert_eq!(queries.len(), 1);
        assert_eq!(
            queries[0],
            "SELECT ?item WHERE {\n{a .\n} UNION {\nb .\nc .}\n} LIMIT 5"
        );
    }

    #[test]
    fn test_build_query_too_long() {
        let builder = QueryBuilder::new(20);
        let err = builder
            .build_query(&["?item"], &["?item wdt:P31 wd:Q5 ."], 3)
            .unwrap_err();
        assert!(matches!(err, SimilarError::QuerySize(_)));
    }

    #[test]
    fn test_union_queries_split_preserving_order() {
        let groups: Vec<Vec<String>> = (0..10)
            .map(|i| group(&[&format!("?item wdt:P{} wd:Q{} .", i + 1, i + 1)]))
            .collect();

        let single = QueryBuilder::new(10_000)
            .build_union_queries(&["?item"], &groups, 3)
            .unwrap();
        let max = single[0].len() / 3;

        let builder = QueryBuilder::new(max);
        let queries = builder.build_union_queries(&["?item"], &groups, 3).unwrap();
        assert!(queries.len() > 1);

        let mut seen = Vec::new();
        for query in &queries {
            assert!(query.len() <= max);
            for (idx, g) in groups.iter().enumerate() {
                if query.contains(&format!("{}\n", g[0])) || query.contains(&format!("{}}}", g[0])) {
                    seen.push(idx);
                }
            }
        }
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_union_queries_greedy_packing() {
        let groups = vec![group(&["aaaa ."]), group(&["bbbb ."]), group(&["cccc ."])];
        let two = QueryBuilder::new(10_000)
            .build_union_queries(&["?item"], &groups[..2], 1)
            .unwrap();

        // Budget fits exactly two groups: first query takes two, second the rest
        let builder = QueryBuilder::new(two[0].len());
        let queries = builder.build_union_queries(&["?item"], &groups, 1).unwrap();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].contains("aaaa") && queries[0].contains("bbbb"));
        assert!(queries[1].contains("cccc") && !queries[1].contains("UNION"));
    }

    #[test]
    fn test_union_queries_single_group_too_long() {
        let groups = vec![group(&["short ."]), group(&["this group is far too long to fit ."])];
        let builder = QueryBuilder::new(45);
        let err = builder.build_union_queries(&["?item"], &groups, 1).unwrap_err();
        assert!(matches!(err, SimilarError::QuerySize(_)));
    }

    #[test]
    fn test_union_queries_empty_input() {
        let groups: Vec<Vec<String>> = Vec::new();
        let queries = QueryBuilder::new(100).build_union_queries(&["?item"], &groups, 1).unwrap();
        assert!(queries.is_empty());
    }
}
