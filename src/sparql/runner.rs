use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::EndpointsConfig;
use crate::error::{Result, SimilarError};
use crate::remote::{build_http_client, ensure_success, fill_url_template};

/// Executes one SPARQL query and returns the candidate ids it yields.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn run(&self, query: &str) -> Result<Vec<String>>;
}

/// SPARQL 1.1 JSON results (`application/sparql-results+json`)
#[derive(Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Deserialize)]
struct SparqlResults {
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Deserialize)]
struct SparqlTerm {
    value: String,
}

/// Runs queries against a remote SPARQL endpoint over HTTP GET.
pub struct SparqlQueryRunner {
    client: Client,
    endpoint: String,
    column: String,
}

impl SparqlQueryRunner {
    pub fn new(endpoints: &EndpointsConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(endpoints)?,
            endpoint: endpoints.sparql_url.clone(),
            column: "item".to_string(),
        })
    }
}

#[async_trait]
impl QueryRunner for SparqlQueryRunner {
    async fn run(&self, query: &str) -> Result<Vec<String>> {
        let start = std::time::Instant::now();
        let url = fill_url_template(&self.endpoint, query);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/sparql-results+json")
            .send()
            .await
            .map_err(|e| SimilarError::QueryExecution(format!("Network error: {}", e)))?;
        let response =
            ensure_success(response, "SPARQL endpoint", SimilarError::QueryExecution).await?;

        let body = response
            .text()
            .await
            .map_err(|e| SimilarError::QueryExecution(format!("Failed to read response: {}", e)))?;
        let ids = parse_bindings(&body, &self.column)?;

        log::debug!("SPARQL query returned {} rows in {:?}", ids.len(), start.elapsed());
        Ok(ids)
    }
}

/// Pull the `column` binding out of every result row, reduced to entity ids.
pub fn parse_bindings(body: &str, column: &str) -> Result<Vec<String>> {
    let parsed: SparqlResponse = serde_json::from_str(body)
        .map_err(|e| SimilarError::QueryExecution(format!("Failed to parse SPARQL response: {}", e)))?;

    Ok(parsed
        .results
        .bindings
        .into_iter()
        .filter_map(|mut row| row.remove(column))
        .map(|term| entity_id_from_uri(&term.value).to_string())
        .collect())
}

/// `http://www.wikidata.org/entity/Q42` -> `Q42`
pub fn entity_id_from_uri(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bindings() {
        let body = r#"{
            "head": { "vars": ["item"] },
            "results": { "bindings": [
                { "item": { "type": "uri", "value": "http://www.wikidata.org/entity/Q42" } },
                { "other": { "type": "literal", "value": "x" } },
                { "item": { "type": "uri", "value": "http://www.wikidata.org/entity/Q1339" } }
            ] }
        }"#;

        assert_eq!(parse_bindings(body, "item").unwrap(), vec!["Q42", "Q1339"]);
    }

    #[test]
    fn test_parse_bindings_empty() {
        let body = r#"{ "head": { "vars": ["item"] }, "results": { "bindings": [] } }"#;
        assert!(parse_bindings(body, "item").unwrap().is_empty());
    }

    #[test]
    fn test_parse_bindings_malformed() {
        let err = parse_bindings("<html>timeout</html>", "item").unwrap_err();
        assert!(matches!(err, SimilarError::QueryExecution(_)));
    }

    #[test]
    fn test_entity_id_from_uri() {
        assert_eq!(entity_id_from_uri("http://www.wikidata.org/entity/Q5"), "Q5");
        assert_eq!(entity_id_from_uri("Q5"), "Q5");
    }
}
