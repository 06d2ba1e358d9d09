use std::collections::HashSet;

/// Distinct candidate ids in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch, keeping only ids not seen before. Returns how many were new.
    pub fn extend<I: IntoIterator<Item = String>>(&mut self, batch: I) -> usize {
        let before = self.ordered.len();
        for id in batch {
            if self.seen.insert(id.clone()) {
                self.ordered.push(id);
            }
        }
        self.ordered.len() - before
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// First `limit` ids in first-seen order.
    pub fn into_truncated(mut self, limit: usize) -> Vec<String> {
        self.ordered.truncate(limit);
        self.ordered
    }
}
