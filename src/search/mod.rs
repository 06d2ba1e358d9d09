//! Relaxation search: from a condition set to a list of similar entity ids.

mod orchestrator;
pub mod relaxation;
mod results;

pub use orchestrator::SearchOrchestrator;
pub use results::ResultSet;

use serde::Serialize;
use std::fmt;

/// Relaxation phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Exact,
    DropOne,
    CoreOnly,
    Dilution,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Exact => "exact",
            Phase::DropOne => "drop-one",
            Phase::CoreOnly => "core-only",
            Phase::Dilution => "dilution",
        };
        f.write_str(name)
    }
}

/// Outcome of one search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    /// Distinct ids in first-seen order, at most `limit` of them.
    pub entities: Vec<String>,
    pub queries_issued: usize,
    /// Phase whose results reached the limit, `None` if relaxation ran out.
    pub satisfied_by: Option<Phase>,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::DropOne.to_string(), "drop-one");
        assert_eq!(serde_json::to_string(&Phase::CoreOnly).unwrap(), "\"core-only\"");
    }
}
