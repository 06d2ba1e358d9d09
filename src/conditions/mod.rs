//! Match conditions derived from an entity's statements.
//!
//! A condition is one SPARQL triple pattern over the shared `?item` anchor
//! variable. Conditions are ordered by a [`PriorityKey`] so the most important
//! ones come first.

mod builder;

pub use builder::ConditionBuilder;

use serde::Serialize;
use std::fmt;

/// Anchor variable shared by every condition in a query.
pub const ANCHOR_VARIABLE: &str = "?item";

/// Composite sort key: position in the importance ordering, then encounter order.
///
/// Unranked properties get the length of the importance list as their index,
/// so they sort after every ranked property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PriorityKey {
    pub importance: usize,
    pub sequence: u64,
}

/// Whether a condition pins a concrete value or only requires the property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConditionKind {
    /// `?item wdt:P wd:Q .`
    ValueRelevant { entity: String },
    /// `?item wdt:P ?var .`
    ValueIrrelevant { variable: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub property: String,
    pub key: PriorityKey,
    #[serde(flatten)]
    pub kind: ConditionKind,
}

impl Condition {
    pub fn is_value_relevant(&self) -> bool {
        matches!(self.kind, ConditionKind::ValueRelevant { .. })
    }

    /// SPARQL triple pattern for this condition.
    pub fn to_sparql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConditionKind::ValueRelevant { entity } => {
                write!(f, "{} wdt:{} wd:{} .", ANCHOR_VARIABLE, self.property, entity)
            }
            ConditionKind::ValueIrrelevant { variable } => {
                write!(f, "{} wdt:{} ?{} .", ANCHOR_VARIABLE, self.property, variable)
            }
        }
    }
}

/// Conditions partitioned by kind, each list sorted by ascending priority key.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConditionSet {
    pub value_relevant: Vec<Condition>,
    pub value_irrelevant: Vec<Condition>,
}

impl ConditionSet {
    pub fn len(&self) -> usize {
        self.value_relevant.len() + self.value_irrelevant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every condition, merged and sorted by priority key.
    pub fn all(&self) -> Vec<Condition> {
        let mut all: Vec<Condition> = self
            .value_relevant
            .iter()
            .chain(self.value_irrelevant.iter())
            .cloned()
            .collect();
        all.sort_by_key(|c| c.key);
        all
    }
}
