use std::collections::{HashMap, HashSet};

use serde_json::Value;
use uuid::Uuid;

use super::{Condition, ConditionKind, ConditionSet, PriorityKey};
use crate::entity::{EntityData, Rank, StatementValue};
use crate::error::Result;

/// Hex characters taken from a v4 UUID for anonymous variable names (48 bits).
const VARIABLE_HEX_LEN: usize = 12;

/// Turns entity statements into a prioritized [`ConditionSet`].
///
/// One builder serves one search: its sequence counter and the set of issued
/// variable names are reset at the start of every [`build`](Self::build).
pub struct ConditionBuilder {
    importance: HashMap<String, usize>,
    unranked: usize,
    sequence: u64,
    variables: HashSet<String>,
}

impl ConditionBuilder {
    /// `sorted_properties` is the importance ordering, most important first.
    pub fn new(sorted_properties: &[String]) -> Self {
        let mut importance = HashMap::with_capacity(sorted_properties.len());
        for (idx, property) in sorted_properties.iter().enumerate() {
            importance.entry(property.clone()).or_insert(idx);
        }

        Self {
            importance,
            unranked: sorted_properties.len(),
            sequence: 0,
            variables: HashSet::new(),
        }
    }

    /// Build conditions straight from an entity JSON object.
    ///
    /// Fails if the object carries no `claims` section.
    pub fn build_from_json(&mut self, entity: &Value) -> Result<ConditionSet> {
        let data = EntityData::from_json(entity)?;
        Ok(self.build(&data))
    }

    /// Build the condition set for `entity`.
    ///
    /// Preferred rank, if present on any statement, excludes every
    /// non-preferred statement. Deprecated statements and statements without a
    /// concrete value never produce conditions.
    pub fn build(&mut self, entity: &EntityData) -> ConditionSet {
        self.sequence = 0;
        self.variables.clear();

        let has_preferred = entity.statements().any(|s| s.rank == Rank::Preferred);

        let mut set = ConditionSet::default();
        for (property, statements) in &entity.claims {
            for statement in statements {
                if statement.rank == Rank::Deprecated {
                    continue;
                }
                if has_preferred && statement.rank != Rank::Preferred {
                    continue;
                }

                // Statements may omit the property in their snak; fall back to the claims key
                let property = if statement.property().is_empty() {
                    property.as_str()
                } else {
                    statement.property()
                };

                match statement.value() {
                    StatementValue::Absent => continue,
                    StatementValue::Entity(id) => {
                        let key = self.next_key(property);
                        set.value_relevant.push(Condition {
                            property: property.to_string(),
                            key,
                            kind: ConditionKind::ValueRelevant { entity: id },
                        });
                    }
                    StatementValue::Other => {
                        let key = self.next_key(property);
                        let variable = self.fresh_variable();
                        set.value_irrelevant.push(Condition {
                            property: property.to_string(),
                            key,
                            kind: ConditionKind::ValueIrrelevant { variable },
                        });
                    }
                }
            }
        }

        set.value_relevant.sort_by_key(|c| c.key);
        set.value_irrelevant.sort_by_key(|c| c.key);

        log::debug!(
            "Built {} value-relevant and {} value-irrelevant conditions (preferred only: {})",
            set.value_relevant.len(),
            set.value_irrelevant.len(),
            has_preferred
        );

        set
    }

    fn next_key(&mut self, property: &str) -> PriorityKey {
        let importance = self
            .importance
            .get(property)
            .copied()
            .unwrap_or(self.unranked);
        let key = PriorityKey {
            importance,
            sequence: self.sequence,
        };
        self.sequence += 1;
        key
    }

    fn fresh_variable(&mut self) -> String {
        loop {
            let hex = Uuid::new_v4().simple().to_string();
            let name = format!("v{}", &hex[..VARIABLE_HEX_LEN]);
            if self.variables.insert(name.clone()) {
                return name;
            }
        }
    }
}
