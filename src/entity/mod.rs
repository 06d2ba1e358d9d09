//! Wikibase entity payloads and the remote sources that provide them.
//!
//! Statements are decoded from the `Special:EntityData` JSON shape. Property
//! order of the `claims` object is preserved so encounter order stays stable.

mod client;

pub use client::{parse_sorted_properties, WikibaseClient};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, SimilarError};

/// Provides the raw data of a single entity.
#[async_trait]
pub trait EntitySource: Send + Sync {
    async fn fetch_entity(&self, entity_id: &str) -> Result<EntityData>;
}

/// Provides the property importance ordering, most important first.
#[async_trait]
pub trait PropertyRanking: Send + Sync {
    async fn sorted_properties(&self) -> Result<Vec<String>>;
}

/// Statement precedence marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Preferred,
    Normal,
    Deprecated,
}

/// Main snak of a statement.
#[derive(Debug, Clone, Deserialize)]
pub struct Snak {
    pub snaktype: String,
    #[serde(default)]
    pub property: String,
    #[serde(default)]
    pub datavalue: Option<DataValue>,
}

/// Typed value of a `value` snak.
#[derive(Debug, Clone, Deserialize)]
pub struct DataValue {
    #[serde(rename = "type")]
    pub value_type: String,
    #[serde(default)]
    pub value: Value,
}

/// One attribute statement about an entity.
#[derive(Debug, Clone, Deserialize)]
pub struct Statement {
    pub rank: Rank,
    pub mainsnak: Snak,
}

/// What a statement's main snak says, reduced to what conditions care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementValue {
    /// Refers to another entity by id
    Entity(String),
    /// Any other concrete value (string, time, quantity, ...)
    Other,
    /// `novalue` / `somevalue`, or a value snak without usable data
    Absent,
}

impl Statement {
    pub fn property(&self) -> &str {
        &self.mainsnak.property
    }

    pub fn value(&self) -> StatementValue {
        if self.mainsnak.snaktype != "value" {
            return StatementValue::Absent;
        }
        match &self.mainsnak.datavalue {
            Some(dv) if dv.value_type == "wikibase-entityid" => dv
                .value
                .get("id")
                .and_then(Value::as_str)
                .map(|id| StatementValue::Entity(id.to_string()))
                .unwrap_or(StatementValue::Other),
            Some(_) => StatementValue::Other,
            None => StatementValue::Absent,
        }
    }
}

/// Statements of one entity grouped by property, in payload order.
#[derive(Debug, Clone, Default)]
pub struct EntityData {
    pub claims: Vec<(String, Vec<Statement>)>,
}

impl EntityData {
    /// Decode a single entity object (the value under `entities.<id>`).
    ///
    /// Fails if the object has no `claims` section at all.
    pub fn from_json(entity: &Value) -> Result<Self> {
        let claims = entity
            .get("claims")
            .ok_or_else(|| SimilarError::EntityData("Given entity data has no claims.".to_string()))?;

        // An entity without statements serialises `claims` as `[]`
        if claims.as_array().map_or(false, Vec::is_empty) {
            return Ok(Self::default());
        }

        let claims: &Map<String, Value> = claims.as_object().ok_or_else(|| {
            SimilarError::EntityData("Entity claims must be an object keyed by property".to_string())
        })?;

        let mut grouped = Vec::with_capacity(claims.len());
        for (property, statements) in claims {
            let statements: Vec<Statement> = serde_json::from_value(statements.clone())
                .map_err(|e| {
                    SimilarError::EntityData(format!("Malformed statements for {}: {}", property, e))
                })?;
            grouped.push((property.clone(), statements));
        }

        Ok(Self { claims: grouped })
    }

    /// Decode a full `Special:EntityData` response and pick out `entity_id`.
    pub fn from_entity_data_response(response: &Value, entity_id: &str) -> Result<Self> {
        let entity = response
            .get("entities")
            .and_then(|entities| entities.get(entity_id))
            .ok_or_else(|| {
                SimilarError::EntityData(format!(
                    "Invalid Special:EntityData response for {}",
                    entity_id
                ))
            })?;
        Self::from_json(entity)
    }

    /// All statements in payload order.
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.claims.iter().flat_map(|(_, statements)| statements.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity_statement(property: &str, id: &str, rank: &str) -> Value {
        json!({
            "rank": rank,
            "mainsnak": {
                "snaktype": "value",
                "property": property,
                "datavalue": { "type": "wikibase-entityid", "value": { "id": id } }
            }
        })
    }

    #[test]
    fn test_missing_claims_is_error() {
        let err = EntityData::from_json(&json!({ "id": "Q1" })).unwrap_err();
        assert!(matches!(err, SimilarError::EntityData(_)));
    }

    #[test]
    fn test_empty_claims_array() {
        let data = EntityData::from_json(&json!({ "claims": [] })).unwrap();
        assert!(data.claims.is_empty());
    }

    #[test]
    fn test_preserves_property_order() {
        let data = EntityData::from_json(&json!({
            "claims": {
                "P31": [entity_statement("P31", "Q5", "normal")],
                "P21": [entity_statement("P21", "Q6581097", "normal")],
                "P106": [entity_statement("P106", "Q36180", "normal")]
            }
        }))
        .unwrap();

        let properties: Vec<&str> = data.claims.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(properties, vec!["P31", "P21", "P106"]);
    }

    #[test]
    fn test_statement_values() {
        let data = EntityData::from_json(&json!({
            "claims": {
                "P31": [entity_statement("P31", "Q5", "preferred")],
                "P569": [{
                    "rank": "normal",
                    "mainsnak": {
                        "snaktype": "value",
                        "property": "P569",
                        "datavalue": { "type": "time", "value": { "time": "+1952-03-11T00:00:00Z" } }
                    }
                }],
                "P40": [{
                    "rank": "deprecated",
                    "mainsnak": { "snaktype": "novalue", "property": "P40" }
                }]
            }
        }))
        .unwrap();

        let statements: Vec<&Statement> = data.statements().collect();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0].rank, Rank::Preferred);
        assert_eq!(statements[0].value(), StatementValue::Entity("Q5".to_string()));
        assert_eq!(statements[1].value(), StatementValue::Other);
        assert_eq!(statements[2].rank, Rank::Deprecated);
        assert_eq!(statements[2].value(), StatementValue::Absent);
    }

    #[test]
    fn test_response_without_entity() {
        let response = json!({ "entities": { "Q2": { "claims": {} } } });
        assert!(EntityData::from_entity_data_response(&response, "Q1").is_err());
        assert!(EntityData::from_entity_data_response(&response, "Q2").is_ok());
    }
}
