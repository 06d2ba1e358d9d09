//! Wikibase HTTP client for entity data and the sorted property list.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::sync::OnceLock;

use super::{EntityData, EntitySource, PropertyRanking};
use crate::config::EndpointsConfig;
use crate::error::{Result, SimilarError};
use crate::remote::{build_http_client, ensure_success, fill_url_template};

/// Fetches `Special:EntityData` payloads and `MediaWiki:Wikibase-SortedProperties`.
pub struct WikibaseClient {
    client: Client,
    entity_data_url: String,
    sorted_properties_url: String,
}

impl WikibaseClient {
    pub fn new(endpoints: &EndpointsConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(endpoints)?,
            entity_data_url: endpoints.entity_data_url.clone(),
            sorted_properties_url: endpoints.sorted_properties_url.clone(),
        })
    }
}

#[async_trait]
impl EntitySource for WikibaseClient {
    async fn fetch_entity(&self, entity_id: &str) -> Result<EntityData> {
        let url = fill_url_template(&self.entity_data_url, entity_id);
        log::debug!("Fetching entity data from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SimilarError::EntityData(format!("Network error: {}", e)))?;
        let response =
            ensure_success(response, "Entity data endpoint", SimilarError::EntityData).await?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| SimilarError::EntityData(format!("Failed to parse entity data: {}", e)))?;

        EntityData::from_entity_data_response(&payload, entity_id)
    }
}

#[async_trait]
impl PropertyRanking for WikibaseClient {
    async fn sorted_properties(&self) -> Result<Vec<String>> {
        let response = self.client.get(&self.sorted_properties_url).send().await?;
        let response =
            ensure_success(response, "Sorted properties page", SimilarError::QueryExecution).await?;
        let raw = response.text().await?;

        let properties = parse_sorted_properties(&raw);
        log::debug!("Loaded {} sorted properties", properties.len());
        Ok(properties)
    }
}

/// Extract property ids from the raw wikitext list (`* P31` lines).
pub fn parse_sorted_properties(raw: &str) -> Vec<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"\n\* (P[1-9]\d*)").expect("valid regex"));

    pattern
        .captures_iter(raw)
        .map(|caps| caps[1].to_string())
        .collect()
}
