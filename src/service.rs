//! Caller-facing entry point: validate input, derive conditions, run the search.

use regex::Regex;
use std::sync::OnceLock;

use crate::conditions::{ConditionBuilder, ConditionSet};
use crate::config::SearchConfig;
use crate::entity::{EntitySource, PropertyRanking};
use crate::error::{Result, SimilarError};
use crate::search::{SearchOrchestrator, SearchReport};
use crate::sparql::QueryRunner;

/// A validated similarity lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityRequest {
    entity_id: String,
    limit: usize,
}

impl SimilarityRequest {
    /// Validate `entity_id` (`Q` plus 1-10 digits, no leading zero, any case)
    /// and clamp `limit` into `[1, max_limit]`.
    pub fn new(entity_id: &str, limit: i64, max_limit: usize) -> Result<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern =
            PATTERN.get_or_init(|| Regex::new(r"(?i)^Q[1-9]\d{0,9}$").expect("valid regex"));

        if !pattern.is_match(entity_id) {
            return Err(SimilarError::InvalidInput(format!(
                "Invalid entity id {} given.",
                entity_id
            )));
        }

        let max_limit = max_limit.max(1) as i64;
        Ok(Self {
            entity_id: entity_id.to_uppercase(),
            limit: limit.clamp(1, max_limit) as usize,
        })
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Fetch the entity and the property ranking, then build its conditions.
pub async fn derive_conditions(
    entity_id: &str,
    entities: &dyn EntitySource,
    ranking: &dyn PropertyRanking,
) -> Result<ConditionSet> {
    let entity = entities.fetch_entity(entity_id).await?;
    let sorted_properties = ranking.sorted_properties().await?;

    Ok(ConditionBuilder::new(&sorted_properties).build(&entity))
}

/// Run the whole lookup for `request`.
///
/// # Arguments
///
/// * `request` - Validated entity id and result limit
/// * `entities` - Source of the reference entity's statements
/// * `ranking` - Property importance ordering, most important first
/// * `runner` - SPARQL endpoint the relaxation queries are sent to
/// * `settings` - Query length budget, drop-one threshold and dilution schedule
///
/// # Returns
///
/// The [`SearchReport`] of the relaxation search. Its `entities` hold at most
/// `request.limit()` ids and never the reference entity itself.
///
/// # Errors
///
/// - [`SimilarError::EntityData`] when the entity cannot be fetched or decoded
/// - [`SimilarError::NoConditions`] when no statement yields a condition
/// - Any error from [`SearchOrchestrator::search`]
pub async fn find_similar(
    request: &SimilarityRequest,
    entities: &dyn EntitySource,
    ranking: &dyn PropertyRanking,
    runner: &dyn QueryRunner,
    settings: &SearchConfig,
) -> Result<SearchReport> {
    let conditions = derive_conditions(request.entity_id(), entities, ranking).await?;
    if conditions.is_empty() {
        return Err(SimilarError::NoConditions(request.entity_id().to_string()));
    }

    SearchOrchestrator::new(runner, settings)
        .search(request.entity_id(), &conditions, request.limit())
        .await
}
