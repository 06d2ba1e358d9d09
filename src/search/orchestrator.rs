use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

use super::relaxation::{dilution_groups, dilution_target, drop_one_groups, GeneralConstraints};
use super::{Phase, ResultSet, SearchReport};
use crate::conditions::{Condition, ConditionSet, ANCHOR_VARIABLE};
use crate::config::SearchConfig;
use crate::error::{Result, SimilarError};
use crate::sparql::{QueryBuilder, QueryRunner};

/// Runs the multi-phase relaxation search against a [`QueryRunner`].
///
/// Phases run strictly in order and queries strictly one after another. The
/// search returns as soon as `limit` distinct ids have been collected; no
/// further queries are issued after that point.
///
/// 1. exact: every condition at once
/// 2. drop-one: each condition left out in turn (small condition sets only)
/// 3. core-only: value-relevant conditions only
/// 4. dilution: prefix and random subsets for each retention fraction
pub struct SearchOrchestrator<'a, R: Rng> {
    runner: &'a dyn QueryRunner,
    builder: QueryBuilder,
    settings: SearchConfig,
    rng: R,
}

impl<'a> SearchOrchestrator<'a, StdRng> {
    pub fn new(runner: &'a dyn QueryRunner, settings: &SearchConfig) -> Self {
        Self::with_rng(runner, settings, StdRng::from_entropy())
    }
}

/// Per-search mutable state.
struct Progress {
    results: ResultSet,
    queries_issued: usize,
    succeeded: usize,
    last_error: Option<SimilarError>,
    limit: usize,
}

impl Progress {
    fn satisfied(&self) -> bool {
        self.results.len() >= self.limit
    }
}

impl<'a, R: Rng + Send> SearchOrchestrator<'a, R> {
    /// Use a caller-supplied random source for dilution sampling.
    pub fn with_rng(runner: &'a dyn QueryRunner, settings: &SearchConfig, rng: R) -> Self {
        Self {
            runner,
            builder: QueryBuilder::new(settings.max_query_length),
            settings: settings.clone(),
            rng,
        }
    }

    /// Find up to `limit` entities similar to `entity_id`.
    ///
    /// # Arguments
    ///
    /// * `entity_id` - Reference entity, excluded from results and used for the statement ceiling
    /// * `conditions` - Prioritized conditions derived from the reference entity
    /// * `limit` - Number of distinct ids to collect before stopping
    ///
    /// # Returns
    ///
    /// A [`SearchReport`] with at most `limit` ids in discovery order, the
    /// number of queries sent and the phase that reached the limit (if any).
    ///
    /// # Errors
    ///
    /// - [`SimilarError::QuerySize`] when a single group cannot fit in one query.
    ///   No further queries are sent.
    /// - The last [`SimilarError::QueryExecution`] when every query sent failed.
    ///   Individual failures are otherwise logged and skipped.
    pub async fn search(
        &mut self,
        entity_id: &str,
        conditions: &ConditionSet,
        limit: usize,
    ) -> Result<SearchReport> {
        let start = Instant::now();
        let all = conditions.all();
        let total = all.len();
        let general = GeneralConstraints::new(entity_id, total, self.settings.statement_count_factor);
        let mut progress = Progress {
            results: ResultSet::new(),
            queries_issued: 0,
            succeeded: 0,
            last_error: None,
            limit,
        };

        log::info!(
            "Searching entities similar to {} with {} conditions (limit {}, statement ceiling {})",
            entity_id,
            total,
            limit,
            general.statement_ceiling()
        );

        let satisfied_by = self.run_phases(&all, conditions, &general, &mut progress).await?;

        if progress.succeeded == 0 {
            if let Some(error) = progress.last_error.take() {
                log::error!(
                    "All {} queries for {} failed",
                    progress.queries_issued,
                    entity_id
                );
                return Err(error);
            }
        }

        match satisfied_by {
            Some(phase) => log::info!(
                "Found {} entities for {} in phase {} after {} queries ({:?})",
                limit,
                entity_id,
                phase,
                progress.queries_issued,
                start.elapsed()
            ),
            None => log::info!(
                "Relaxation exhausted for {}: {} of {} entities after {} queries ({:?})",
                entity_id,
                progress.results.len(),
                limit,
                progress.queries_issued,
                start.elapsed()
            ),
        }

        Ok(SearchReport {
            entities: progress.results.into_truncated(limit),
            queries_issued: progress.queries_issued,
            satisfied_by,
        })
    }

    async fn run_phases(
        &mut self,
        all: &[Condition],
        conditions: &ConditionSet,
        general: &GeneralConstraints,
        progress: &mut Progress,
    ) -> Result<Option<Phase>> {
        let total = all.len();
        let fields = [ANCHOR_VARIABLE];

        // Exact match
        let query = self.builder.build_query(&fields, &general.apply(all), progress.limit)?;
        if self.issue(Phase::Exact, vec![query], progress).await {
            return Ok(Some(Phase::Exact));
        }

        // Drop one condition at a time
        if total < self.settings.drop_one_max_conditions {
            let groups: Vec<Vec<String>> = drop_one_groups(all)
                .iter()
                .map(|group| general.apply(group))
                .collect();
            let queries = self.builder.build_union_queries(&fields, &groups, progress.limit)?;
            if self.issue(Phase::DropOne, queries, progress).await {
                return Ok(Some(Phase::DropOne));
            }
        } else {
            log::debug!("Skipping drop-one phase: {} conditions", total);
        }

        // Value-relevant conditions only
        if !conditions.value_relevant.is_empty() {
            let query = self.builder.build_query(
                &fields,
                &general.apply(&conditions.value_relevant),
                progress.limit,
            )?;
            if self.issue(Phase::CoreOnly, vec![query], progress).await {
                return Ok(Some(Phase::CoreOnly));
            }
        }

        // Progressive dilution
        let fractions = self.settings.dilution_fractions.clone();
        for fraction in fractions {
            let target = match dilution_target(total, fraction) {
                Some(0) => break,
                Some(target) => target,
                None => continue,
            };

            let samples = self.settings.max_samples_per_fraction.min(total);
            let groups: Vec<Vec<String>> =
                dilution_groups(all, target, fraction, samples, &mut self.rng)
                    .iter()
                    .map(|group| general.apply(group))
                    .collect();
            log::debug!(
                "Dilution {:.2}: {} of {} conditions, {} groups",
                fraction,
                target,
                total,
                groups.len()
            );

            let queries = self.builder.build_union_queries(&fields, &groups, progress.limit)?;
            if self.issue(Phase::Dilution, queries, progress).await {
                return Ok(Some(Phase::Dilution));
            }
        }

        Ok(None)
    }

    /// Run `queries` in order, merging results; true once the limit is reached.
    async fn issue(&self, phase: Phase, queries: Vec<String>, progress: &mut Progress) -> bool {
        for query in queries {
            let start = Instant::now();
            progress.queries_issued += 1;

            match self.runner.run(&query).await {
                Ok(batch) => {
                    progress.succeeded += 1;
                    let fetched = batch.len();
                    let added = progress.results.extend(batch);
                    log::debug!(
                        "Phase {}: query #{} ({} bytes) returned {} ids, {} new, {:?}",
                        phase,
                        progress.queries_issued,
                        query.len(),
                        fetched,
                        added,
                        start.elapsed()
                    );
                }
                Err(e) => {
                    log::warn!(
                        "Phase {}: query #{} failed, continuing: {}",
                        phase,
                        progress.queries_issued,
                        e
                    );
                    progress.last_error = Some(e);
                }
            }

            if progress.satisfied() {
                return true;
            }
        }
        false
    }
}
