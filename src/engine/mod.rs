//! Recommendation engine facade.
//!
//! Owns the interactive read path and the per-user precompute run. A run
//! walks LoadInputs -> BuildFeatures -> Score -> Rank -> WriteCache and is
//! stateless between attempts: every attempt redoes the full pipeline and
//! the cache write is a full overwrite, so re-running is idempotent. The
//! caller (the background job or an external scheduler) drives the bounded
//! retry loop by passing an explicit attempt counter.

use crate::catalog_store::CatalogStore;
use crate::features::build_features;
use crate::history_store::{HistoryStore, NO_ACTIVE_USER};
use crate::reco_cache::{CacheEntry, RecoCache};
use crate::scoring::{rank_scores, RecommendationConfig, RecommendationScore, Scorer};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Maximum scheduler-driven attempts before a run is reported as a
/// terminal failure.
pub const MAX_ATTEMPTS: u32 = 3;

/// Pipeline errors recovered at the job boundary.
#[derive(Debug, Error)]
pub enum RecoError {
    #[error("catalog store error: {0}")]
    Catalog(#[source] anyhow::Error),
    #[error("history store error: {0}")]
    History(#[source] anyhow::Error),
}

/// Result of one precompute invocation, consumable by a scheduler.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Full pipeline completed and the cache entry was replaced.
    Completed { songs_ranked: usize },
    /// Nothing to do (no active user or empty catalog); cache untouched.
    Skipped,
    /// The attempt failed and the caller should retry with this counter.
    Retry { next_attempt: u32 },
    /// Attempts exhausted; the stale cache entry, if any, is left in
    /// place so reads degrade to last-known-good recommendations.
    Failed,
    /// Cancelled before the cache write; nothing was written.
    Cancelled,
}

pub struct RecommendationEngine {
    catalog_store: Arc<dyn CatalogStore>,
    history_store: Arc<dyn HistoryStore>,
    cache: Arc<RecoCache>,
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(
        catalog_store: Arc<dyn CatalogStore>,
        history_store: Arc<dyn HistoryStore>,
        cache: Arc<RecoCache>,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            catalog_store,
            history_store,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &RecoCache {
        &self.cache
    }

    /// Cache-backed read path. A miss is a valid state and yields an empty
    /// list; reads never trigger computation and never fail.
    pub fn get_recommendations(&self, user_id: i64) -> Vec<RecommendationScore> {
        match self.cache.get(user_id) {
            Some(entry) => entry.scores.clone(),
            None => Vec::new(),
        }
    }

    /// Invalidation hook: one user's entry, or everything.
    pub fn clear_cache(&self, user_id: Option<i64>) {
        match user_id {
            Some(user_id) => {
                debug!("Clearing recommendation cache for user {}", user_id);
                self.cache.clear(user_id);
            }
            None => {
                info!("Clearing recommendation cache for all users");
                self.cache.clear_all();
            }
        }
    }

    /// Run one precompute attempt for a user. `attempt` is 1-based and
    /// supplied by the caller; the engine itself keeps no retry state.
    pub fn precompute(
        &self,
        user_id: i64,
        attempt: u32,
        cancellation_token: &CancellationToken,
    ) -> RunOutcome {
        let started = Instant::now();

        let outcome = match self.run_pipeline(user_id, cancellation_token) {
            Ok(PipelineResult::NothingToDo) => {
                info!(
                    "Precompute for user {} had nothing to do ({:?})",
                    user_id,
                    started.elapsed()
                );
                RunOutcome::Skipped
            }
            Ok(PipelineResult::Cancelled) => {
                info!(
                    "Precompute for user {} cancelled after {:?}, cache untouched",
                    user_id,
                    started.elapsed()
                );
                RunOutcome::Cancelled
            }
            Ok(PipelineResult::Ranked(entry)) => {
                let songs_ranked = entry.scores.len();
                self.cache.put(entry);
                info!(
                    "Precomputed {} recommendations for user {} in {:?}",
                    songs_ranked,
                    user_id,
                    started.elapsed()
                );
                RunOutcome::Completed { songs_ranked }
            }
            Err(e) => {
                if attempt >= MAX_ATTEMPTS {
                    error!(
                        "Precompute for user {} failed terminally after attempt {}/{} ({:?}): {}",
                        user_id,
                        attempt,
                        MAX_ATTEMPTS,
                        started.elapsed(),
                        e
                    );
                    RunOutcome::Failed
                } else {
                    warn!(
                        "Precompute for user {} failed on attempt {}/{} ({:?}), will retry: {}",
                        user_id,
                        attempt,
                        MAX_ATTEMPTS,
                        started.elapsed(),
                        e
                    );
                    RunOutcome::Retry {
                        next_attempt: attempt + 1,
                    }
                }
            }
        };

        outcome
    }

    fn run_pipeline(
        &self,
        user_id: i64,
        cancellation_token: &CancellationToken,
    ) -> Result<PipelineResult, RecoError> {
        // LoadInputs: sentinel user means "nothing to do", not an error.
        if user_id == NO_ACTIVE_USER {
            return Ok(PipelineResult::NothingToDo);
        }

        let candidates = self
            .catalog_store
            .get_candidate_songs()
            .map_err(RecoError::Catalog)?;
        if candidates.is_empty() {
            return Ok(PipelineResult::NothingToDo);
        }

        let history = self
            .history_store
            .get_listening_history(user_id)
            .map_err(RecoError::History)?;
        let collaborative = self
            .history_store
            .get_collaborative_scores(user_id)
            .map_err(RecoError::History)?;

        if cancellation_token.is_cancelled() {
            return Ok(PipelineResult::Cancelled);
        }

        // BuildFeatures + Score + Rank: pure computation, no suspension.
        let feature_set = build_features(&candidates, &history);
        let scorer = Scorer::new(self.config.clone());
        let now = Utc::now();
        let scores: Vec<RecommendationScore> = candidates
            .iter()
            .zip(feature_set.features.iter())
            .map(|(song, feature)| {
                let collaborative_score =
                    collaborative.get(&song.id).copied().unwrap_or(0.0);
                scorer.score(song, feature, &feature_set.profile, collaborative_score, now)
            })
            .collect();
        let ranked = rank_scores(scores);

        // A cancelled run must not leave a partial write; check one last
        // time before handing the entry to WriteCache.
        if cancellation_token.is_cancelled() {
            return Ok(PipelineResult::Cancelled);
        }

        Ok(PipelineResult::Ranked(CacheEntry {
            user_id,
            scores: ranked,
            computed_at: now,
        }))
    }
}

enum PipelineResult {
    NothingToDo,
    Cancelled,
    Ranked(CacheEntry),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::{CatalogSong, NullCatalogStore};
    use crate::history_store::{InMemoryHistoryStore, PlayedSong};
    use anyhow::{anyhow, Result};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn song(id: &str, rank: u32) -> CatalogSong {
        CatalogSong {
            id: id.to_string(),
            title: format!("Title {}", id),
            artist: "Artist".to_string(),
            genre: "pop".to_string(),
            popularity_rank: rank,
            updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        }
    }

    struct FixedCatalogStore {
        songs: Vec<CatalogSong>,
    }

    impl CatalogStore for FixedCatalogStore {
        fn get_candidate_songs(&self) -> Result<Vec<CatalogSong>> {
            Ok(self.songs.clone())
        }

        fn songs_count(&self) -> usize {
            self.songs.len()
        }
    }

    /// Fails the first `failures` calls, then serves the fixed set.
    struct FlakyCatalogStore {
        songs: Vec<CatalogSong>,
        failures: u32,
        calls: AtomicU32,
    }

    impl CatalogStore for FlakyCatalogStore {
        fn get_candidate_songs(&self) -> Result<Vec<CatalogSong>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(anyhow!("catalog unavailable"))
            } else {
                Ok(self.songs.clone())
            }
        }

        fn songs_count(&self) -> usize {
            self.songs.len()
        }
    }

    fn engine_with(catalog: Arc<dyn CatalogStore>) -> RecommendationEngine {
        RecommendationEngine::new(
            catalog,
            Arc::new(InMemoryHistoryStore::new()),
            Arc::new(RecoCache::new()),
            RecommendationConfig::default(),
        )
    }

    #[test]
    fn test_read_path_falls_back_to_empty() {
        let engine = engine_with(Arc::new(NullCatalogStore));
        assert!(engine.get_recommendations(1).is_empty());
    }

    #[test]
    fn test_sentinel_user_skips_without_touching_cache() {
        let engine = engine_with(Arc::new(FixedCatalogStore {
            songs: vec![song("s1", 1)],
        }));
        let outcome = engine.precompute(NO_ACTIVE_USER, 1, &CancellationToken::new());
        assert_eq!(outcome, RunOutcome::Skipped);
        assert_eq!(engine.cache().entry_count(), 0);
    }

    #[test]
    fn test_empty_catalog_skips() {
        let engine = engine_with(Arc::new(NullCatalogStore));
        let outcome = engine.precompute(1, 1, &CancellationToken::new());
        assert_eq!(outcome, RunOutcome::Skipped);
        assert_eq!(engine.cache().entry_count(), 0);
    }

    #[test]
    fn test_successful_run_writes_ranked_entry() {
        let engine = engine_with(Arc::new(FixedCatalogStore {
            songs: vec![song("s2", 10), song("s1", 1), song("s3", 5)],
        }));
        let outcome = engine.precompute(1, 1, &CancellationToken::new());
        assert_eq!(outcome, RunOutcome::Completed { songs_ranked: 3 });

        let scores = engine.get_recommendations(1);
        assert_eq!(scores.len(), 3);
        for pair in scores.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // Identical signals except popularity: rank 1 wins.
        assert_eq!(scores[0].song_id, "s1");
    }

    #[test]
    fn test_rerun_overwrites_never_appends() {
        let engine = engine_with(Arc::new(FixedCatalogStore {
            songs: vec![song("s1", 1), song("s2", 2)],
        }));
        let token = CancellationToken::new();
        engine.precompute(1, 1, &token);
        let first = engine.get_recommendations(1);
        engine.precompute(1, 1, &token);
        let second = engine.get_recommendations(1);

        assert_eq!(engine.cache().entry_count(), 1);
        assert_eq!(first.len(), 2);
        let first_ids: Vec<&str> = first.iter().map(|s| s.song_id.as_str()).collect();
        let second_ids: Vec<&str> = second.iter().map(|s| s.song_id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_failure_requests_retry_until_exhausted() {
        let engine = engine_with(Arc::new(FlakyCatalogStore {
            songs: vec![song("s1", 1)],
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        }));
        let token = CancellationToken::new();
        assert_eq!(
            engine.precompute(1, 1, &token),
            RunOutcome::Retry { next_attempt: 2 }
        );
        assert_eq!(
            engine.precompute(1, 2, &token),
            RunOutcome::Retry { next_attempt: 3 }
        );
        assert_eq!(engine.precompute(1, 3, &token), RunOutcome::Failed);
        assert_eq!(engine.cache().entry_count(), 0);
    }

    #[test]
    fn test_fails_twice_then_succeeds_on_third_attempt() {
        let engine = engine_with(Arc::new(FlakyCatalogStore {
            songs: vec![song("s1", 1), song("s2", 2)],
            failures: 2,
            calls: AtomicU32::new(0),
        }));
        let token = CancellationToken::new();
        assert_eq!(
            engine.precompute(1, 1, &token),
            RunOutcome::Retry { next_attempt: 2 }
        );
        assert_eq!(
            engine.precompute(1, 2, &token),
            RunOutcome::Retry { next_attempt: 3 }
        );
        assert_eq!(
            engine.precompute(1, 3, &token),
            RunOutcome::Completed { songs_ranked: 2 }
        );
        // Exactly one entry, reflecting the successful run.
        assert_eq!(engine.cache().entry_count(), 1);
        assert_eq!(engine.get_recommendations(1).len(), 2);
    }

    #[test]
    fn test_terminal_failure_preserves_stale_entry() {
        let flaky = Arc::new(FlakyCatalogStore {
            songs: vec![song("s1", 1)],
            failures: 0,
            calls: AtomicU32::new(0),
        });
        let engine = engine_with(flaky.clone());
        let token = CancellationToken::new();

        // First run succeeds and populates the cache.
        assert!(matches!(
            engine.precompute(1, 1, &token),
            RunOutcome::Completed { .. }
        ));

        // Make every further catalog read fail, then exhaust attempts.
        flaky.calls.store(0, Ordering::SeqCst);
        let always_fail = FlakyCatalogStore {
            songs: Vec::new(),
            failures: u32::MAX,
            calls: AtomicU32::new(0),
        };
        let engine2 = RecommendationEngine::new(
            Arc::new(always_fail),
            Arc::new(InMemoryHistoryStore::new()),
            Arc::clone(&engine.cache),
            RecommendationConfig::default(),
        );
        assert_eq!(engine2.precompute(1, 3, &token), RunOutcome::Failed);

        // Reads degrade to the last-known-good list, not empty.
        assert_eq!(engine2.get_recommendations(1).len(), 1);
    }

    #[test]
    fn test_cancelled_run_writes_nothing() {
        let engine = engine_with(Arc::new(FixedCatalogStore {
            songs: vec![song("s1", 1)],
        }));
        let token = CancellationToken::new();
        token.cancel();
        let outcome = engine.precompute(1, 1, &token);
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(engine.cache().entry_count(), 0);
    }

    #[test]
    fn test_collaborative_and_history_signals_reach_scores() {
        let history_store = Arc::new(InMemoryHistoryStore::new());
        history_store.set_history(
            1,
            vec![PlayedSong {
                song_id: "s1".to_string(),
                artist: "Artist".to_string(),
                played_at: Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
                play_count: 3,
            }],
        );
        history_store
            .set_collaborative_scores(1, [("s2".to_string(), 0.9)].into_iter().collect());

        let engine = RecommendationEngine::new(
            Arc::new(FixedCatalogStore {
                songs: vec![song("s1", 1), song("s2", 1)],
            }),
            history_store,
            Arc::new(RecoCache::new()),
            RecommendationConfig::default(),
        );
        engine.precompute(1, 1, &CancellationToken::new());

        let scores = engine.get_recommendations(1);
        let s2 = scores.iter().find(|s| s.song_id == "s2").unwrap();
        assert_eq!(s2.collaborative_score, 0.9);
        let s1 = scores.iter().find(|s| s.song_id == "s1").unwrap();
        assert_eq!(s1.collaborative_score, 0.0);
        assert!(s1.content_score > 0.0);
    }

    #[test]
    fn test_clear_cache_scopes() {
        let engine = engine_with(Arc::new(FixedCatalogStore {
            songs: vec![song("s1", 1)],
        }));
        let token = CancellationToken::new();
        engine.precompute(1, 1, &token);
        engine.precompute(2, 1, &token);
        assert_eq!(engine.cache().entry_count(), 2);

        engine.clear_cache(Some(1));
        assert!(engine.get_recommendations(1).is_empty());
        assert!(!engine.get_recommendations(2).is_empty());

        engine.clear_cache(None);
        assert_eq!(engine.cache().entry_count(), 0);
    }
}
