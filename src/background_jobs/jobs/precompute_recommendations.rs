//! Recommendation precompute job.
//!
//! Periodically recomputes the active user's recommendation list and
//! replaces the cache entry, so interactive reads never pay for scoring.
//! The job drives the engine's bounded retry loop: each attempt redoes the
//! full pipeline, and after three failed attempts the run is reported as a
//! terminal failure with the stale cache entry left in place.

use crate::background_jobs::{
    BackgroundJob, HookEvent, JobContext, JobError, JobSchedule, ShutdownBehavior,
};
use crate::engine::{RunOutcome, MAX_ATTEMPTS};
use std::time::Duration;
use tracing::{info, warn};

/// Background job that keeps the recommendation cache fresh.
///
/// Runs on startup, after catalog changes, and on a configurable interval.
pub struct PrecomputeRecommendationsJob {
    /// Interval in minutes between scheduled runs.
    interval_minutes: u64,
}

impl PrecomputeRecommendationsJob {
    pub fn new(interval_minutes: u64) -> Self {
        Self { interval_minutes }
    }
}

impl BackgroundJob for PrecomputeRecommendationsJob {
    fn id(&self) -> &'static str {
        "precompute_recommendations"
    }

    fn name(&self) -> &'static str {
        "Precompute Recommendations"
    }

    fn description(&self) -> &'static str {
        "Recompute and cache the active user's song recommendations"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Combined {
            interval: Some(Duration::from_secs(self.interval_minutes.saturating_mul(60))),
            hooks: vec![HookEvent::OnStartup, HookEvent::OnCatalogChange],
        }
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        // Recommendations can be recomputed on next startup.
        ShutdownBehavior::Cancellable
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let mut attempt = 1;
        loop {
            if ctx.is_cancelled() {
                return Err(JobError::Cancelled);
            }

            // The session read is part of the attempt: a transient session
            // store error consumes a retry just like a catalog or history
            // store error inside the engine.
            let user_id = match ctx.history_store.get_active_user() {
                Ok(user_id) => user_id,
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(JobError::ExecutionFailed(format!(
                            "Failed to read session after {} attempts: {}",
                            MAX_ATTEMPTS, e
                        )));
                    }
                    warn!("Session read failed on attempt {}, retrying: {}", attempt, e);
                    attempt += 1;
                    continue;
                }
            };

            match ctx
                .engine
                .precompute(user_id, attempt, &ctx.cancellation_token)
            {
                RunOutcome::Completed { songs_ranked } => {
                    info!(
                        "Recommendation precompute ranked {} songs for user {}",
                        songs_ranked, user_id
                    );
                    return Ok(());
                }
                RunOutcome::Skipped => {
                    info!("Recommendation precompute had nothing to do");
                    return Ok(());
                }
                RunOutcome::Cancelled => return Err(JobError::Cancelled),
                RunOutcome::Retry { next_attempt } => {
                    warn!(
                        "Recommendation precompute attempt {} failed, retrying",
                        attempt
                    );
                    attempt = next_attempt;
                }
                RunOutcome::Failed => {
                    return Err(JobError::ExecutionFailed(format!(
                        "Precompute failed after {} attempts",
                        MAX_ATTEMPTS
                    )));
                }
            }
        }
    }
}
