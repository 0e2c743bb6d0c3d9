use crate::engine::RecommendationEngine;
use crate::history_store::HistoryStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context provided to jobs during execution.
#[derive(Clone)]
pub struct JobContext {
    /// Token to check for cancellation/shutdown requests.
    pub cancellation_token: CancellationToken,

    /// The recommendation engine (pipeline + cache).
    pub engine: Arc<RecommendationEngine>,

    /// Access to session and listening history data.
    pub history_store: Arc<dyn HistoryStore>,
}

impl JobContext {
    pub fn new(
        cancellation_token: CancellationToken,
        engine: Arc<RecommendationEngine>,
        history_store: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            cancellation_token,
            engine,
            history_store,
        }
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
