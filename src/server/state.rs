use crate::background_jobs::HookEvent;
use crate::engine::RecommendationEngine;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<RecommendationEngine>,
    /// Sender for scheduler hook events (catalog refresh).
    pub hook_sender: mpsc::Sender<HookEvent>,
}

impl ServerState {
    pub fn new(engine: Arc<RecommendationEngine>, hook_sender: mpsc::Sender<HookEvent>) -> Self {
        Self {
            engine,
            hook_sender,
        }
    }
}
