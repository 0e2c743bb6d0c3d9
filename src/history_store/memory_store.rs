//! In-memory history store for tests and local development.

use super::models::PlayedSong;
use super::trait_def::{HistoryStore, NO_ACTIVE_USER};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

/// A history store holding everything in memory. Play data is keyed by user
/// and returned as stored; collaborative scores are injected verbatim.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    active_user: Option<i64>,
    history: HashMap<i64, Vec<PlayedSong>>,
    collaborative: HashMap<i64, HashMap<String, f64>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active_user(&self, user_id: i64) {
        self.inner.lock().unwrap().active_user = Some(user_id);
    }

    pub fn set_history(&self, user_id: i64, mut history: Vec<PlayedSong>) {
        history.sort_by(|a, b| {
            b.played_at
                .cmp(&a.played_at)
                .then_with(|| a.song_id.cmp(&b.song_id))
        });
        self.inner.lock().unwrap().history.insert(user_id, history);
    }

    pub fn set_collaborative_scores(&self, user_id: i64, scores: HashMap<String, f64>) {
        self.inner
            .lock()
            .unwrap()
            .collaborative
            .insert(user_id, scores);
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn get_active_user(&self) -> Result<i64> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .active_user
            .unwrap_or(NO_ACTIVE_USER))
    }

    fn get_listening_history(&self, user_id: i64) -> Result<Vec<PlayedSong>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .history
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    fn get_collaborative_scores(&self, user_id: i64) -> Result<HashMap<String, f64>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .collaborative
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}
