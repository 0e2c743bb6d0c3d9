//! HistoryStore trait definition.

use super::models::PlayedSong;
use anyhow::Result;
use std::collections::HashMap;

/// Sentinel user id meaning "no active user". A precompute run for this id
/// is a no-op success, not an error.
pub const NO_ACTIVE_USER: i64 = -1;

/// Trait for listening-history storage backends.
pub trait HistoryStore: Send + Sync {
    /// The currently active user, or [`NO_ACTIVE_USER`].
    fn get_active_user(&self) -> Result<i64>;

    /// The user's listening history, most recent play first.
    fn get_listening_history(&self, user_id: i64) -> Result<Vec<PlayedSong>>;

    /// Co-listening aggregate per song id, normalized to [0, 1].
    ///
    /// Derived from other users' play patterns; the scorer treats it as an
    /// injected signal and clamps it again at the blending boundary.
    fn get_collaborative_scores(&self, user_id: i64) -> Result<HashMap<String, f64>>;
}
