use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One song in a user's listening history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayedSong {
    pub song_id: String,
    pub artist: String,
    /// Most recent play.
    pub played_at: DateTime<Utc>,
    /// Total plays of this song by this user.
    pub play_count: u64,
}
