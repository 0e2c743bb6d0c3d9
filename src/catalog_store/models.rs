use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate song as consumed from the catalog store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogSong {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Free-form descriptive tags (genre, mood), space separated.
    pub genre: String,
    /// Catalog popularity rank, 1 = most popular.
    pub popularity_rank: u32,
    /// Last time the song was added or updated in the catalog.
    pub updated_at: DateTime<Utc>,
}

impl CatalogSong {
    /// The raw textual representation used for content features.
    pub fn document_text(&self) -> String {
        format!("{} {} {}", self.title, self.artist, self.genre)
    }
}
