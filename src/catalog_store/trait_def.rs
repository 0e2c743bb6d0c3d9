//! CatalogStore trait definition.

use super::models::CatalogSong;
use anyhow::Result;

/// Trait for catalog storage backends.
///
/// The recommendation pipeline only reads the candidate set; catalog
/// ingestion and editing live with the catalog service itself.
pub trait CatalogStore: Send + Sync {
    /// Get the full candidate song set for a precompute run.
    fn get_candidate_songs(&self) -> Result<Vec<CatalogSong>>;

    /// Get the number of songs in the catalog.
    fn songs_count(&self) -> usize;
}
