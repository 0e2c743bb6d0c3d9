//! Null catalog store implementation.
//!
//! A no-op implementation of CatalogStore for tests and for wiring paths
//! where no catalog is available (the precompute run treats an empty
//! candidate set as "nothing to do").

use super::models::CatalogSong;
use super::trait_def::CatalogStore;
use anyhow::Result;

/// A no-op catalog store that returns an empty candidate set.
pub struct NullCatalogStore;

impl CatalogStore for NullCatalogStore {
    fn get_candidate_songs(&self) -> Result<Vec<CatalogSong>> {
        Ok(Vec::new())
    }

    fn songs_count(&self) -> usize {
        0
    }
}
