//! Song catalog access for the recommendation pipeline.
//!
//! The catalog itself is an external collaborator; this module only defines
//! the slice of it the pipeline consumes (candidate songs with the metadata
//! needed for content, popularity and recency signals).

mod models;
mod null_store;
mod sqlite_store;
mod trait_def;

pub use models::CatalogSong;
pub use null_store::NullCatalogStore;
pub use sqlite_store::SqliteCatalogStore;
pub use trait_def::CatalogStore;
