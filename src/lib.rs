//! Harmonia Recommendation Server Library
//!
//! Personalized song recommendations for a music catalog: TF-IDF content
//! features blended with popularity, recency and collaborative signals,
//! precomputed in the background and served from a per-user cache.

pub mod background_jobs;
pub mod catalog_store;
pub mod config;
pub mod engine;
pub mod features;
pub mod history_store;
pub mod reco_cache;
pub mod scoring;
pub mod server;
pub mod text;

// Re-export commonly used types for convenience
pub use catalog_store::{CatalogSong, CatalogStore, NullCatalogStore, SqliteCatalogStore};
pub use engine::{RecommendationEngine, RunOutcome, MAX_ATTEMPTS};
pub use history_store::{HistoryStore, SqliteHistoryStore, NO_ACTIVE_USER};
pub use reco_cache::RecoCache;
pub use scoring::{RecommendationConfig, RecommendationScore};
pub use server::run_server;
