//! Listening history and session access.
//!
//! Provides the per-user signals the scorer consumes: play history (recency
//! and artist overlap), the active-user session sentinel, and the
//! co-listening aggregate that backs the collaborative score.

mod memory_store;
mod models;
mod sqlite_store;
mod trait_def;

pub use memory_store::InMemoryHistoryStore;
pub use models::PlayedSong;
pub use sqlite_store::SqliteHistoryStore;
pub use trait_def::{HistoryStore, NO_ACTIVE_USER};
