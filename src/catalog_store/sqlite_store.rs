//! SQLite-backed catalog store.

use super::models::CatalogSong;
use super::trait_def::CatalogStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS songs (
    id              TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    artist          TEXT NOT NULL,
    genre           TEXT NOT NULL DEFAULT '',
    popularity_rank INTEGER NOT NULL,
    updated_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_songs_popularity ON songs (popularity_rank);
";

pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

impl SqliteCatalogStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        if !path.exists() {
            info!("Creating new catalog database at {:?}", path);
        }
        let conn = Connection::open(path).context("Failed to open catalog database")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize catalog schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or fully replace a song row.
    pub fn upsert_song(&self, song: &CatalogSong) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO songs (id, title, artist, genre, popularity_rank, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 artist = excluded.artist,
                 genre = excluded.genre,
                 popularity_rank = excluded.popularity_rank,
                 updated_at = excluded.updated_at",
            params![
                song.id,
                song.title,
                song.artist,
                song.genre,
                song.popularity_rank,
                song.updated_at.to_rfc3339(),
            ],
        )
        .with_context(|| format!("Failed to upsert song {}", song.id))?;
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid song timestamp: {}", raw))
}

impl CatalogStore for SqliteCatalogStore {
    fn get_candidate_songs(&self) -> Result<Vec<CatalogSong>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, artist, genre, popularity_rank, updated_at
             FROM songs ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut songs = Vec::new();
        for row in rows {
            let (id, title, artist, genre, popularity_rank, raw_ts) = row?;
            songs.push(CatalogSong {
                id,
                title,
                artist,
                genre,
                popularity_rank,
                updated_at: parse_timestamp(&raw_ts)?,
            });
        }
        Ok(songs)
    }

    fn songs_count(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM songs", [], |row| row.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }
}
