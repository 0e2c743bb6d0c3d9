//! SQLite-backed history store.

use super::models::PlayedSong;
use super::trait_def::{HistoryStore, NO_ACTIVE_USER};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS plays (
    user_id    INTEGER NOT NULL,
    song_id    TEXT NOT NULL,
    artist     TEXT NOT NULL,
    played_at  TEXT NOT NULL,
    play_count INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (user_id, song_id)
);
CREATE INDEX IF NOT EXISTS idx_plays_song ON plays (song_id);

CREATE TABLE IF NOT EXISTS session (
    id          INTEGER PRIMARY KEY CHECK (id = 0),
    active_user INTEGER NOT NULL
);
";

pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        if !path.exists() {
            info!("Creating new history database at {:?}", path);
        }
        let conn = Connection::open(path).context("Failed to open history database")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize history schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record one play, bumping the play count and the last-played time.
    pub fn record_play(
        &self,
        user_id: i64,
        song_id: &str,
        artist: &str,
        played_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO plays (user_id, song_id, artist, played_at, play_count)
             VALUES (?1, ?2, ?3, ?4, 1)
             ON CONFLICT(user_id, song_id) DO UPDATE SET
                 play_count = play_count + 1,
                 played_at = excluded.played_at,
                 artist = excluded.artist",
            params![user_id, song_id, artist, played_at.to_rfc3339()],
        )
        .context("Failed to record play")?;
        Ok(())
    }

    /// Set (or clear, with [`NO_ACTIVE_USER`]) the active session user.
    pub fn set_active_user(&self, user_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO session (id, active_user) VALUES (0, ?1)
             ON CONFLICT(id) DO UPDATE SET active_user = excluded.active_user",
            params![user_id],
        )
        .context("Failed to set active user")?;
        Ok(())
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn get_active_user(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row("SELECT active_user FROM session WHERE id = 0", [], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        Ok(user.unwrap_or(NO_ACTIVE_USER))
    }

    fn get_listening_history(&self, user_id: i64) -> Result<Vec<PlayedSong>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT song_id, artist, played_at, play_count
             FROM plays WHERE user_id = ?1
             ORDER BY played_at DESC, song_id ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u64>(3)?,
            ))
        })?;

        let mut history = Vec::new();
        for row in rows {
            let (song_id, artist, raw_ts, play_count) = row?;
            let played_at = DateTime::parse_from_rfc3339(&raw_ts)
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("Invalid play timestamp: {}", raw_ts))?;
            history.push(PlayedSong {
                song_id,
                artist,
                played_at,
                play_count,
            });
        }
        Ok(history)
    }

    fn get_collaborative_scores(&self, user_id: i64) -> Result<HashMap<String, f64>> {
        let conn = self.conn.lock().unwrap();
        // Peers are users who share at least one played song with the target
        // user; their aggregated plays form the co-listening signal.
        let mut stmt = conn.prepare(
            "WITH peers AS (
                 SELECT DISTINCT p2.user_id
                 FROM plays p1
                 JOIN plays p2 ON p1.song_id = p2.song_id
                 WHERE p1.user_id = ?1 AND p2.user_id != ?1
             )
             SELECT p.song_id, SUM(p.play_count)
             FROM plays p
             WHERE p.user_id IN (SELECT user_id FROM peers)
             GROUP BY p.song_id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut totals: HashMap<String, i64> = HashMap::new();
        for row in rows {
            let (song_id, plays) = row?;
            totals.insert(song_id, plays.max(0));
        }

        let max_plays = totals.values().copied().max().unwrap_or(0);
        if max_plays == 0 {
            return Ok(HashMap::new());
        }
        Ok(totals
            .into_iter()
            .map(|(song_id, plays)| (song_id, plays as f64 / max_plays as f64))
            .collect())
    }
}
