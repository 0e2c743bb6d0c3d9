use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub catalog_db: Option<String>,
    pub history_db: Option<String>,
    pub port: Option<u16>,
    pub precompute_interval_minutes: Option<u64>,

    // Scoring weights
    pub scoring: Option<ScoringConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    pub popularity_weight: Option<f64>,
    pub recency_weight: Option<f64>,
    pub content_weight: Option<f64>,
    pub collaborative_weight: Option<f64>,
    pub recency_decay_factor: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
