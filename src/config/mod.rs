mod file_config;

pub use file_config::{FileConfig, ScoringConfig};

use crate::scoring::RecommendationConfig;
use anyhow::{bail, Result};
use std::path::PathBuf;
use tracing::warn;

/// CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub catalog_db: Option<PathBuf>,
    pub history_db: Option<PathBuf>,
    pub port: u16,
    pub precompute_interval_minutes: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog_db: PathBuf,
    pub history_db: PathBuf,
    pub port: u16,
    pub precompute_interval_minutes: u64,
    pub scoring: RecommendationConfig,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let catalog_db = file
            .catalog_db
            .map(PathBuf::from)
            .or_else(|| cli.catalog_db.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("catalog_db must be specified via CLI or in config file")
            })?;

        let history_db = file
            .history_db
            .map(PathBuf::from)
            .or_else(|| cli.history_db.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("history_db must be specified via CLI or in config file")
            })?;

        let port = file.port.unwrap_or(cli.port);
        let precompute_interval_minutes = file
            .precompute_interval_minutes
            .unwrap_or(cli.precompute_interval_minutes);
        if precompute_interval_minutes == 0 {
            bail!("precompute_interval_minutes must be > 0");
        }

        let scoring = resolve_scoring(file.scoring.unwrap_or_default())?;

        Ok(Self {
            catalog_db,
            history_db,
            port,
            precompute_interval_minutes,
            scoring,
        })
    }
}

/// Merge file-provided scoring weights over the defaults and validate.
fn resolve_scoring(file: ScoringConfig) -> Result<RecommendationConfig> {
    let defaults = RecommendationConfig::default();
    let config = RecommendationConfig {
        popularity_weight: file.popularity_weight.unwrap_or(defaults.popularity_weight),
        recency_weight: file.recency_weight.unwrap_or(defaults.recency_weight),
        content_weight: file.content_weight.unwrap_or(defaults.content_weight),
        collaborative_weight: file
            .collaborative_weight
            .unwrap_or(defaults.collaborative_weight),
        recency_decay_factor: file
            .recency_decay_factor
            .unwrap_or(defaults.recency_decay_factor),
    };

    if config.recency_decay_factor <= 0.0 {
        bail!(
            "recency_decay_factor must be > 0, got {}",
            config.recency_decay_factor
        );
    }
    let weights = [
        config.popularity_weight,
        config.recency_weight,
        config.content_weight,
        config.collaborative_weight,
    ];
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        bail!("scoring weights must be finite and non-negative");
    }

    // The weights are documented to sum to roughly 1.0; this is not
    // enforced, only surfaced.
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > 0.05 {
        warn!("Scoring weights sum to {:.3}, expected roughly 1.0", sum);
    }

    Ok(config)
}
