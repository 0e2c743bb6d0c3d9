//! Multi-factor recommendation scoring.
//!
//! Each candidate gets four independently computed sub-scores (popularity,
//! recency, content, collaborative), every one clamped to [0, 1] before
//! blending, so a single bad signal can never poison the final score. The
//! blend weights come from an explicit [`RecommendationConfig`] passed in
//! at call time, never from process-wide state.

use crate::catalog_store::CatalogSong;
use crate::features::SongFeature;
use crate::text::{cosine_similarity, TermVector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Blend coefficients and recency falloff for the scorer.
///
/// The four weights are expected to sum to roughly 1.0; this is a
/// documented expectation, not an enforced invariant (no normalization
/// step is applied).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub popularity_weight: f64,
    pub recency_weight: f64,
    pub content_weight: f64,
    pub collaborative_weight: f64,
    /// Exponential decay per elapsed day; must be > 0.
    pub recency_decay_factor: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            popularity_weight: 0.25,
            recency_weight: 0.15,
            content_weight: 0.35,
            collaborative_weight: 0.25,
            recency_decay_factor: 0.05,
        }
    }
}

/// Final blended score for one candidate, with its sub-scores retained for
/// inspection. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationScore {
    pub song_id: String,
    pub score: f64,
    pub popularity_score: f64,
    pub recency_score: f64,
    pub content_score: f64,
    pub collaborative_score: f64,
}

/// Clamp a sub-score into [0, 1], mapping NaN and infinities to 0.0.
fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Computes blended scores for candidates using an injected config.
pub struct Scorer {
    config: RecommendationConfig,
}

impl Scorer {
    pub fn new(config: RecommendationConfig) -> Self {
        Self { config }
    }

    /// Monotonic transform of catalog popularity rank into (0, 1]:
    /// rank 1 maps to 1.0 and the score falls off hyperbolically.
    fn popularity_score(rank: u32) -> f64 {
        1.0 / rank.max(1) as f64
    }

    /// Exponential decay of elapsed days since the song's last update.
    fn recency_score(&self, updated_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let days_elapsed = ((now - updated_at).num_seconds() as f64 / 86_400.0).max(0.0);
        (-self.config.recency_decay_factor * days_elapsed).exp()
    }

    /// TF-IDF similarity against the user profile, blended evenly with the
    /// artist-overlap signal.
    fn content_score(feature: &SongFeature, profile: &TermVector) -> f64 {
        let text_similarity = cosine_similarity(&feature.tfidf, profile);
        0.5 * text_similarity + 0.5 * feature.artist_similarity
    }

    /// Score one candidate. The collaborative signal is injected by the
    /// caller (per-song co-listening aggregate, already in [0, 1] by
    /// contract but clamped again here).
    pub fn score(
        &self,
        song: &CatalogSong,
        feature: &SongFeature,
        profile: &TermVector,
        collaborative: f64,
        now: DateTime<Utc>,
    ) -> RecommendationScore {
        let popularity_score = clamp_unit(Self::popularity_score(song.popularity_rank));
        let recency_score = clamp_unit(self.recency_score(song.updated_at, now));
        let content_score = clamp_unit(Self::content_score(feature, profile));
        let collaborative_score = clamp_unit(collaborative);

        let score = self.config.popularity_weight * popularity_score
            + self.config.recency_weight * recency_score
            + self.config.content_weight * content_score
            + self.config.collaborative_weight * collaborative_score;

        RecommendationScore {
            song_id: song.id.clone(),
            score,
            popularity_score,
            recency_score,
            content_score,
            collaborative_score,
        }
    }
}

/// Sort scores descending by blended score, ties broken by song id
/// ascending so re-ranking identical inputs is deterministic.
pub fn rank_scores(mut scores: Vec<RecommendationScore>) -> Vec<RecommendationScore> {
    scores.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.song_id.cmp(&b.song_id),
        other => other,
    });
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn song(id: &str, rank: u32, updated_at: DateTime<Utc>) -> CatalogSong {
        CatalogSong {
            id: id.to_string(),
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            genre: String::new(),
            popularity_rank: rank,
            updated_at,
        }
    }

    fn feature(id: &str, artist_similarity: f64) -> SongFeature {
        SongFeature {
            song_id: id.to_string(),
            tfidf: TermVector::new(),
            artist_similarity,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn score_of(
        config: RecommendationConfig,
        rank: u32,
        days_old: i64,
        artist_sim: f64,
        collaborative: f64,
    ) -> RecommendationScore {
        let scorer = Scorer::new(config);
        let updated = now() - chrono::Duration::days(days_old);
        scorer.score(
            &song("s1", rank, updated),
            &feature("s1", artist_sim),
            &TermVector::new(),
            collaborative,
            now(),
        )
    }

    #[test]
    fn test_popularity_rank_one_scores_one() {
        let s = score_of(RecommendationConfig::default(), 1, 0, 0.0, 0.0);
        assert_eq!(s.popularity_score, 1.0);
    }

    #[test]
    fn test_popularity_is_monotonic_in_rank() {
        let better = score_of(RecommendationConfig::default(), 2, 0, 0.0, 0.0);
        let worse = score_of(RecommendationConfig::default(), 50, 0, 0.0, 0.0);
        assert!(better.popularity_score > worse.popularity_score);
    }

    #[test]
    fn test_popularity_guards_rank_zero() {
        let s = score_of(RecommendationConfig::default(), 0, 0, 0.0, 0.0);
        assert_eq!(s.popularity_score, 1.0);
    }

    #[test]
    fn test_recency_decays_with_age() {
        let fresh = score_of(RecommendationConfig::default(), 1, 0, 0.0, 0.0);
        let old = score_of(RecommendationConfig::default(), 1, 365, 0.0, 0.0);
        assert!((fresh.recency_score - 1.0).abs() < 1e-9);
        assert!(old.recency_score < fresh.recency_score);
        assert!(old.recency_score >= 0.0);
    }

    #[test]
    fn test_future_timestamp_clamps_to_one() {
        let s = score_of(RecommendationConfig::default(), 1, -10, 0.0, 0.0);
        assert_eq!(s.recency_score, 1.0);
    }

    #[test]
    fn test_collaborative_signal_is_clamped() {
        let s = score_of(RecommendationConfig::default(), 1, 0, 0.0, 7.5);
        assert_eq!(s.collaborative_score, 1.0);
        let s = score_of(RecommendationConfig::default(), 1, 0, 0.0, f64::NAN);
        assert_eq!(s.collaborative_score, 0.0);
        let s = score_of(RecommendationConfig::default(), 1, 0, 0.0, f64::INFINITY);
        assert_eq!(s.collaborative_score, 0.0);
    }

    #[test]
    fn test_score_bounded_by_weight_sum() {
        let config = RecommendationConfig::default();
        let weight_sum = config.popularity_weight
            + config.recency_weight
            + config.content_weight
            + config.collaborative_weight;
        let s = score_of(config, 1, 0, 1.0, 1.0);
        assert!(s.score >= 0.0);
        assert!(s.score <= weight_sum + 1e-9);
    }

    #[test]
    fn test_all_weight_on_popularity() {
        let config = RecommendationConfig {
            popularity_weight: 1.0,
            recency_weight: 0.0,
            content_weight: 0.0,
            collaborative_weight: 0.0,
            recency_decay_factor: 0.05,
        };
        for rank in [1, 2, 7, 100] {
            let s = score_of(config.clone(), rank, 12, 0.8, 0.4);
            assert_eq!(s.score, s.popularity_score);
        }
    }

    #[test]
    fn test_content_score_blends_artist_similarity() {
        let s = score_of(RecommendationConfig::default(), 1, 0, 0.6, 0.0);
        // Empty profile vector: cosine part is 0, so content = 0.5 * 0.6
        assert!((s.content_score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_rank_scores_descending_with_id_tiebreak() {
        let make = |id: &str, score: f64| RecommendationScore {
            song_id: id.to_string(),
            score,
            popularity_score: 0.0,
            recency_score: 0.0,
            content_score: 0.0,
            collaborative_score: 0.0,
        };
        let ranked = rank_scores(vec![
            make("b", 0.5),
            make("a", 0.5),
            make("c", 0.9),
            make("d", 0.1),
        ]);
        let ids: Vec<&str> = ranked.iter().map(|s| s.song_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let scorer = Scorer::new(RecommendationConfig::default());
        let songs: Vec<CatalogSong> = (1..=5)
            .map(|i| song(&format!("s{}", i), i, now() - chrono::Duration::days(i as i64)))
            .collect();
        let run = || {
            let scores: Vec<RecommendationScore> = songs
                .iter()
                .map(|s| {
                    scorer.score(
                        s,
                        &feature(&s.id, 0.5),
                        &TermVector::new(),
                        0.3,
                        now(),
                    )
                })
                .collect();
            rank_scores(scores)
        };
        assert_eq!(run(), run());
    }
}
