//! Per-song content feature assembly.
//!
//! A precompute run builds one [`SongFeature`] per candidate from catalog
//! metadata plus the user's listening history. TF-IDF is invoked once over
//! the full candidate corpus so idf values are consistent across the whole
//! ranking pass. Everything here is a pure function of its inputs and is
//! discarded after scoring.

use crate::catalog_store::CatalogSong;
use crate::history_store::PlayedSong;
use crate::text::{compute_corpus_vectors, TermVector};
use std::collections::{HashMap, HashSet};

/// How many of the most recent plays feed the user profile vector.
const PROFILE_RECENT_PLAYS: usize = 20;

/// Content features for one candidate song.
#[derive(Clone, Debug)]
pub struct SongFeature {
    pub song_id: String,
    pub tfidf: TermVector,
    /// How strongly the user's history overlaps the candidate's artist,
    /// in [0, 1].
    pub artist_similarity: f64,
}

/// Features for a full candidate set plus the user's listening profile.
pub struct FeatureSet {
    /// One feature per candidate, in candidate order.
    pub features: Vec<SongFeature>,
    /// Centroid of the TF-IDF vectors of the user's recently played songs.
    /// Empty when the user has no history overlapping the candidate set.
    pub profile: TermVector,
}

/// Build content features for a candidate set against a user's history.
///
/// `history` is expected most recent play first (the stores guarantee it).
pub fn build_features(candidates: &[CatalogSong], history: &[PlayedSong]) -> FeatureSet {
    let documents: Vec<String> = candidates.iter().map(|song| song.document_text()).collect();
    let vectors = compute_corpus_vectors(&documents);

    let total_plays: u64 = history.iter().map(|play| play.play_count).sum();
    let mut artist_plays: HashMap<&str, u64> = HashMap::new();
    for play in history {
        *artist_plays.entry(play.artist.as_str()).or_insert(0) += play.play_count;
    }

    let features = candidates
        .iter()
        .zip(vectors.iter())
        .map(|(song, vector)| SongFeature {
            song_id: song.id.clone(),
            tfidf: vector.clone(),
            artist_similarity: artist_overlap(&artist_plays, total_plays, &song.artist),
        })
        .collect();

    let profile = profile_vector(candidates, &vectors, history);

    FeatureSet { features, profile }
}

/// Fraction of the user's total plays that belong to the given artist.
fn artist_overlap(artist_plays: &HashMap<&str, u64>, total_plays: u64, artist: &str) -> f64 {
    if total_plays == 0 {
        return 0.0;
    }
    let plays = artist_plays.get(artist).copied().unwrap_or(0);
    (plays as f64 / total_plays as f64).clamp(0.0, 1.0)
}

/// Centroid of the vectors of the user's most recent plays that appear in
/// the candidate set. Using candidate vectors keeps the profile in the same
/// idf space as the candidates it is compared against.
fn profile_vector(
    candidates: &[CatalogSong],
    vectors: &[TermVector],
    history: &[PlayedSong],
) -> TermVector {
    let index_by_id: HashMap<&str, usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, song)| (song.id.as_str(), i))
        .collect();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut picked: Vec<&TermVector> = Vec::new();
    for play in history {
        if picked.len() >= PROFILE_RECENT_PLAYS {
            break;
        }
        if !seen.insert(play.song_id.as_str()) {
            continue;
        }
        if let Some(&i) = index_by_id.get(play.song_id.as_str()) {
            picked.push(&vectors[i]);
        }
    }

    if picked.is_empty() {
        return TermVector::new();
    }

    let mut centroid = TermVector::new();
    for vector in &picked {
        for (term, weight) in vector.iter() {
            *centroid.entry(term.clone()).or_insert(0.0) += weight;
        }
    }
    let n = picked.len() as f64;
    for weight in centroid.values_mut() {
        *weight /= n;
    }
    centroid
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn song(id: &str, title: &str, artist: &str) -> CatalogSong {
        CatalogSong {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            genre: String::new(),
            popularity_rank: 1,
            updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        }
    }

    fn play(song_id: &str, artist: &str, count: u64) -> PlayedSong {
        PlayedSong {
            song_id: song_id.to_string(),
            artist: artist.to_string(),
            played_at: Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
            play_count: count,
        }
    }

    #[test]
    fn test_one_feature_per_candidate_in_order() {
        let candidates = vec![
            song("s1", "Night Drive", "Kavinsky"),
            song("s2", "Morning Sun", "Bonobo"),
        ];
        let set = build_features(&candidates, &[]);
        assert_eq!(set.features.len(), 2);
        assert_eq!(set.features[0].song_id, "s1");
        assert_eq!(set.features[1].song_id, "s2");
    }

    #[test]
    fn test_empty_history_gives_zero_artist_similarity_and_empty_profile() {
        let candidates = vec![song("s1", "Night Drive", "Kavinsky")];
        let set = build_features(&candidates, &[]);
        assert_eq!(set.features[0].artist_similarity, 0.0);
        assert!(set.profile.is_empty());
    }

    #[test]
    fn test_artist_similarity_is_play_fraction() {
        let candidates = vec![
            song("s1", "Track One", "Kavinsky"),
            song("s2", "Track Two", "Bonobo"),
            song("s3", "Track Three", "Unknown"),
        ];
        // 3 of 4 plays are Kavinsky, 1 is Bonobo
        let history = vec![play("h1", "Kavinsky", 3), play("h2", "Bonobo", 1)];
        let set = build_features(&candidates, &history);
        assert!((set.features[0].artist_similarity - 0.75).abs() < 1e-9);
        assert!((set.features[1].artist_similarity - 0.25).abs() < 1e-9);
        assert_eq!(set.features[2].artist_similarity, 0.0);
    }

    #[test]
    fn test_artist_similarity_bounded() {
        let candidates = vec![song("s1", "Track", "Solo Artist")];
        let history = vec![play("s1", "Solo Artist", 1_000_000)];
        let set = build_features(&candidates, &history);
        assert!((0.0..=1.0).contains(&set.features[0].artist_similarity));
        assert_eq!(set.features[0].artist_similarity, 1.0);
    }

    #[test]
    fn test_profile_is_centroid_of_played_candidates() {
        let candidates = vec![
            song("s1", "deep house mix", "DJ One"),
            song("s2", "orchestra suite", "Composer"),
        ];
        let history = vec![play("s1", "DJ One", 5)];
        let set = build_features(&candidates, &history);

        // Profile of a single played song equals that song's vector.
        assert_eq!(set.profile, set.features[0].tfidf);
    }

    #[test]
    fn test_profile_ignores_plays_outside_candidate_set() {
        let candidates = vec![song("s1", "deep house mix", "DJ One")];
        let history = vec![play("gone", "Someone", 9)];
        let set = build_features(&candidates, &history);
        assert!(set.profile.is_empty());
    }

    #[test]
    fn test_profile_caps_recent_plays() {
        let candidates: Vec<CatalogSong> = (0..30)
            .map(|i| song(&format!("s{}", i), &format!("title{}", i), "Artist"))
            .collect();
        // History references all 30 candidates; timestamps descend so the
        // store ordering contract holds.
        let history: Vec<PlayedSong> = (0..30)
            .map(|i| PlayedSong {
                song_id: format!("s{}", i),
                artist: "Artist".to_string(),
                played_at: Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()
                    - chrono::Duration::minutes(i),
                play_count: 1,
            })
            .collect();
        let set = build_features(&candidates, &history);
        // The 21st-most-recent play (s20..s29) must not contribute: its
        // distinguishing term is absent from the profile.
        assert!(!set.profile.keys().any(|term| term == "title25"));
        assert!(set.profile.keys().any(|term| term == "title5"));
    }
}
