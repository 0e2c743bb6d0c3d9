//! Free-text normalization for content features.
//!
//! Song metadata text (title, artist, genre tags) is noisy: mixed case,
//! punctuation, featuring credits in parentheses. The tokenizer reduces it
//! to a flat sequence of lowercase alphanumeric terms so that TF-IDF sees
//! "Love (Remix)" and "love remix" as the same thing.

/// Tokens shorter than this carry almost no signal ("a", "of", "la").
const MIN_TOKEN_LEN: usize = 3;

/// Normalize free text into a sequence of lowercase terms.
///
/// Lowercases, strips every character outside `[a-z0-9]`, splits on
/// whitespace runs and drops tokens shorter than 3 characters. Empty or
/// all-punctuation input yields an empty sequence.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|raw| {
            raw.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
        })
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_splits() {
        assert_eq!(tokenize("Bohemian Rhapsody"), vec!["bohemian", "rhapsody"]);
    }

    #[test]
    fn test_strips_punctuation() {
        assert_eq!(
            tokenize("Don't Stop Me Now!!!"),
            vec!["dont", "stop", "now"]
        );
    }

    #[test]
    fn test_drops_short_tokens() {
        // "me", "a" and "of" are all below the minimum length
        assert_eq!(tokenize("me of a kind world"), vec!["kind", "world"]);
    }

    #[test]
    fn test_keeps_digits() {
        assert_eq!(tokenize("Track 1999 v2"), vec!["track", "1999"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_all_punctuation_input() {
        assert!(tokenize("!!! --- ??? ..").is_empty());
    }

    #[test]
    fn test_collapses_whitespace_runs() {
        assert_eq!(tokenize("  jazz \t\n night  "), vec!["jazz", "night"]);
    }

    #[test]
    fn test_output_alphabet_is_constrained() {
        let tokens = tokenize("Späce! Owls & Café-87, naïve");
        for token in &tokens {
            assert!(token.len() >= MIN_TOKEN_LEN);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
            assert!(!token.chars().any(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Some Song Title (feat. Somebody)";
        assert_eq!(tokenize(text), tokenize(text));
    }
}
