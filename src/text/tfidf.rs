//! Corpus-relative TF-IDF weighting and cosine similarity.
//!
//! Inverse document frequency depends on the whole candidate set, so vectors
//! are computed in one batch per precompute run rather than incrementally
//! per song. A term appearing in every document gets idf = ln(N/N) = 0 and
//! therefore contributes nothing to similarity.

use super::tokenizer::tokenize;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Sparse mapping from term to non-negative weight. Terms absent from the
/// document are simply not present in the map.
pub type TermVector = HashMap<String, f64>;

/// Compute one TF-IDF vector per input document, in input order.
///
/// Term frequency is max-normalized within each document (the most frequent
/// term gets tf = 1.0), idf is `ln(N / df)`. A document with zero tokens
/// maps to an empty vector; an empty corpus maps to an empty result.
pub fn compute_corpus_vectors(documents: &[String]) -> Vec<TermVector> {
    if documents.is_empty() {
        return Vec::new();
    }

    let tokenized: Vec<Vec<String>> = documents.par_iter().map(|doc| tokenize(doc)).collect();

    // df(term) = number of documents containing the term at least once.
    // Always >= 1 for any term we later look up, so ln(N/df) never divides
    // by zero.
    let mut df: HashMap<&str, usize> = HashMap::new();
    for tokens in &tokenized {
        let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        for term in unique {
            *df.entry(term).or_insert(0) += 1;
        }
    }

    let corpus_size = documents.len() as f64;

    tokenized
        .par_iter()
        .map(|tokens| {
            if tokens.is_empty() {
                return TermVector::new();
            }

            let mut counts: HashMap<&str, usize> = HashMap::new();
            for token in tokens {
                *counts.entry(token.as_str()).or_insert(0) += 1;
            }
            let max_count = counts.values().copied().max().unwrap_or(1) as f64;

            counts
                .into_iter()
                .map(|(term, count)| {
                    let tf = count as f64 / max_count;
                    let idf = (corpus_size / df[term] as f64).ln();
                    (term.to_string(), tf * idf)
                })
                .collect()
        })
        .collect()
}

/// Cosine similarity between two sparse vectors, in [0, 1].
///
/// Missing keys are treated as zero. Returns 0.0 when either vector is
/// empty or has zero norm, so the result is never NaN.
pub fn cosine_similarity(a: &TermVector, b: &TermVector) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .filter_map(|(term, wa)| b.get(term).map(|wb| wa * wb))
        .sum();
    let norm_a = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b = b.values().map(|w| w * w).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}
