//! Text feature extraction: tokenization and TF-IDF vectors.

mod tfidf;
mod tokenizer;

pub use tfidf::{compute_corpus_vectors, cosine_similarity, TermVector};
pub use tokenizer::tokenize;
