//! Background job implementations.

mod precompute_recommendations;

pub use precompute_recommendations::PrecomputeRecommendationsJob;
