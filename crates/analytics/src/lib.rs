//! # Acumen Analytics
//!
//! The stateless numerical core shared by every other component: objective
//! scoring of a fixed weight vector, univariate statistics, and the seeded
//! random-forest ensemble used for importance estimation.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of
//!   external systems and depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** The `ScoringEngine` takes a feature matrix, a
//!   target and a weight vector and produces a score. Same inputs, same
//!   output, always.

pub mod engine;
pub mod error;
pub mod forest;
pub mod stats;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{FrozenStats, ScoringEngine};
pub use error::AnalyticsError;
pub use forest::ForestFit;
