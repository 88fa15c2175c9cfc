//! # Acumen Core Types
//!
//! Shared data model for the Marginal Relationship & Dynamic Weight Engine.
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** This crate has no knowledge of any other part of the system.
//!   Every other crate depends on it; it depends on nothing but serialization
//!   and time handling.
//! - **Immutability:** A `FeatureMatrix` and `TargetSeries` are validated once
//!   at construction and never mutated. All derived entities (findings, weight
//!   vectors, reports, snapshots) are values; transformations return new values
//!   so that historical comparisons stay valid.
//!
//! ## Public API
//!
//! - `FeatureMatrix` / `TargetSeries`: the validated, read-only inputs.
//! - `WeightVector` / `WeightConstraints`: per-feature weights and the feasible
//!   region they live in.
//! - `RelationshipFinding`: the tagged result of relationship detection.
//! - `OptimizationResult`, `ValidationReport`, `MonitoringSnapshot`: the
//!   outputs of the optimizer, validator and drift monitor.
//! - `CoreError` / `ErrorKind`: the machine-readable error taxonomy.

pub mod enums;
pub mod error;
pub mod findings;
pub mod matrix;
pub mod results;
pub mod weights;

// Re-export the core types to provide a clean public API.
pub use enums::{
    Algorithm, AlgorithmChoice, Objective, ObjectiveSpec, Severity, TerminationReason,
    ValidationMethod, WeightMethod,
};
pub use error::{CoreError, ErrorKind};
pub use findings::{RelationshipFinding, ThresholdDirection};
pub use matrix::{FeatureMatrix, TargetSeries, MIN_SAMPLES_DEFAULT};
pub use results::{
    MethodOutcome, MethodReport, MonitoringSnapshot, OptimizationResult, ValidationIssue,
    ValidationReport,
};
pub use weights::{WeightConstraints, WeightVector, NORMALIZATION_TOLERANCE};
