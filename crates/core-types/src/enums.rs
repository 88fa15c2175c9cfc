use serde::{Deserialize, Serialize};
use std::fmt;

/// A single objective function to score a weight vector against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Squared correlation between the weighted composite and the target.
    RSquared,
    /// Negative mean squared error of the calibrated composite. Higher is better.
    NegMse,
    /// Negative mean absolute error of the calibrated composite. Higher is better.
    NegMae,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::RSquared => write!(f, "r_squared"),
            Objective::NegMse => write!(f, "neg_mse"),
            Objective::NegMae => write!(f, "neg_mae"),
        }
    }
}

/// What the optimizer maximizes: one objective, or a weighted scalarization
/// of several. Scalarization weights are normalized to sum 1 before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveSpec {
    Single(Objective),
    Weighted(Vec<(Objective, f64)>),
}

impl ObjectiveSpec {
    pub fn r_squared() -> Self {
        ObjectiveSpec::Single(Objective::RSquared)
    }
}

impl fmt::Display for ObjectiveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectiveSpec::Single(o) => write!(f, "{o}"),
            ObjectiveSpec::Weighted(parts) => {
                write!(f, "weighted(")?;
                for (i, (o, w)) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{o}:{w}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// The search algorithms the optimizer supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Gradient,
    Genetic,
    Annealing,
    ParticleSwarm,
    Bayesian,
    Constrained,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Gradient,
        Algorithm::Genetic,
        Algorithm::Annealing,
        Algorithm::ParticleSwarm,
        Algorithm::Bayesian,
        Algorithm::Constrained,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Gradient => "gradient",
            Algorithm::Genetic => "genetic",
            Algorithm::Annealing => "annealing",
            Algorithm::ParticleSwarm => "particle_swarm",
            Algorithm::Bayesian => "bayesian",
            Algorithm::Constrained => "constrained",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Algorithm selection: one explicit algorithm, or run them all and keep the
/// best by objective score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmChoice {
    Single(Algorithm),
    Comprehensive,
}

/// The independent statistical methods the weight calculator supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightMethod {
    Correlation,
    Importance,
    Regression,
    TimeSeries,
    Composite,
}

impl WeightMethod {
    pub fn name(&self) -> &'static str {
        match self {
            WeightMethod::Correlation => "correlation",
            WeightMethod::Importance => "importance",
            WeightMethod::Regression => "regression",
            WeightMethod::TimeSeries => "time_series",
            WeightMethod::Composite => "composite",
        }
    }
}

impl fmt::Display for WeightMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The stress tests the weight validator supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMethod {
    CrossValidation,
    Bootstrap,
    TimeSeriesSplit,
    NoiseStability,
    Sensitivity,
    Subsampling,
}

impl ValidationMethod {
    pub const ALL: [ValidationMethod; 6] = [
        ValidationMethod::CrossValidation,
        ValidationMethod::Bootstrap,
        ValidationMethod::TimeSeriesSplit,
        ValidationMethod::NoiseStability,
        ValidationMethod::Sensitivity,
        ValidationMethod::Subsampling,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ValidationMethod::CrossValidation => "cross_validation",
            ValidationMethod::Bootstrap => "bootstrap",
            ValidationMethod::TimeSeriesSplit => "time_series_split",
            ValidationMethod::NoiseStability => "noise_stability",
            ValidationMethod::Sensitivity => "sensitivity",
            ValidationMethod::Subsampling => "subsampling",
        }
    }
}

impl fmt::Display for ValidationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Severity of an issue raised by validation or monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Which termination rule ended an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Objective improvement stayed below tolerance long enough.
    Converged,
    /// Iteration budget exhausted.
    MaxIterations,
    /// Wall-clock deadline reached.
    Timeout,
    /// Caller cancelled the run between iterations.
    Cancelled,
}
