use serde::Deserialize;

/// The root configuration structure for the whole engine.
///
/// Every section has a `Default` implementation carrying the documented
/// defaults, so a partial (or absent) configuration file still produces a
/// fully usable engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionSettings,
    #[serde(default)]
    pub weighting: WeightingSettings,
    #[serde(default)]
    pub optimization: OptimizationSettings,
    #[serde(default)]
    pub validation: ValidationSettings,
    #[serde(default)]
    pub monitoring: MonitoringSettings,
}

/// Parameters for relationship detection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Minimum number of observations before any analysis is attempted.
    pub min_samples: usize,
    /// Minimum joint-over-individual explanatory gain for a synergy pair to
    /// be reported.
    pub min_synergy_gain: f64,
    /// Lag offsets 1..=max_lag are scanned for time-ordered data.
    pub max_lag: usize,
    /// Minimum absolute lag correlation worth reporting.
    pub min_lag_correlation: f64,
    /// Number of interior quantile split candidates per feature.
    pub threshold_quantiles: usize,
    /// Minimum normalized effect size for a threshold to be reported.
    pub min_threshold_strength: f64,
    /// How many engineered interactions to report, ranked by importance gain.
    pub top_interactions: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            min_samples: core_types::MIN_SAMPLES_DEFAULT,
            min_synergy_gain: 0.01,
            max_lag: 12,
            min_lag_correlation: 0.1,
            threshold_quantiles: 9,
            min_threshold_strength: 0.2,
            top_interactions: 5,
        }
    }
}

/// Parameters for the statistical weight calculator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeightingSettings {
    /// Pre-normalization share given to features with no detected lag, so
    /// the time-series method never excludes a feature entirely.
    pub lag_floor_share: f64,
    /// Number of trees in the importance forest.
    pub forest_trees: u16,
    /// Maximum tree depth in the importance forest.
    pub forest_max_depth: u16,
    /// Seed for the forest fit and the permutation shuffles.
    pub forest_seed: u64,
}

impl Default for WeightingSettings {
    fn default() -> Self {
        Self {
            lag_floor_share: 0.02,
            forest_trees: 64,
            forest_max_depth: 6,
            forest_seed: 42,
        }
    }
}

/// Parameters shared by all optimizer algorithms.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizationSettings {
    /// Iteration budget per algorithm run.
    pub max_iterations: usize,
    /// Convergence tolerance on objective improvement.
    pub tolerance: f64,
    /// Consecutive below-tolerance iterations before a run is converged.
    pub patience: usize,
    /// Wall-clock budget per algorithm run, in milliseconds.
    pub timeout_ms: u64,
    /// Population size for the population-based algorithms.
    pub population: usize,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-6,
            patience: 10,
            timeout_ms: 30_000,
            population: 40,
        }
    }
}

/// Parameters for weight validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// k for k-fold cross-validation.
    pub folds: usize,
    /// Number of bootstrap resamples.
    pub bootstrap_samples: usize,
    /// Gaussian noise magnitude, as a fraction of each feature's std.
    pub noise_sigma: f64,
    /// Relative perturbation applied to each weight in sensitivity analysis.
    pub sensitivity_delta: f64,
    /// A weight is "fragile" when its perturbation impact exceeds this
    /// multiple of the mean impact.
    pub fragile_ratio: f64,
    /// Fraction of rows/features kept per subsampling round.
    pub subsample_fraction: f64,
    /// Number of subsampling rounds.
    pub subsample_rounds: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            folds: 5,
            bootstrap_samples: 100,
            noise_sigma: 0.05,
            sensitivity_delta: 0.05,
            fragile_ratio: 3.0,
            subsample_fraction: 0.7,
            subsample_rounds: 20,
        }
    }
}

/// Parameters for drift monitoring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    /// Drift score above which a snapshot breaches.
    pub drift_threshold: f64,
    /// Number of consecutive breaching snapshots before the anomaly flag is
    /// raised. Guards against single-sample noise.
    pub consecutive_breaches: usize,
    /// Fallback spread when the validation baseline reports none.
    pub baseline_spread: f64,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            drift_threshold: 0.3,
            consecutive_breaches: 2,
            baseline_spread: 0.1,
        }
    }
}
