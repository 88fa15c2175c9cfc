//! # Acumen Engine
//!
//! The orchestrator tying the analysis stages together: relationship
//! detection, per-method weight calculation, weight optimization, robustness
//! validation and drift monitoring. Each stage lives in its own crate and
//! can be driven directly; this crate wires them into one pipeline behind a
//! single entry point and enforces the shared input contract (aligned
//! feature matrix and target) at the boundary.

use calculator::{CalculationContext, CalculationOutcome, WeightCalculator};
use configuration::Config;
use core_types::{
    AlgorithmChoice, CoreError, FeatureMatrix, ObjectiveSpec, RelationshipFinding, TargetSeries,
    ValidationReport, WeightConstraints, WeightMethod, WeightVector,
};
use detector::{DetectionOptions, RelationshipDetector};
use monitor::DriftMonitor;
use optimizer::{CancelToken, OptimizationRun, OptimizeRequest, WeightOptimizer};
use tracing::info;
use uuid::Uuid;
use validator::{ValidationOptions, WeightValidator};

pub mod error;

pub use error::EngineError;

/// Options shared by the pipeline stages.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Whether row order is chronological. Gates lag detection, the
    /// time-series weighting method and out-of-time validation.
    pub time_ordered: bool,
    /// Master seed; every stochastic stage derives its own lanes from it.
    pub seed: u64,
    pub objective: ObjectiveSpec,
    pub algorithm: AlgorithmChoice,
    /// Weighting methods to compute before optimization.
    pub methods: Vec<WeightMethod>,
    pub constraints: WeightConstraints,
    pub record_history: bool,
    /// Deploy the optimized weights to the drift monitor when validation
    /// produced an applicable baseline.
    pub deploy: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            time_ordered: true,
            seed: 0,
            objective: ObjectiveSpec::r_squared(),
            algorithm: AlgorithmChoice::Comprehensive,
            methods: vec![
                WeightMethod::Correlation,
                WeightMethod::Importance,
                WeightMethod::Regression,
                WeightMethod::TimeSeries,
                WeightMethod::Composite,
            ],
            constraints: WeightConstraints::default(),
            record_history: false,
            deploy: false,
        }
    }
}

/// Everything one pipeline run produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub findings: Vec<RelationshipFinding>,
    pub calculation: CalculationOutcome,
    pub optimization: OptimizationRun,
    pub validation: ValidationReport,
    /// Set when the run was deployed to the monitor.
    pub weight_id: Option<Uuid>,
}

/// The top-level analysis engine.
pub struct AnalysisEngine {
    config: Config,
    detector: RelationshipDetector,
    calculator: WeightCalculator,
    optimizer: WeightOptimizer,
    validator: WeightValidator,
    monitor: DriftMonitor,
}

impl AnalysisEngine {
    pub fn new(config: Config) -> Self {
        let calculator = WeightCalculator::new(config.weighting.clone());
        let optimizer = WeightOptimizer::new(config.optimization.clone());
        let validator = WeightValidator::new(config.validation.clone());
        let monitor = DriftMonitor::new(config.monitoring.clone());
        Self {
            config,
            detector: RelationshipDetector::new(),
            calculator,
            optimizer,
            validator,
            monitor,
        }
    }

    /// Builds the engine from `acumen.toml` and the environment.
    pub fn from_env() -> Result<Self, EngineError> {
        Ok(Self::new(configuration::load_config()?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The drift monitor is stateful across pipeline runs; callers feed it
    /// live windows through this accessor.
    pub fn monitor(&mut self) -> &mut DriftMonitor {
        &mut self.monitor
    }

    /// Detects marginal relationships between features and the target.
    pub fn detect_relationships(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        options: &RunOptions,
    ) -> Result<Vec<RelationshipFinding>, EngineError> {
        check_alignment(features, target)?;
        let detection = DetectionOptions {
            settings: self.config.detection.clone(),
            time_ordered: options.time_ordered,
            seed: options.seed,
        };
        Ok(self.detector.detect(features, target, &detection)?)
    }

    /// Computes a weight vector per requested method. Lag findings feed the
    /// time-series method, so they are detected here when the caller has
    /// not already run detection.
    pub fn calculate_weights(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        findings: &[RelationshipFinding],
        options: &RunOptions,
    ) -> Result<CalculationOutcome, EngineError> {
        check_alignment(features, target)?;
        let context = CalculationContext {
            time_ordered: options.time_ordered,
            lag_findings: findings
                .iter()
                .filter(|f| matches!(f, RelationshipFinding::Lag { .. }))
                .cloned()
                .collect(),
        };
        Ok(self
            .calculator
            .calculate(features, target, &options.methods, &context)?)
    }

    /// Optimizes a weight vector against the objective.
    pub fn optimize_weights(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        initial: Option<WeightVector>,
        options: &RunOptions,
        cancel: &CancelToken,
    ) -> Result<OptimizationRun, EngineError> {
        check_alignment(features, target)?;
        let request = OptimizeRequest {
            initial,
            objective: options.objective.clone(),
            algorithm: options.algorithm,
            constraints: options.constraints.clone(),
            seed: options.seed,
            record_history: options.record_history,
        };
        Ok(self.optimizer.optimize(features, target, &request, cancel)?)
    }

    /// Validates a weight vector's robustness.
    pub fn validate_weights(
        &self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
        options: &RunOptions,
    ) -> Result<ValidationReport, EngineError> {
        check_alignment(features, target)?;
        let validation = ValidationOptions {
            time_ordered: options.time_ordered,
            seed: options.seed,
            ..ValidationOptions::default()
        };
        Ok(self
            .validator
            .validate(features, target, weights, &options.objective, &validation)?)
    }

    /// The full pipeline: detect, calculate, optimize (starting from the
    /// calculated composite), validate, and optionally deploy.
    pub fn run_analysis(
        &mut self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        options: &RunOptions,
        cancel: &CancelToken,
    ) -> Result<PipelineOutcome, EngineError> {
        check_alignment(features, target)?;

        let findings = self.detect_relationships(features, target, options)?;
        info!(findings = findings.len(), "detection finished");

        let calculation = self.calculate_weights(features, target, &findings, options)?;
        // The composite is the preferred starting point; any computed
        // method will do when it was skipped.
        let initial = calculation
            .per_method
            .get(&WeightMethod::Composite)
            .or_else(|| calculation.per_method.values().next())
            .cloned();

        let optimization = self.optimize_weights(features, target, initial, options, cancel)?;
        info!(
            algorithm = %optimization.result.algorithm,
            score = optimization.result.score,
            "optimization finished"
        );

        let validation =
            self.validate_weights(features, target, &optimization.result.weights, options)?;

        let weight_id = if options.deploy && validation.aggregate_score().is_some() {
            let id = self.monitor.deploy(
                features,
                target,
                &optimization.result.weights,
                options.objective.clone(),
                &validation,
            )?;
            Some(id)
        } else {
            None
        };

        Ok(PipelineOutcome {
            findings,
            calculation,
            optimization,
            validation,
            weight_id,
        })
    }
}

/// Shared input contract: one target observation per feature row.
fn check_alignment(features: &FeatureMatrix, target: &TargetSeries) -> Result<(), EngineError> {
    if features.n_rows() != target.len() {
        return Err(EngineError::Core(CoreError::invalid(
            target.name().to_string(),
            format!(
                "target has {} observations but the feature matrix has {} rows",
                target.len(),
                features.n_rows()
            ),
        )));
    }
    Ok(())
}
