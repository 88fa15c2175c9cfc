//! # Acumen Monitor
//!
//! Watches deployed weight vectors. At deployment time the monitor freezes
//! the training-window feature statistics and anchors a performance band on
//! the validation report; every later observation scores the live window
//! against that frozen baseline and measures how far outside the band the
//! objective has moved.
//!
//! A single bad window is noise. An anomaly is only raised after the drift
//! score exceeds the threshold on enough consecutive observations, which
//! keeps one-off data glitches from paging anyone.

use analytics::{stats, FrozenStats, ScoringEngine};
use chrono::Utc;
use configuration::MonitoringSettings;
use core_types::{
    CoreError, FeatureMatrix, MethodOutcome, MonitoringSnapshot, ObjectiveSpec, TargetSeries,
    ValidationReport, WeightVector,
};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

pub mod error;

pub use error::MonitorError;

/// The validated performance band a deployment is held against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    /// Expected objective score on live data.
    pub mean: f64,
    /// Expected dispersion; the acceptance band is `mean ± 2 * spread`.
    pub spread: f64,
}

#[derive(Debug)]
struct Deployment {
    weights: WeightVector,
    objective: ObjectiveSpec,
    frozen: FrozenStats,
    baseline: Baseline,
    consecutive_breaches: usize,
    history: Vec<MonitoringSnapshot>,
}

/// Tracks live performance of deployed weight vectors against their
/// validated baselines.
pub struct DriftMonitor {
    settings: MonitoringSettings,
    scoring: ScoringEngine,
    deployments: HashMap<Uuid, Deployment>,
}

impl DriftMonitor {
    pub fn new(settings: MonitoringSettings) -> Self {
        Self {
            settings,
            scoring: ScoringEngine::new(),
            deployments: HashMap::new(),
        }
    }

    /// Registers a weight vector for monitoring. The feature statistics of
    /// the training window are frozen here; live windows are standardized
    /// with them so distribution shifts surface as score changes instead of
    /// being re-standardized away. The baseline band comes from the
    /// validation report's applicable methods.
    pub fn deploy(
        &mut self,
        features: &FeatureMatrix,
        target: &TargetSeries,
        weights: &WeightVector,
        objective: ObjectiveSpec,
        report: &ValidationReport,
    ) -> Result<Uuid, MonitorError> {
        let frozen = self.scoring.fit_stats(features, target, weights)?;
        let baseline = self.baseline_from_report(report)?;

        let id = Uuid::new_v4();
        info!(
            weight_id = %id,
            baseline_mean = baseline.mean,
            baseline_spread = baseline.spread,
            "weights deployed for monitoring"
        );
        self.deployments.insert(
            id,
            Deployment {
                weights: weights.clone(),
                objective,
                frozen,
                baseline,
                consecutive_breaches: 0,
                history: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Scores one live window and appends a snapshot to the deployment's
    /// history. When a freshly recalculated recommendation is supplied, the
    /// L1 distance between it and the deployed weights is recorded too.
    pub fn observe(
        &mut self,
        id: Uuid,
        live_features: &FeatureMatrix,
        live_target: &TargetSeries,
        recalculated: Option<&WeightVector>,
    ) -> Result<MonitoringSnapshot, MonitorError> {
        let deployment = self
            .deployments
            .get_mut(&id)
            .ok_or(MonitorError::UnknownDeployment(id))?;

        let score = self.scoring.score_frozen(
            live_features,
            live_target,
            &deployment.weights,
            &deployment.objective,
            &deployment.frozen,
        )?;

        let Baseline { mean, spread } = deployment.baseline;
        let half_width = 2.0 * spread;
        let distance = (score - mean).abs();
        let excess = (distance - half_width).max(0.0);
        // Saturating ratio in [0, 1): zero inside the band, approaching one
        // as the score leaves it far behind.
        let drift_score = excess / (excess + half_width);

        let breached = drift_score > self.settings.drift_threshold;
        if breached {
            deployment.consecutive_breaches += 1;
        } else {
            deployment.consecutive_breaches = 0;
        }
        let is_anomalous = deployment.consecutive_breaches >= self.settings.consecutive_breaches;

        let explanation = if breached {
            format!(
                "objective {score:.4} is outside the baseline band [{:.4}, {:.4}] (drift {drift_score:.3}, breach {} of {})",
                mean - half_width,
                mean + half_width,
                deployment.consecutive_breaches,
                self.settings.consecutive_breaches,
            )
        } else {
            format!(
                "objective {score:.4} is within the baseline band [{:.4}, {:.4}]",
                mean - half_width,
                mean + half_width,
            )
        };
        if is_anomalous {
            warn!(weight_id = %id, drift_score, "deployment flagged as anomalous");
        }

        let snapshot = MonitoringSnapshot {
            timestamp: Utc::now(),
            weight_id: id,
            weights: deployment.weights.clone(),
            objective_score: score,
            drift_score,
            weight_drift: recalculated.map(|r| deployment.weights.l1_distance(r)),
            is_anomalous,
            explanation,
        };
        deployment.history.push(snapshot.clone());
        Ok(snapshot)
    }

    /// Append-only snapshot history of a deployment.
    pub fn history(&self, id: Uuid) -> Result<&[MonitoringSnapshot], MonitorError> {
        self.deployments
            .get(&id)
            .map(|d| d.history.as_slice())
            .ok_or(MonitorError::UnknownDeployment(id))
    }

    pub fn baseline(&self, id: Uuid) -> Result<Baseline, MonitorError> {
        self.deployments
            .get(&id)
            .map(|d| d.baseline)
            .ok_or(MonitorError::UnknownDeployment(id))
    }

    /// Stops monitoring a deployment and returns its history.
    pub fn retire(&mut self, id: Uuid) -> Result<Vec<MonitoringSnapshot>, MonitorError> {
        self.deployments
            .remove(&id)
            .map(|d| d.history)
            .ok_or(MonitorError::UnknownDeployment(id))
    }

    /// Mean and dispersion of the objective over the validation report's
    /// applicable methods, with the configured relative floor so a
    /// suspiciously tight validation run cannot produce a hair-trigger band.
    fn baseline_from_report(&self, report: &ValidationReport) -> Result<Baseline, MonitorError> {
        let mut means = Vec::new();
        let mut spreads = Vec::new();
        for method in &report.methods {
            if let MethodOutcome::Scored {
                mean_objective,
                spread,
                ..
            } = method.outcome
            {
                means.push(mean_objective);
                spreads.push(spread);
            }
        }
        if means.is_empty() {
            return Err(MonitorError::Core(CoreError::invalid(
                "deployment",
                "validation report has no applicable methods to anchor a baseline on",
            )));
        }
        let mean = stats::mean(&means);
        let spread = stats::mean(&spreads)
            .max(stats::std_dev(&means))
            .max(self.settings.baseline_spread * mean.abs())
            .max(1e-9);
        Ok(Baseline { mean, spread })
    }
}
