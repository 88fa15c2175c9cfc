use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which side of a detected threshold carries the higher target mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdDirection {
    TargetHigherAbove,
    TargetHigherBelow,
}

/// One detected relationship between features and the target.
///
/// Findings are immutable once produced. Each variant carries the implicated
/// feature name(s), a strength score in [0, 1], a significance score in
/// [0, 1] and the metadata specific to its detection method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipFinding {
    /// Two features jointly explain more of the target than the sum of their
    /// individual contributions (or are collinear to the point of acting as
    /// one signal).
    Synergy {
        features: (String, String),
        strength: f64,
        significance: f64,
        joint_r2: f64,
        individual_r2_sum: f64,
    },
    /// Target behavior changes discontinuously past a feature value.
    Threshold {
        feature: String,
        strength: f64,
        significance: f64,
        threshold: f64,
        direction: ThresholdDirection,
    },
    /// The feature at offset -lag correlates with the target at offset 0.
    Lag {
        feature: String,
        strength: f64,
        significance: f64,
        lag: usize,
        correlation: f64,
    },
    /// A higher-order interaction surfaced by ensemble importance gain on an
    /// engineered feature.
    Interaction {
        features: Vec<String>,
        strength: f64,
        significance: f64,
        degree: usize,
        importance_gain: f64,
    },
}

impl RelationshipFinding {
    pub fn strength(&self) -> f64 {
        match self {
            RelationshipFinding::Synergy { strength, .. }
            | RelationshipFinding::Threshold { strength, .. }
            | RelationshipFinding::Lag { strength, .. }
            | RelationshipFinding::Interaction { strength, .. } => *strength,
        }
    }

    pub fn significance(&self) -> f64 {
        match self {
            RelationshipFinding::Synergy { significance, .. }
            | RelationshipFinding::Threshold { significance, .. }
            | RelationshipFinding::Lag { significance, .. }
            | RelationshipFinding::Interaction { significance, .. } => *significance,
        }
    }

    /// Implicated feature names, joined, used as the deterministic tie-break
    /// when sorting findings.
    pub fn feature_key(&self) -> String {
        match self {
            RelationshipFinding::Synergy { features, .. } => {
                format!("{}+{}", features.0, features.1)
            }
            RelationshipFinding::Threshold { feature, .. }
            | RelationshipFinding::Lag { feature, .. } => feature.clone(),
            RelationshipFinding::Interaction { features, .. } => features.join("+"),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            RelationshipFinding::Synergy { .. } => "synergy",
            RelationshipFinding::Threshold { .. } => "threshold",
            RelationshipFinding::Lag { .. } => "lag",
            RelationshipFinding::Interaction { .. } => "interaction",
        }
    }

    /// Detector result ordering: strength descending, then significance
    /// descending, then feature names lexically.
    pub fn ordering(&self, other: &Self) -> Ordering {
        other
            .strength()
            .total_cmp(&self.strength())
            .then_with(|| other.significance().total_cmp(&self.significance()))
            .then_with(|| self.feature_key().cmp(&other.feature_key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lag(feature: &str, strength: f64, significance: f64) -> RelationshipFinding {
        RelationshipFinding::Lag {
            feature: feature.to_string(),
            strength,
            significance,
            lag: 1,
            correlation: strength,
        }
    }

    #[test]
    fn ordering_is_strength_then_significance_then_name() {
        let mut findings = vec![
            lag("b", 0.5, 0.9),
            lag("a", 0.5, 0.9),
            lag("c", 0.9, 0.1),
            lag("d", 0.5, 0.95),
        ];
        findings.sort_by(|a, b| a.ordering(b));
        let keys: Vec<String> = findings.iter().map(|f| f.feature_key()).collect();
        assert_eq!(keys, vec!["c", "d", "a", "b"]);
    }
}
