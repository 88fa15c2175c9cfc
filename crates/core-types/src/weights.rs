use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance for the sum-to-one normalization contract.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-6;

/// A mapping from feature name to a finite weight, with a stable iteration
/// order (insertion order, which matches the feature matrix column order
/// everywhere in the engine).
///
/// A `WeightVector` is never mutated in place; every transformation returns a
/// new vector. By default the contract is the feasible simplex: non-negative
/// entries summing to 1.0 within `NORMALIZATION_TOLERANCE`. Callers that
/// explicitly opt out of normalization carry that in `WeightConstraints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    entries: Vec<WeightEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub name: String,
    pub value: f64,
}

impl WeightVector {
    /// Builds a vector from (name, weight) pairs. Weights must be finite and
    /// names unique; no normalization is applied here.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut entries: Vec<WeightEntry> = Vec::new();
        for (name, value) in pairs {
            let name = name.into();
            if !value.is_finite() {
                return Err(CoreError::invalid(
                    name,
                    format!("non-finite weight {value}"),
                ));
            }
            if entries.iter().any(|e| e.name == name) {
                return Err(CoreError::invalid(name, "duplicate weight name"));
            }
            entries.push(WeightEntry { name, value });
        }
        if entries.is_empty() {
            return Err(CoreError::invalid("weight_vector", "no entries"));
        }
        Ok(Self { entries })
    }

    /// A uniform vector over the given feature names.
    pub fn uniform(names: &[String]) -> Result<Self, CoreError> {
        let share = 1.0 / names.len() as f64;
        Self::from_pairs(names.iter().map(|n| (n.clone(), share)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|e| (e.name.as_str(), e.value))
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.value)
    }

    /// Weight values in the order of the given feature names. Fails if any
    /// name is missing, so a weight vector can never be silently applied to a
    /// matrix it was not built for.
    pub fn aligned_values(&self, names: &[String]) -> Result<Vec<f64>, CoreError> {
        names
            .iter()
            .map(|n| {
                self.get(n)
                    .ok_or_else(|| CoreError::invalid(n.clone(), "weight missing for feature"))
            })
            .collect()
    }

    /// A new vector with the same names and the given values.
    pub fn with_values(&self, values: &[f64]) -> Result<Self, CoreError> {
        if values.len() != self.entries.len() {
            return Err(CoreError::invalid(
                "weight_vector",
                format!(
                    "{} values supplied for {} entries",
                    values.len(),
                    self.entries.len()
                ),
            ));
        }
        Self::from_pairs(
            self.entries
                .iter()
                .zip(values)
                .map(|(e, &v)| (e.name.clone(), v)),
        )
    }

    /// A new vector rescaled onto the simplex: negative entries clamped to
    /// zero, then divided by the sum. Fails with a numeric-instability error
    /// if everything clamps to zero.
    pub fn normalized(&self) -> Result<Self, CoreError> {
        let clamped: Vec<f64> = self.entries.iter().map(|e| e.value.max(0.0)).collect();
        let sum: f64 = clamped.iter().sum();
        if sum <= 0.0 || !sum.is_finite() {
            return Err(CoreError::unstable(
                "weight_vector",
                "normalization sum is zero or non-finite",
            ));
        }
        self.with_values(&clamped.iter().map(|v| v / sum).collect::<Vec<_>>())
    }

    /// Whether the vector satisfies the default simplex contract.
    pub fn is_normalized(&self) -> bool {
        let sum: f64 = self.entries.iter().map(|e| e.value).sum();
        self.entries.iter().all(|e| e.value >= -NORMALIZATION_TOLERANCE)
            && (sum - 1.0).abs() <= NORMALIZATION_TOLERANCE
    }

    /// L1 distance to another vector over the union of feature names.
    /// Missing entries count as zero, so composition drift shows up even when
    /// a recalculated recommendation adds or drops a feature.
    pub fn l1_distance(&self, other: &WeightVector) -> f64 {
        let mut distance = 0.0;
        for e in &self.entries {
            distance += (e.value - other.get(&e.name).unwrap_or(0.0)).abs();
        }
        for e in &other.entries {
            if self.get(&e.name).is_none() {
                distance += e.value.abs();
            }
        }
        distance
    }
}

/// The feasible region for optimized weights.
///
/// The default contract is the simplex: non-negative weights summing to 1.
/// `unconstrained()` is the explicit opt-out for callers that want raw
/// weights. Optional per-feature box bounds further narrow the region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightConstraints {
    /// Require non-negative weights summing to 1.0.
    pub normalized: bool,
    /// Per-feature (lower, upper) bounds.
    pub bounds: BTreeMap<String, (f64, f64)>,
}

impl Default for WeightConstraints {
    fn default() -> Self {
        Self {
            normalized: true,
            bounds: BTreeMap::new(),
        }
    }
}

impl WeightConstraints {
    pub fn unconstrained() -> Self {
        Self {
            normalized: false,
            bounds: BTreeMap::new(),
        }
    }

    pub fn with_bound(mut self, name: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.bounds.insert(name.into(), (lower, upper));
        self
    }

    /// Rejects self-contradictory constraints before any search starts.
    pub fn validate(&self, names: &[String]) -> Result<(), CoreError> {
        let mut lower_sum = 0.0;
        let mut upper_sum = 0.0;
        for name in names {
            let (lo, hi) = self.bounds.get(name).copied().unwrap_or((0.0, 1.0));
            if lo > hi {
                return Err(CoreError::ConstraintViolation {
                    entity: name.clone(),
                    detail: format!("lower bound {lo} exceeds upper bound {hi}"),
                });
            }
            lower_sum += lo;
            upper_sum += hi;
        }
        for name in self.bounds.keys() {
            if !names.contains(name) {
                return Err(CoreError::ConstraintViolation {
                    entity: name.clone(),
                    detail: "bound references unknown feature".to_string(),
                });
            }
        }
        if self.normalized {
            if lower_sum > 1.0 + NORMALIZATION_TOLERANCE {
                return Err(CoreError::ConstraintViolation {
                    entity: "weight_constraints".to_string(),
                    detail: format!("lower bounds sum to {lower_sum}, leaving no room to sum to 1"),
                });
            }
            if upper_sum < 1.0 - NORMALIZATION_TOLERANCE {
                return Err(CoreError::ConstraintViolation {
                    entity: "weight_constraints".to_string(),
                    detail: format!("upper bounds sum to {upper_sum}, weights cannot reach 1"),
                });
            }
        }
        Ok(())
    }

    /// Whether a candidate (aligned with `names`) satisfies the constraints
    /// within normalization tolerance.
    pub fn is_satisfied(&self, names: &[String], values: &[f64]) -> bool {
        let tol = NORMALIZATION_TOLERANCE * names.len().max(1) as f64;
        if self.normalized {
            let sum: f64 = values.iter().sum();
            if (sum - 1.0).abs() > tol || values.iter().any(|v| *v < -tol) {
                return false;
            }
        }
        for (name, value) in names.iter().zip(values) {
            if let Some(&(lo, hi)) = self.bounds.get(name) {
                if *value < lo - tol || *value > hi + tol {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_onto_simplex() {
        let w = WeightVector::from_pairs(vec![("a", 3.0), ("b", 1.0), ("c", -2.0)]).unwrap();
        let n = w.normalized().unwrap();
        assert!(n.is_normalized());
        assert!((n.get("a").unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(n.get("c").unwrap(), 0.0);
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = WeightVector::from_pairs(vec![("a", 0.5), ("a", 0.5)]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
    }

    #[test]
    fn l1_distance_counts_missing_names() {
        let a = WeightVector::from_pairs(vec![("x", 0.6), ("y", 0.4)]).unwrap();
        let b = WeightVector::from_pairs(vec![("x", 0.6), ("z", 0.4)]).unwrap();
        assert!((a.l1_distance(&b) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn contradictory_bounds_are_rejected() {
        let names = vec!["a".to_string(), "b".to_string()];
        let c = WeightConstraints::default().with_bound("a", 0.8, 0.2);
        assert_eq!(
            c.validate(&names).unwrap_err().kind(),
            crate::ErrorKind::ConstraintViolation
        );

        // Upper bounds too tight to ever sum to one.
        let c = WeightConstraints::default()
            .with_bound("a", 0.0, 0.3)
            .with_bound("b", 0.0, 0.3);
        assert_eq!(
            c.validate(&names).unwrap_err().kind(),
            crate::ErrorKind::ConstraintViolation
        );
    }
}
