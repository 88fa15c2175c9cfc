use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Minimum number of observations required before any analysis is attempted.
pub const MIN_SAMPLES_DEFAULT: usize = 10;

/// An immutable matrix of named feature columns.
///
/// Rows are observations; insertion order is time order when the matrix is
/// used for lag analysis. Validation happens exactly once, at construction:
/// equal column lengths, a minimum row count, finite values, unique names and
/// non-zero variance per column. After that the matrix is read-only for the
/// lifetime of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    rows: usize,
}

impl FeatureMatrix {
    /// Builds and validates a matrix from named columns.
    ///
    /// Zero-variance columns are rejected with a data-quality error rather
    /// than silently dropped, so the caller always knows which input was bad.
    pub fn new(columns: Vec<(String, Vec<f64>)>, min_samples: usize) -> Result<Self, CoreError> {
        if columns.is_empty() {
            return Err(CoreError::invalid("feature_matrix", "no feature columns"));
        }

        let rows = columns[0].1.len();
        if rows < min_samples {
            return Err(CoreError::DataInsufficient {
                entity: "feature_matrix".to_string(),
                rows,
                required: min_samples,
            });
        }

        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());

        for (name, column) in columns {
            if names.contains(&name) {
                return Err(CoreError::invalid(
                    name.clone(),
                    "duplicate feature name",
                ));
            }
            if column.len() != rows {
                return Err(CoreError::invalid(
                    name.clone(),
                    format!("column length {} does not match {} rows", column.len(), rows),
                ));
            }
            if let Some(bad) = column.iter().find(|v| !v.is_finite()) {
                return Err(CoreError::invalid(
                    name.clone(),
                    format!("non-finite value {bad} in column"),
                ));
            }
            if is_constant(&column) {
                return Err(CoreError::ZeroVariance { feature: name });
            }
            names.push(name);
            values.push(column);
        }

        Ok(Self {
            names,
            columns: values,
            rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn column_at(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// A derived matrix containing the given rows, in the given order.
    ///
    /// Used by resampling validation methods. Constructor invariants are not
    /// re-checked: a bootstrap draw may legitimately produce a constant
    /// column, and downstream scoring treats those as zero contribution.
    pub fn subset_rows(&self, indices: &[usize]) -> FeatureMatrix {
        let columns = self
            .columns
            .iter()
            .map(|col| indices.iter().map(|&i| col[i]).collect())
            .collect();
        FeatureMatrix {
            names: self.names.clone(),
            columns,
            rows: indices.len(),
        }
    }

    /// A derived matrix with the given feature columns only.
    pub fn subset_features(&self, feature_indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            names: feature_indices.iter().map(|&i| self.names[i].clone()).collect(),
            columns: feature_indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self.rows,
        }
    }
}

/// An immutable series of target outcomes, aligned row-for-row with a
/// `FeatureMatrix`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSeries {
    name: String,
    values: Vec<f64>,
}

impl TargetSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Result<Self, CoreError> {
        let name = name.into();
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(CoreError::invalid(
                name.clone(),
                format!("non-finite value {bad} in target series"),
            ));
        }
        Ok(Self { name, values })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn subset(&self, indices: &[usize]) -> TargetSeries {
        TargetSeries {
            name: self.name.clone(),
            values: indices.iter().map(|&i| self.values[i]).collect(),
        }
    }
}

fn is_constant(column: &[f64]) -> bool {
    let first = column[0];
    column.iter().all(|v| (*v - first).abs() < f64::EPSILON)
}
