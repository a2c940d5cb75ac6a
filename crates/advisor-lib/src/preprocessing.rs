//! Column preprocessing: standard scaling for numerics, one-hot encoding for
//! categoricals. Fitted once on the training split and stored inside each
//! pipeline artifact.

use crate::boosting::{FeatureMatrix, SparseRow};
use crate::features::{FeatureRow, CAT_FEATURES, NUM_CATEGORICAL, NUM_FEATURES, NUM_NUMERIC};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-column standardization. Missing values pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[FeatureRow]) -> Self {
        let mut means = Vec::with_capacity(NUM_NUMERIC);
        let mut scales = Vec::with_capacity(NUM_NUMERIC);

        for column in 0..NUM_NUMERIC {
            let values: Vec<f64> = rows.iter().filter_map(|r| r.numeric[column]).collect();
            if values.is_empty() {
                means.push(0.0);
                scales.push(1.0);
                continue;
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();

            means.push(mean);
            scales.push(if std > 0.0 && std.is_finite() { std } else { 1.0 });
        }

        Self { means, scales }
    }

    pub fn transform(&self, values: &[Option<f64>; NUM_NUMERIC]) -> Vec<Option<f64>> {
        values
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(value, (mean, scale))| value.map(|v| (v - mean) / scale))
            .collect()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}

/// One-hot encoder over sorted category lists. Categories not seen during
/// fitting encode to all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit(rows: &[FeatureRow]) -> Self {
        let categories = (0..NUM_CATEGORICAL)
            .map(|column| {
                rows.iter()
                    .map(|r| r.categorical[column].clone())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .collect();
        Self { categories }
    }

    /// Total number of indicator columns
    pub fn n_outputs(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn categories(&self, column: usize) -> &[String] {
        &self.categories[column]
    }

    /// Indices of the active indicators, shifted by `offset`
    pub fn encode(&self, values: &[String; NUM_CATEGORICAL], offset: usize) -> Vec<usize> {
        let mut active = Vec::with_capacity(NUM_CATEGORICAL);
        let mut base = offset;
        for (value, categories) in values.iter().zip(&self.categories) {
            if let Ok(position) = categories.binary_search(value) {
                active.push(base + position);
            }
            base += categories.len();
        }
        active
    }

    /// Output column names, `<column>_<category>`
    pub fn output_names(&self) -> Vec<String> {
        CAT_FEATURES
            .iter()
            .zip(&self.categories)
            .flat_map(|(column, categories)| {
                categories.iter().map(move |c| format!("{}_{}", column, c))
            })
            .collect()
    }
}

/// Scaler and encoder applied side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    scaler: StandardScaler,
    encoder: OneHotEncoder,
}

impl Preprocessor {
    pub fn fit(rows: &[FeatureRow]) -> Self {
        Self {
            scaler: StandardScaler::fit(rows),
            encoder: OneHotEncoder::fit(rows),
        }
    }

    pub fn transform_row(&self, row: &FeatureRow) -> SparseRow {
        SparseRow::new(
            self.scaler.transform(&row.numeric),
            self.encoder.encode(&row.categorical, NUM_NUMERIC),
        )
    }

    pub fn transform(&self, rows: &[FeatureRow]) -> FeatureMatrix {
        FeatureMatrix::new(
            NUM_NUMERIC,
            self.encoder.n_outputs(),
            rows.iter().map(|r| self.transform_row(r)).collect(),
        )
    }

    pub fn n_features_out(&self) -> usize {
        NUM_NUMERIC + self.encoder.n_outputs()
    }

    pub fn feature_names(&self) -> Vec<String> {
        NUM_FEATURES
            .iter()
            .map(|c| c.to_string())
            .chain(self.encoder.output_names())
            .collect()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }
}
