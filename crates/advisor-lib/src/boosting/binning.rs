//! Quantile binning of dense columns for histogram split search

use super::matrix::FeatureMatrix;

/// Bin index marking a missing value
pub(crate) const MISSING_BIN: u16 = u16::MAX;

/// Per-column cut points and per-row bin indices. A value `v` falls in the
/// first bin whose cut is `>= v`, so "bin <= b" is the same test as
/// "v <= cuts[b]".
#[derive(Debug, Clone)]
pub(crate) struct BinnedMatrix {
    cuts: Vec<Vec<f64>>,
    bins: Vec<Vec<u16>>,
}

impl BinnedMatrix {
    pub fn build(matrix: &FeatureMatrix, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, MISSING_BIN as usize - 1);
        let mut cuts = Vec::with_capacity(matrix.n_dense());
        let mut bins = Vec::with_capacity(matrix.n_dense());

        for column in 0..matrix.n_dense() {
            let mut values: Vec<f64> = matrix
                .rows()
                .iter()
                .filter_map(|row| row.dense[column])
                .collect();
            let column_cuts = quantile_cuts(&mut values, max_bins);

            let column_bins = matrix
                .rows()
                .iter()
                .map(|row| match row.dense[column] {
                    Some(v) => bin_of(v, &column_cuts),
                    None => MISSING_BIN,
                })
                .collect();

            cuts.push(column_cuts);
            bins.push(column_bins);
        }

        Self { cuts, bins }
    }

    pub fn cuts(&self, column: usize) -> &[f64] {
        &self.cuts[column]
    }

    pub fn bins(&self, column: usize) -> &[u16] {
        &self.bins[column]
    }
}

/// Ascending cut points; the last cut is always the column maximum
fn quantile_cuts(values: &mut [f64], max_bins: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    values.sort_by(f64::total_cmp);

    let mut distinct = values.to_vec();
    distinct.dedup();
    if distinct.len() <= max_bins {
        return distinct;
    }

    let n = values.len();
    let mut cuts: Vec<f64> = (1..=max_bins)
        .map(|i| values[((i * n).div_ceil(max_bins)).max(1) - 1])
        .collect();
    cuts.dedup();
    cuts
}

fn bin_of(value: f64, cuts: &[f64]) -> u16 {
    let idx = cuts.partition_point(|&c| c < value);
    idx.min(cuts.len().saturating_sub(1)) as u16
}
