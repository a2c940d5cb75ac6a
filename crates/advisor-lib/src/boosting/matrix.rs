//! Mixed dense/indicator feature matrix

/// One encoded row: dense columns (scaled numerics, possibly missing) followed
/// by binary indicator columns, stored as the sorted indices of the ones.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseRow {
    pub dense: Vec<Option<f64>>,
    pub indicators: Vec<usize>,
}

impl SparseRow {
    pub fn new(dense: Vec<Option<f64>>, mut indicators: Vec<usize>) -> Self {
        indicators.sort_unstable();
        indicators.dedup();
        Self { dense, indicators }
    }

    /// Value of global column `column`. Indicator columns are never missing.
    pub fn value(&self, column: usize) -> Option<f64> {
        if column < self.dense.len() {
            self.dense[column]
        } else if self.indicators.binary_search(&column).is_ok() {
            Some(1.0)
        } else {
            Some(0.0)
        }
    }
}

/// Row-major matrix of [`SparseRow`]s with a fixed column layout
#[derive(Debug, Clone, Default)]
pub struct FeatureMatrix {
    n_dense: usize,
    n_indicators: usize,
    rows: Vec<SparseRow>,
}

impl FeatureMatrix {
    pub fn new(n_dense: usize, n_indicators: usize, rows: Vec<SparseRow>) -> Self {
        debug_assert!(rows.iter().all(|r| r.dense.len() == n_dense));
        Self {
            n_dense,
            n_indicators,
            rows,
        }
    }

    /// Matrix with dense columns only
    pub fn from_dense(rows: Vec<Vec<Option<f64>>>) -> Self {
        let n_dense = rows.first().map_or(0, Vec::len);
        let rows = rows
            .into_iter()
            .map(|dense| SparseRow::new(dense, Vec::new()))
            .collect();
        Self::new(n_dense, 0, rows)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_dense(&self) -> usize {
        self.n_dense
    }

    pub fn n_indicators(&self) -> usize {
        self.n_indicators
    }

    pub fn n_columns(&self) -> usize {
        self.n_dense + self.n_indicators
    }

    pub fn rows(&self) -> &[SparseRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &SparseRow {
        &self.rows[index]
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_lookup() {
        let row = SparseRow::new(vec![Some(1.5), None], vec![4, 2]);
        assert_eq!(row.indicators, vec![2, 4]);
        assert_eq!(row.value(0), Some(1.5));
        assert_eq!(row.value(1), None);
        assert_eq!(row.value(2), Some(1.0));
        assert_eq!(row.value(3), Some(0.0));
        assert_eq!(row.value(4), Some(1.0));
    }

    #[test]
    fn test_from_dense() {
        let matrix =
            FeatureMatrix::from_dense(vec![vec![Some(1.0), Some(2.0)], vec![None, Some(0.0)]]);
        assert_eq!(matrix.n_rows(), 2);
        assert_eq!(matrix.n_columns(), 2);
        assert_eq!(matrix.n_indicators(), 0);
        assert_eq!(matrix.row(1).value(0), None);
    }
}
