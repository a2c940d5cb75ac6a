//! Second-order regression trees
//!
//! Each tree is grown depth-first on gradient/hessian statistics. Dense
//! columns are split on histogram bins with a learned direction for missing
//! values; indicator columns are split at 0.5.

use super::binning::{BinnedMatrix, MISSING_BIN};
use super::matrix::{FeatureMatrix, SparseRow};
use serde::{Deserialize, Serialize};

/// Smallest gain accepted for a split
const MIN_SPLIT_GAIN: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub learning_rate: f64,
    pub reg_lambda: f64,
    pub gamma: f64,
    pub min_child_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        default_left: bool,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// A fitted tree; leaf weights already include the learning rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    pub fn predict(&self, row: &SparseRow) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { weight } => return *weight,
                Node::Split {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                } => {
                    node = if goes_left(row, *feature, *threshold, *default_left) {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

fn goes_left(row: &SparseRow, feature: usize, threshold: f64, default_left: bool) -> bool {
    match row.value(feature) {
        Some(v) => v <= threshold,
        None => default_left,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct GradStats {
    grad: f64,
    hess: f64,
    count: usize,
}

impl GradStats {
    fn add(&mut self, grad: f64, hess: f64) {
        self.grad += grad;
        self.hess += hess;
        self.count += 1;
    }

    fn plus(self, other: GradStats) -> GradStats {
        GradStats {
            grad: self.grad + other.grad,
            hess: self.hess + other.hess,
            count: self.count + other.count,
        }
    }

    fn minus(self, other: GradStats) -> GradStats {
        GradStats {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }

    fn score(&self, lambda: f64) -> f64 {
        self.grad * self.grad / (self.hess + lambda)
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    default_left: bool,
    gain: f64,
}

pub(crate) struct TreeBuilder<'a> {
    matrix: &'a FeatureMatrix,
    binned: &'a BinnedMatrix,
    grad: &'a [f64],
    hess: &'a [f64],
    params: TreeParams,
    dense_columns: Vec<usize>,
    indicator_mask: Vec<bool>,
}

impl<'a> TreeBuilder<'a> {
    /// `columns` is the column sample for this tree, in global column indices
    pub fn new(
        matrix: &'a FeatureMatrix,
        binned: &'a BinnedMatrix,
        grad: &'a [f64],
        hess: &'a [f64],
        params: TreeParams,
        columns: &[usize],
    ) -> Self {
        let n_dense = matrix.n_dense();
        let mut dense_columns = Vec::new();
        let mut indicator_mask = vec![false; matrix.n_indicators()];
        for &column in columns {
            if column < n_dense {
                dense_columns.push(column);
            } else if column < matrix.n_columns() {
                indicator_mask[column - n_dense] = true;
            }
        }
        dense_columns.sort_unstable();

        Self {
            matrix,
            binned,
            grad,
            hess,
            params,
            dense_columns,
            indicator_mask,
        }
    }

    pub fn build(&self, rows: Vec<usize>) -> RegressionTree {
        RegressionTree {
            root: self.grow(rows, 0),
        }
    }

    fn grow(&self, rows: Vec<usize>, depth: usize) -> Node {
        let total = self.totals(&rows);
        if depth >= self.params.max_depth
            || rows.len() < 2
            || total.hess < 2.0 * self.params.min_child_weight
        {
            return self.leaf(total);
        }

        let Some(split) = self.best_split(&rows, total) else {
            return self.leaf(total);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = rows.into_iter().partition(|&r| {
            goes_left(
                self.matrix.row(r),
                split.feature,
                split.threshold,
                split.default_left,
            )
        });
        if left.is_empty() || right.is_empty() {
            let rows: Vec<usize> = left.into_iter().chain(right).collect();
            return self.leaf(self.totals(&rows));
        }

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            default_left: split.default_left,
            left: Box::new(self.grow(left, depth + 1)),
            right: Box::new(self.grow(right, depth + 1)),
        }
    }

    fn totals(&self, rows: &[usize]) -> GradStats {
        let mut total = GradStats::default();
        for &r in rows {
            total.add(self.grad[r], self.hess[r]);
        }
        total
    }

    fn leaf(&self, total: GradStats) -> Node {
        let weight = -total.grad / (total.hess + self.params.reg_lambda);
        Node::Leaf {
            weight: weight * self.params.learning_rate,
        }
    }

    fn gain(&self, left: GradStats, right: GradStats, total: GradStats) -> Option<f64> {
        let min_weight = self.params.min_child_weight;
        if left.count == 0 || right.count == 0 || left.hess < min_weight || right.hess < min_weight
        {
            return None;
        }
        let lambda = self.params.reg_lambda;
        let gain = 0.5 * (left.score(lambda) + right.score(lambda) - total.score(lambda))
            - self.params.gamma;
        (gain > MIN_SPLIT_GAIN).then_some(gain)
    }

    fn best_split(&self, rows: &[usize], total: GradStats) -> Option<SplitCandidate> {
        let mut best: Option<SplitCandidate> = None;
        let mut consider = |candidate: SplitCandidate| {
            if best.map_or(true, |b| candidate.gain > b.gain) {
                best = Some(candidate);
            }
        };

        for &feature in &self.dense_columns {
            let cuts = self.binned.cuts(feature);
            if cuts.is_empty() {
                continue;
            }
            let bins = self.binned.bins(feature);

            let mut histogram = vec![GradStats::default(); cuts.len()];
            let mut missing = GradStats::default();
            for &r in rows {
                match bins[r] {
                    MISSING_BIN => missing.add(self.grad[r], self.hess[r]),
                    b => histogram[b as usize].add(self.grad[r], self.hess[r]),
                }
            }

            let mut left = GradStats::default();
            for (b, stats) in histogram.iter().enumerate() {
                left = left.plus(*stats);

                if let Some(gain) = self.gain(left, total.minus(left), total) {
                    consider(SplitCandidate {
                        feature,
                        threshold: cuts[b],
                        default_left: false,
                        gain,
                    });
                }

                if missing.count > 0 {
                    let with_missing = left.plus(missing);
                    if let Some(gain) = self.gain(with_missing, total.minus(with_missing), total) {
                        consider(SplitCandidate {
                            feature,
                            threshold: cuts[b],
                            default_left: true,
                            gain,
                        });
                    }
                }
            }
        }

        if self.indicator_mask.iter().any(|&m| m) {
            let n_dense = self.matrix.n_dense();
            let mut ones = vec![GradStats::default(); self.indicator_mask.len()];
            for &r in rows {
                for &column in &self.matrix.row(r).indicators {
                    let k = column - n_dense;
                    if self.indicator_mask[k] {
                        ones[k].add(self.grad[r], self.hess[r]);
                    }
                }
            }

            for (k, right) in ones.iter().enumerate() {
                if right.count == 0 {
                    continue;
                }
                if let Some(gain) = self.gain(total.minus(*right), *right, total) {
                    consider(SplitCandidate {
                        feature: n_dense + k,
                        threshold: 0.5,
                        default_left: true,
                        gain,
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TreeParams {
        TreeParams {
            max_depth: 3,
            learning_rate: 1.0,
            reg_lambda: 0.0,
            gamma: 0.0,
            min_child_weight: 0.0,
        }
    }

    /// Squared-error gradients at a zero prediction
    fn gradients(targets: &[f64]) -> (Vec<f64>, Vec<f64>) {
        (targets.iter().map(|y| -y).collect(), vec![1.0; targets.len()])
    }

    #[test]
    fn test_single_split_recovers_step_function() {
        let matrix = FeatureMatrix::from_dense((0..8).map(|i| vec![Some(f64::from(i))]).collect());
        let targets = [1.0, 1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0];
        let (grad, hess) = gradients(&targets);
        let binned = BinnedMatrix::build(&matrix, 256);

        let tree = TreeBuilder::new(&matrix, &binned, &grad, &hess, params(), &[0])
            .build((0..8).collect());

        match tree.root() {
            Node::Split { threshold, .. } => assert_eq!(*threshold, 3.0),
            leaf => panic!("expected split, got {:?}", leaf),
        }
        for (i, y) in targets.iter().enumerate() {
            assert!((tree.predict(matrix.row(i)) - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_missing_values_learn_direction() {
        let matrix = FeatureMatrix::from_dense(vec![
            vec![Some(0.0)],
            vec![Some(1.0)],
            vec![Some(2.0)],
            vec![Some(3.0)],
            vec![None],
            vec![None],
        ]);
        let targets = [0.0, 0.0, 10.0, 10.0, 10.0, 10.0];
        let (grad, hess) = gradients(&targets);
        let binned = BinnedMatrix::build(&matrix, 256);

        let mut p = params();
        p.max_depth = 1;
        let tree = TreeBuilder::new(&matrix, &binned, &grad, &hess, p, &[0])
            .build((0..6).collect());

        match tree.root() {
            Node::Split {
                threshold,
                default_left,
                ..
            } => {
                assert_eq!(*threshold, 1.0);
                assert!(!default_left);
            }
            leaf => panic!("expected split, got {:?}", leaf),
        }
        assert!((tree.predict(matrix.row(4)) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_indicator_split() {
        let rows = (0..6)
            .map(|i| SparseRow::new(vec![Some(0.0)], vec![if i % 2 == 0 { 1 } else { 2 }]))
            .collect();
        let matrix = FeatureMatrix::new(1, 2, rows);
        let targets = [4.0, -4.0, 4.0, -4.0, 4.0, -4.0];
        let (grad, hess) = gradients(&targets);
        let binned = BinnedMatrix::build(&matrix, 256);

        let tree = TreeBuilder::new(&matrix, &binned, &grad, &hess, params(), &[0, 1, 2])
            .build((0..6).collect());

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
        assert!((tree.predict(matrix.row(0)) - 4.0).abs() < 1e-9);
        assert!((tree.predict(matrix.row(1)) + 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_depth_limit_and_constant_target() {
        let matrix = FeatureMatrix::from_dense((0..10).map(|i| vec![Some(f64::from(i))]).collect());
        let targets = [2.0; 10];
        let (grad, hess) = gradients(&targets);
        let binned = BinnedMatrix::build(&matrix, 256);

        let tree = TreeBuilder::new(&matrix, &binned, &grad, &hess, params(), &[0])
            .build((0..10).collect());
        assert_eq!(tree.depth(), 0);
        assert!((tree.predict(matrix.row(3)) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_serde_round_trip_preserves_predictions() {
        let matrix = FeatureMatrix::from_dense((0..8).map(|i| vec![Some(f64::from(i))]).collect());
        let targets: Vec<f64> = (0..8).map(|i| f64::from(i * i)).collect();
        let (grad, hess) = gradients(&targets);
        let binned = BinnedMatrix::build(&matrix, 256);
        let tree = TreeBuilder::new(&matrix, &binned, &grad, &hess, params(), &[0])
            .build((0..8).collect());

        let json = serde_json::to_string(&tree).unwrap();
        let restored: RegressionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.depth(), tree.depth());
        for row in matrix.rows() {
            assert!((restored.predict(row) - tree.predict(row)).abs() < 1e-9);
        }
    }
}
