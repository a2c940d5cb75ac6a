//! Gradient-boosted tree ensembles

use super::binning::BinnedMatrix;
use super::matrix::{FeatureMatrix, SparseRow};
use super::tree::{RegressionTree, TreeBuilder, TreeParams};
use super::DECISION_THRESHOLD;
use crate::error::{AdvisorError, Result};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Probability clamp used when computing the logistic base margin
const PROB_EPSILON: f64 = 1e-6;

/// Floor for logistic hessians
const MIN_HESSIAN: f64 = 1e-16;

/// Hyperparameters shared by both ensembles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub reg_lambda: f64,
    pub gamma: f64,
    pub min_child_weight: f64,
    pub max_bins: usize,
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 5,
            learning_rate: 0.1,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            max_bins: 256,
            seed: 42,
        }
    }
}

impl BoostingParams {
    /// Settings used for the investment classifier
    pub fn classifier() -> Self {
        Self {
            n_estimators: 200,
            ..Self::default()
        }
    }

    /// Settings used for the price regressor
    pub fn regressor() -> Self {
        Self {
            n_estimators: 300,
            ..Self::default()
        }
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            learning_rate: self.learning_rate,
            reg_lambda: self.reg_lambda,
            gamma: self.gamma,
            min_child_weight: self.min_child_weight,
        }
    }

    fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.n_estimators == 0 {
            problems.push("n_estimators must be positive".to_string());
        }
        if !(self.learning_rate > 0.0) {
            problems.push("learning_rate must be positive".to_string());
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            problems.push("subsample must be in (0, 1]".to_string());
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            problems.push("colsample_bytree must be in (0, 1]".to_string());
        }
        if !(self.reg_lambda >= 0.0) {
            problems.push("reg_lambda must be non-negative".to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(AdvisorError::InvalidInput(problems))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    SquaredError,
    Logistic,
}

impl Objective {
    fn base_margin(self, targets: &[f64]) -> f64 {
        let mean = targets.iter().sum::<f64>() / targets.len() as f64;
        match self {
            Objective::SquaredError => mean,
            Objective::Logistic => {
                let p = mean.clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
                (p / (1.0 - p)).ln()
            }
        }
    }

    fn gradient(self, target: f64, margin: f64) -> (f64, f64) {
        match self {
            Objective::SquaredError => (margin - target, 1.0),
            Objective::Logistic => {
                let p = sigmoid(margin);
                (p - target, (p * (1.0 - p)).max(MIN_HESSIAN))
            }
        }
    }

    fn loss(self, target: f64, margin: f64) -> f64 {
        match self {
            Objective::SquaredError => (margin - target).powi(2),
            Objective::Logistic => {
                let p = sigmoid(margin).clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
                -(target * p.ln() + (1.0 - target) * (1.0 - p).ln())
            }
        }
    }
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Additive tree ensemble over a fixed column layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
    objective: Objective,
    base_margin: f64,
    n_columns: usize,
    trees: Vec<RegressionTree>,
}

impl Ensemble {
    fn fit(
        matrix: &FeatureMatrix,
        targets: &[f64],
        objective: Objective,
        params: &BoostingParams,
    ) -> Result<Self> {
        params.validate()?;
        if matrix.is_empty() {
            return Err(AdvisorError::EmptyDataset(
                "cannot fit an ensemble on zero rows".to_string(),
            ));
        }
        if matrix.n_rows() != targets.len() {
            return Err(AdvisorError::InvalidInput(vec![format!(
                "{} rows but {} targets",
                matrix.n_rows(),
                targets.len()
            )]));
        }

        let start = Instant::now();
        let n = matrix.n_rows();
        let n_columns = matrix.n_columns();
        let binned = BinnedMatrix::build(matrix, params.max_bins);
        let tree_params = params.tree_params();
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);

        let base_margin = objective.base_margin(targets);
        let mut margins = vec![base_margin; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        info!(
            objective = ?objective,
            rows = n,
            columns = n_columns,
            n_estimators = params.n_estimators,
            "Fitting gradient-boosted ensemble"
        );

        for round in 0..params.n_estimators {
            for i in 0..n {
                let (g, h) = objective.gradient(targets[i], margins[i]);
                grad[i] = g;
                hess[i] = h;
            }

            let rows = sample_rows(n, params.subsample, &mut rng);
            let columns = sample_columns(n_columns, params.colsample_bytree, &mut rng);

            let tree = TreeBuilder::new(matrix, &binned, &grad, &hess, tree_params, &columns)
                .build(rows);
            for (margin, row) in margins.iter_mut().zip(matrix.rows()) {
                *margin += tree.predict(row);
            }
            trees.push(tree);

            if (round + 1) % 50 == 0 {
                let loss = mean_loss(objective, targets, &margins);
                debug!(round = round + 1, train_loss = loss, "Boosting progress");
            }
        }

        info!(
            trees = trees.len(),
            train_loss = mean_loss(objective, targets, &margins),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Ensemble fitted"
        );

        Ok(Self {
            objective,
            base_margin,
            n_columns,
            trees,
        })
    }

    fn predict_margin(&self, row: &SparseRow) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_columns(&self) -> usize {
        self.n_columns
    }
}

fn sample_rows(n: usize, fraction: f64, rng: &mut ChaCha8Rng) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n).collect();
    }
    let rows: Vec<usize> = (0..n).filter(|_| rng.gen::<f64>() < fraction).collect();
    if rows.is_empty() {
        (0..n).collect()
    } else {
        rows
    }
}

fn sample_columns(n: usize, fraction: f64, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut columns: Vec<usize> = (0..n).collect();
    if fraction >= 1.0 {
        return columns;
    }
    let keep = ((n as f64) * fraction).round().max(1.0) as usize;
    columns.shuffle(rng);
    columns.truncate(keep);
    columns.sort_unstable();
    columns
}

fn mean_loss(objective: Objective, targets: &[f64], margins: &[f64]) -> f64 {
    let total: f64 = targets
        .iter()
        .zip(margins)
        .map(|(&y, &m)| objective.loss(y, m))
        .sum();
    total / targets.len() as f64
}

/// Squared-error regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    params: BoostingParams,
    ensemble: Ensemble,
}

impl GradientBoostedRegressor {
    pub fn fit(matrix: &FeatureMatrix, targets: &[f64], params: &BoostingParams) -> Result<Self> {
        if targets.iter().any(|t| !t.is_finite()) {
            return Err(AdvisorError::InvalidInput(vec![
                "regression targets must be finite".to_string(),
            ]));
        }
        let ensemble = Ensemble::fit(matrix, targets, Objective::SquaredError, params)?;
        Ok(Self {
            params: params.clone(),
            ensemble,
        })
    }

    pub fn predict(&self, row: &SparseRow) -> f64 {
        self.ensemble.predict_margin(row)
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }
}

/// Binary logistic classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    params: BoostingParams,
    ensemble: Ensemble,
}

impl GradientBoostedClassifier {
    pub fn fit(matrix: &FeatureMatrix, labels: &[u8], params: &BoostingParams) -> Result<Self> {
        if labels.iter().any(|&l| l > 1) {
            return Err(AdvisorError::InvalidInput(vec![
                "class labels must be 0 or 1".to_string(),
            ]));
        }
        let targets: Vec<f64> = labels.iter().map(|&l| f64::from(l)).collect();
        let ensemble = Ensemble::fit(matrix, &targets, Objective::Logistic, params)?;
        Ok(Self {
            params: params.clone(),
            ensemble,
        })
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, row: &SparseRow) -> f64 {
        sigmoid(self.ensemble.predict_margin(row))
    }

    /// Class label from [`DECISION_THRESHOLD`]
    pub fn predict(&self, row: &SparseRow) -> u8 {
        label_for(self.predict_proba(row))
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn ensemble(&self) -> &Ensemble {
        &self.ensemble
    }
}

/// Map a probability to a class label; exactly 0.5 is negative
pub fn label_for(probability: f64) -> u8 {
    u8::from(probability > DECISION_THRESHOLD)
}
