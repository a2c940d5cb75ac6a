//! Histogram-based gradient boosting
//!
//! Regression and binary classification ensembles of depth-limited trees,
//! fitted with second-order gradients, row/column subsampling and L2 leaf
//! regularization.

mod binning;
mod gbm;
mod matrix;
mod tree;

pub use gbm::{
    label_for, BoostingParams, Ensemble, GradientBoostedClassifier, GradientBoostedRegressor,
    Objective,
};
pub use matrix::{FeatureMatrix, SparseRow};
pub use tree::{Node, RegressionTree};

/// Probability above which a property is labelled a good investment
pub const DECISION_THRESHOLD: f64 = 0.5;
