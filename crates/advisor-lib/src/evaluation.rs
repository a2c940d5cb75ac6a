//! Held-out evaluation metrics

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub f1_score: f64,
    /// `None` when the evaluation set holds a single class
    pub roc_auc: Option<f64>,
}

impl ClassificationMetrics {
    pub fn compute(y_true: &[u8], probabilities: &[f64], y_pred: &[u8]) -> Self {
        Self {
            accuracy: accuracy(y_true, y_pred),
            f1_score: f1_score(y_true, y_pred),
            roc_auc: roc_auc(y_true, probabilities),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Self {
        let mse = mean_squared_error(y_true, y_pred);
        Self {
            mse,
            rmse: mse.sqrt(),
            mae: mean_absolute_error(y_true, y_pred),
            r2: r2_score(y_true, y_pred),
        }
    }
}

/// Metrics of either task, as stored in artifact headers and run records
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMetrics {
    Classification(ClassificationMetrics),
    Regression(RegressionMetrics),
}

impl EvaluationMetrics {
    /// Flat `(name, value)` pairs; metrics that are undefined are omitted
    pub fn pairs(&self) -> Vec<(&'static str, f64)> {
        match self {
            EvaluationMetrics::Classification(m) => {
                let mut pairs = vec![("accuracy", m.accuracy), ("f1_score", m.f1_score)];
                if let Some(auc) = m.roc_auc {
                    pairs.push(("roc_auc", auc));
                }
                pairs
            }
            EvaluationMetrics::Regression(m) => vec![
                ("mse", m.mse),
                ("rmse", m.rmse),
                ("mae", m.mae),
                ("r2", m.r2),
            ],
        }
    }
}

pub fn accuracy(y_true: &[u8], y_pred: &[u8]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    correct as f64 / y_true.len() as f64
}

/// F1 of the positive class; 0.0 when there are no positives at all
pub fn f1_score(y_true: &[u8], y_pred: &[u8]) -> f64 {
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t, p) {
            (1, 1) => tp += 1,
            (0, 1) => fp += 1,
            (1, 0) => fn_ += 1,
            _ => {}
        }
    }
    let denominator = 2 * tp + fp + fn_;
    if denominator == 0 {
        0.0
    } else {
        (2 * tp) as f64 / denominator as f64
    }
}

/// Area under the ROC curve via the rank-sum statistic, ties averaged
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; tied run i..=j shares the average
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&y, _)| y == 1)
        .map(|(_, r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mean(
        y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)),
        y_true.len(),
    )
}

pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mean(
        y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()),
        y_true.len(),
    )
}

/// Coefficient of determination. A constant target scores 1.0 when predicted
/// exactly and 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let y_mean = mean(y_true.iter().copied(), y_true.len());
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - y_mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}
