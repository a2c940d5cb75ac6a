//! Property scoring: the lazily loaded inference service and the
//! investment form built on top of it

mod form;
mod inference;
mod output;

pub use form::{evaluate_investment, InvestmentQuery, PropertyType, FORM_LIMITS, FormLimits};
pub use inference::{InferenceService, InferenceStats, LoadedPipeline, ModelSummary};
pub use output::{verdict_text, InvestmentAssessment, Valuation};

use crate::error::Result;
use crate::models::{PredictionResult, PropertyRecord};

/// Anything that can score a single property
pub trait Predictor: Send + Sync {
    /// Score a raw record; the feature builder is applied internally
    fn score(&self, record: &PropertyRecord) -> Result<PredictionResult>;
}
