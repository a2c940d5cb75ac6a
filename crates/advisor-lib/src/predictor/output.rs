//! Assessment returned to the form user

use super::form::InvestmentQuery;
use crate::models::{PredictionResult, PropertyRecord};
use serde::{Deserialize, Serialize};

/// Predicted market price relative to the asking price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Valuation {
    Undervalued,
    Overvalued,
    FairlyPriced,
}

impl Valuation {
    /// `delta` is predicted minus asking, in lakhs
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Valuation::Undervalued
        } else if delta < 0.0 {
            Valuation::Overvalued
        } else {
            Valuation::FairlyPriced
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Valuation::Undervalued => {
                "Predicted market price is higher than the asking price: potentially under-valued"
            }
            Valuation::Overvalued => {
                "Predicted market price is lower than the asking price: potentially over-valued"
            }
            Valuation::FairlyPriced => "Asking price matches the predicted market price",
        }
    }
}

/// Human verdict for a classifier label
pub fn verdict_text(label: u8) -> &'static str {
    if label == 1 {
        "Good investment"
    } else {
        "Not a good investment"
    }
}

/// Everything the form reports back for one property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentAssessment {
    pub query: InvestmentQuery,
    /// Feature-built record the models were scored on
    pub features: PropertyRecord,
    pub prediction: PredictionResult,
    pub price_per_sqft: f64,
    pub future_price_lakhs: f64,
    pub valuation_delta_lakhs: f64,
    pub valuation: Valuation,
    pub verdict: String,
}

impl InvestmentAssessment {
    pub fn new(
        query: &InvestmentQuery,
        features: PropertyRecord,
        prediction: PredictionResult,
    ) -> Self {
        let delta = prediction.predicted_price_lakhs - query.asking_price_lakhs;
        Self {
            query: query.clone(),
            features,
            price_per_sqft: query.price_per_sqft(),
            future_price_lakhs: query.future_price_lakhs(),
            valuation_delta_lakhs: delta,
            valuation: Valuation::from_delta(delta),
            verdict: verdict_text(prediction.good_investment_label).to_string(),
            prediction,
        }
    }
}
