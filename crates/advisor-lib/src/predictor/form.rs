//! Single-property investment form
//!
//! Validates the user's inputs, derives the price-per-sqft and projected
//! future price the models expect, and scores the property.

use super::output::InvestmentAssessment;
use super::Predictor;
use crate::error::{AdvisorError, Result};
use crate::features::build_features;
use crate::models::{FieldValue, PropertyRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inclusive bounds accepted by the form
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormLimits {
    pub bhk: (i64, i64),
    pub size_sqft: (f64, f64),
    pub age_years: (i64, i64),
    pub nearby: (i64, i64),
    pub asking_price_lakhs: (f64, f64),
    pub growth_pct: (f64, f64),
    pub horizon_years: (i64, i64),
}

pub const FORM_LIMITS: FormLimits = FormLimits {
    bhk: (1, 5),
    size_sqft: (300.0, 10_000.0),
    age_years: (0, 50),
    nearby: (0, 20),
    asking_price_lakhs: (10.0, 1000.0),
    growth_pct: (5.0, 12.0),
    horizon_years: (3, 10),
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    #[default]
    Apartment,
    #[serde(rename = "Independent House")]
    IndependentHouse,
    Villa,
}

impl PropertyType {
    pub const ALL: [PropertyType; 3] = [
        PropertyType::Apartment,
        PropertyType::IndependentHouse,
        PropertyType::Villa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "Apartment",
            PropertyType::IndependentHouse => "Independent House",
            PropertyType::Villa => "Villa",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "apartment" => Ok(PropertyType::Apartment),
            "independenthouse" | "house" => Ok(PropertyType::IndependentHouse),
            "villa" => Ok(PropertyType::Villa),
            _ => Err(format!(
                "unknown property type '{}', expected one of: Apartment, Independent House, Villa",
                s
            )),
        }
    }
}

/// Form input for evaluating one property. Counts are signed so that
/// out-of-range submissions reach `validate` instead of failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvestmentQuery {
    pub city: String,
    pub locality: String,
    pub property_type: PropertyType,
    pub bhk: i64,
    pub size_sqft: f64,
    pub age_years: i64,
    pub nearby_schools: i64,
    pub nearby_hospitals: i64,
    pub asking_price_lakhs: f64,
    /// Expected annual appreciation, in percent
    pub expected_growth_pct: f64,
    pub horizon_years: i64,
}

impl Default for InvestmentQuery {
    fn default() -> Self {
        Self {
            city: "Hyderabad".to_string(),
            locality: "Madhapur".to_string(),
            property_type: PropertyType::Apartment,
            bhk: 3,
            size_sqft: 1500.0,
            age_years: 10,
            nearby_schools: 5,
            nearby_hospitals: 3,
            asking_price_lakhs: 250.0,
            expected_growth_pct: 8.5,
            horizon_years: 5,
        }
    }
}

impl InvestmentQuery {
    /// Check every field, reporting all problems at once. A non-positive
    /// size is always the first problem listed.
    pub fn validate(&self) -> Result<()> {
        let limits = FORM_LIMITS;
        let mut problems = Vec::new();

        if !(self.size_sqft > 0.0) {
            problems.push(format!("size_sqft must be positive, got {}", self.size_sqft));
        } else if !in_range(self.size_sqft, limits.size_sqft) {
            problems.push(range_problem("size_sqft", self.size_sqft, limits.size_sqft));
        }

        if self.city.trim().is_empty() {
            problems.push("city must not be empty".to_string());
        }
        if self.locality.trim().is_empty() {
            problems.push("locality must not be empty".to_string());
        }
        if !in_range(self.bhk, limits.bhk) {
            problems.push(range_problem("bhk", self.bhk, limits.bhk));
        }
        if !in_range(self.age_years, limits.age_years) {
            problems.push(range_problem("age_years", self.age_years, limits.age_years));
        }
        if !in_range(self.nearby_schools, limits.nearby) {
            problems.push(range_problem(
                "nearby_schools",
                self.nearby_schools,
                limits.nearby,
            ));
        }
        if !in_range(self.nearby_hospitals, limits.nearby) {
            problems.push(range_problem(
                "nearby_hospitals",
                self.nearby_hospitals,
                limits.nearby,
            ));
        }
        if !in_range(self.asking_price_lakhs, limits.asking_price_lakhs) {
            problems.push(range_problem(
                "asking_price_lakhs",
                self.asking_price_lakhs,
                limits.asking_price_lakhs,
            ));
        }
        if !in_range(self.expected_growth_pct, limits.growth_pct) {
            problems.push(range_problem(
                "expected_growth_pct",
                self.expected_growth_pct,
                limits.growth_pct,
            ));
        }
        if !in_range(self.horizon_years, limits.horizon_years) {
            problems.push(range_problem(
                "horizon_years",
                self.horizon_years,
                limits.horizon_years,
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AdvisorError::InvalidInput(problems))
        }
    }

    /// Asking price converted to rupees per square foot
    pub fn price_per_sqft(&self) -> f64 {
        self.asking_price_lakhs * 100_000.0 / self.size_sqft
    }

    /// Growth as a fraction, e.g. 8.5% -> 0.085
    pub fn growth_rate(&self) -> f64 {
        self.expected_growth_pct / 100.0
    }

    /// Asking price compounded over the horizon, in lakhs
    pub fn future_price_lakhs(&self) -> f64 {
        self.asking_price_lakhs * (1.0 + self.growth_rate()).powi(self.horizon_years as i32)
    }

    /// Raw record in dataset column terms
    pub fn to_record(&self) -> PropertyRecord {
        PropertyRecord {
            city: FieldValue::text(self.city.trim()),
            locality: FieldValue::text(self.locality.trim()),
            property_type: FieldValue::text(self.property_type.as_str()),
            bhk: FieldValue::text(self.bhk.to_string()),
            size_in_sqft: self.size_sqft.into(),
            age_of_property: (self.age_years as f64).into(),
            nearby_schools: (self.nearby_schools as f64).into(),
            nearby_hospitals: (self.nearby_hospitals as f64).into(),
            calc_price_per_sqft: self.price_per_sqft().into(),
            annual_growth_rate: self.growth_rate().into(),
            future_price_5y: self.future_price_lakhs().into(),
        }
    }
}

fn in_range<T: PartialOrd>(value: T, (min, max): (T, T)) -> bool {
    value >= min && value <= max
}

fn range_problem<T: fmt::Display>(field: &str, value: T, (min, max): (T, T)) -> String {
    format!(
        "{} must be between {} and {}, got {}",
        field, min, max, value
    )
}

/// Validate, derive, and score one form submission
pub fn evaluate_investment(
    predictor: &dyn Predictor,
    query: &InvestmentQuery,
) -> Result<InvestmentAssessment> {
    query.validate()?;
    let features = build_features(&query.to_record());
    let prediction = predictor.score(&features)?;
    Ok(InvestmentAssessment::new(query, features, prediction))
}
