//! Core data models for the property advisor

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Text used for a categorical value that was missing in the input
pub const MISSING_CATEGORY: &str = "nan";

/// A loosely typed cell, as read from a CSV row or a JSON request body
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Interpret a raw CSV cell; empty cells are missing
    pub fn from_cell(cell: &str) -> Self {
        if cell.trim().is_empty() {
            FieldValue::Missing
        } else {
            FieldValue::Text(cell.to_string())
        }
    }

    /// Coerce to a finite float, or `None` when the value cannot be read as one
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            FieldValue::Number(v) => *v,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
            FieldValue::Missing => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Render as category text; integral numbers drop the fractional part
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(v) if !v.is_finite() => MISSING_CATEGORY.to_string(),
            FieldValue::Number(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                format!("{}", *v as i64)
            }
            FieldValue::Number(v) => v.to_string(),
            FieldValue::Missing => MISSING_CATEGORY.to_string(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

/// Strings stay text and finite numbers stay numbers. Anything else in a
/// JSON body (null, booleans, arrays, objects) reads as missing.
impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => FieldValue::Text(s),
            Value::Number(n) => n
                .as_f64()
                .filter(|v| v.is_finite())
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Missing),
            Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                FieldValue::Missing
            }
        })
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map(FieldValue::Number).unwrap_or(FieldValue::Missing)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// One property, historical or user-submitted. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    #[serde(rename = "City", default)]
    pub city: FieldValue,
    #[serde(rename = "Locality", default)]
    pub locality: FieldValue,
    #[serde(rename = "Property_Type", default)]
    pub property_type: FieldValue,
    #[serde(rename = "BHK", default)]
    pub bhk: FieldValue,
    #[serde(rename = "Size_in_SqFt", default)]
    pub size_in_sqft: FieldValue,
    #[serde(rename = "Age_of_Property", default)]
    pub age_of_property: FieldValue,
    #[serde(rename = "Nearby_Schools", default)]
    pub nearby_schools: FieldValue,
    #[serde(rename = "Nearby_Hospitals", default)]
    pub nearby_hospitals: FieldValue,
    #[serde(rename = "calc_price_per_sqft", default)]
    pub calc_price_per_sqft: FieldValue,
    #[serde(rename = "Annual_Growth_Rate", default)]
    pub annual_growth_rate: FieldValue,
    #[serde(rename = "Future_Price_5Y", default)]
    pub future_price_5y: FieldValue,
}

impl PropertyRecord {
    /// Look up a field by its dataset column name
    pub fn field(&self, column: &str) -> Option<&FieldValue> {
        Some(match column {
            "City" => &self.city,
            "Locality" => &self.locality,
            "Property_Type" => &self.property_type,
            "BHK" => &self.bhk,
            "Size_in_SqFt" => &self.size_in_sqft,
            "Age_of_Property" => &self.age_of_property,
            "Nearby_Schools" => &self.nearby_schools,
            "Nearby_Hospitals" => &self.nearby_hospitals,
            "calc_price_per_sqft" => &self.calc_price_per_sqft,
            "Annual_Growth_Rate" => &self.annual_growth_rate,
            "Future_Price_5Y" => &self.future_price_5y,
            _ => return None,
        })
    }

    /// Mutable lookup by dataset column name
    pub fn field_mut(&mut self, column: &str) -> Option<&mut FieldValue> {
        Some(match column {
            "City" => &mut self.city,
            "Locality" => &mut self.locality,
            "Property_Type" => &mut self.property_type,
            "BHK" => &mut self.bhk,
            "Size_in_SqFt" => &mut self.size_in_sqft,
            "Age_of_Property" => &mut self.age_of_property,
            "Nearby_Schools" => &mut self.nearby_schools,
            "Nearby_Hospitals" => &mut self.nearby_hospitals,
            "calc_price_per_sqft" => &mut self.calc_price_per_sqft,
            "Annual_Growth_Rate" => &mut self.annual_growth_rate,
            "Future_Price_5Y" => &mut self.future_price_5y,
            _ => return None,
        })
    }
}

/// Output of scoring a single property
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub good_investment_label: u8,
    pub good_investment_prob: f64,
    pub predicted_price_lakhs: f64,
}

/// JSON error body returned by the HTTP API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}
