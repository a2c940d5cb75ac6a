//! Feature builder
//!
//! Normalizes a raw property record into the representation the pipelines
//! were fitted on: numeric columns become finite floats or missing, and
//! categorical columns (BHK included) become text. Training and inference
//! both go through here so one-hot encodings line up.

use super::schema::{CAT_FEATURES, NUM_CATEGORICAL, NUM_FEATURES, NUM_NUMERIC};
use crate::models::{FieldValue, PropertyRecord};
use serde::Serialize;

/// Return a normalized copy of `record`. Never fails; unreadable numbers
/// become [`FieldValue::Missing`].
pub fn build_features(record: &PropertyRecord) -> PropertyRecord {
    let mut out = record.clone();

    for column in NUM_FEATURES {
        if let Some(value) = out.field_mut(column) {
            *value = value.as_number().into();
        }
    }

    for column in CAT_FEATURES {
        if let Some(value) = out.field_mut(column) {
            *value = FieldValue::Text(value.as_text());
        }
    }

    out
}

/// Batch form of [`build_features`]
pub fn build_features_batch(records: &[PropertyRecord]) -> Vec<PropertyRecord> {
    records.iter().map(build_features).collect()
}

/// The eleven model inputs in schema order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub numeric: [Option<f64>; NUM_NUMERIC],
    pub categorical: [String; NUM_CATEGORICAL],
}

impl FeatureRow {
    /// Build features for `record` and select the schema columns
    pub fn from_record(record: &PropertyRecord) -> Self {
        let built = build_features(record);
        Self::project(&built)
    }

    fn project(built: &PropertyRecord) -> Self {
        let numeric =
            NUM_FEATURES.map(|column| built.field(column).and_then(FieldValue::as_number));
        let categorical = CAT_FEATURES.map(|column| {
            built
                .field(column)
                .map(FieldValue::as_text)
                .unwrap_or_default()
        });
        Self {
            numeric,
            categorical,
        }
    }
}
