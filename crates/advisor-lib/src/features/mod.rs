//! Feature engineering shared by training and inference

mod builder;
mod schema;

pub use builder::{build_features, build_features_batch, FeatureRow};
pub use schema::{
    ALL_FEATURES, CAT_FEATURES, NUM_CATEGORICAL, NUM_FEATURES, NUM_NUMERIC, REQUIRED_COLUMNS,
    TARGET_GOOD_INVESTMENT, TARGET_PRICE,
};
