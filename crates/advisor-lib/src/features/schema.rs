//! Column schema expected by both pipelines

/// Number of numeric model inputs
pub const NUM_NUMERIC: usize = 7;

/// Number of categorical model inputs
pub const NUM_CATEGORICAL: usize = 4;

pub const NUM_FEATURES: [&str; NUM_NUMERIC] = [
    "Size_in_SqFt",
    "Age_of_Property",
    "Nearby_Schools",
    "Nearby_Hospitals",
    "calc_price_per_sqft",
    "Annual_Growth_Rate",
    "Future_Price_5Y",
];

pub const CAT_FEATURES: [&str; NUM_CATEGORICAL] = ["City", "Locality", "Property_Type", "BHK"];

/// Model inputs in the order the pipelines consume them
pub const ALL_FEATURES: [&str; NUM_NUMERIC + NUM_CATEGORICAL] = [
    "Size_in_SqFt",
    "Age_of_Property",
    "Nearby_Schools",
    "Nearby_Hospitals",
    "calc_price_per_sqft",
    "Annual_Growth_Rate",
    "Future_Price_5Y",
    "City",
    "Locality",
    "Property_Type",
    "BHK",
];

pub const TARGET_GOOD_INVESTMENT: &str = "Good_Investment";

pub const TARGET_PRICE: &str = "Price_in_Lakhs";

/// Columns a historical dataset must carry
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "City",
    "Locality",
    "Property_Type",
    "BHK",
    "Size_in_SqFt",
    "Age_of_Property",
    "Nearby_Schools",
    "Nearby_Hospitals",
    "Price_in_Lakhs",
    "calc_price_per_sqft",
    "Annual_Growth_Rate",
    "Future_Price_5Y",
    "Good_Investment",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_features_is_numeric_then_categorical() {
        assert_eq!(&ALL_FEATURES[..NUM_NUMERIC], &NUM_FEATURES[..]);
        assert_eq!(&ALL_FEATURES[NUM_NUMERIC..], &CAT_FEATURES[..]);
    }

    #[test]
    fn test_required_columns_cover_features_and_targets() {
        for column in ALL_FEATURES {
            assert!(REQUIRED_COLUMNS.contains(&column), "{} missing", column);
        }
        assert!(REQUIRED_COLUMNS.contains(&TARGET_PRICE));
        assert!(REQUIRED_COLUMNS.contains(&TARGET_GOOD_INVESTMENT));
    }
}
