//! Shared fixtures for unit tests

use crate::boosting::BoostingParams;
use crate::dataset::{HousingDataset, Listing};
use crate::models::{FieldValue, PropertyRecord};
use crate::tracking::NoopTracker;
use crate::training::{Trainer, TrainingConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;

const CITIES: [(&str, f64); 4] = [
    ("Hyderabad", 7000.0),
    ("Pune", 8000.0),
    ("Mumbai", 15000.0),
    ("Delhi", 11000.0),
];

const TYPES: [&str; 3] = ["Apartment", "Independent House", "Villa"];

/// The reference property used across scoring tests
pub fn sample_record() -> PropertyRecord {
    PropertyRecord {
        city: "Hyderabad".into(),
        locality: "Test Locality".into(),
        property_type: "Apartment".into(),
        bhk: "3".into(),
        size_in_sqft: FieldValue::Number(1500.0),
        age_of_property: FieldValue::Number(10.0),
        nearby_schools: FieldValue::Number(5.0),
        nearby_hospitals: FieldValue::Number(3.0),
        calc_price_per_sqft: FieldValue::Number(12000.0),
        annual_growth_rate: FieldValue::Number(0.09),
        future_price_5y: FieldValue::Number(400.0),
    }
}

/// Deterministic listings where the label depends on growth and age, and
/// the price on size, city and age
pub fn synthetic_dataset(n: usize) -> HousingDataset {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let listings = (0..n)
        .map(|i| {
            let (city, rate) = CITIES[i % CITIES.len()];
            let size: f64 = rng.gen_range(500.0..3000.0);
            let age: f64 = f64::from(rng.gen_range(0u32..30));
            let growth: f64 = rng.gen_range(0.05..0.12);
            let price = size * rate * (1.0 - age * 0.005) / 100_000.0;
            let good = u8::from(growth >= 0.08 && age < 20.0);

            let record = PropertyRecord {
                city: city.into(),
                locality: format!("{} Locality {}", city, i % 5).into(),
                property_type: TYPES[i % TYPES.len()].into(),
                bhk: FieldValue::Number(f64::from(rng.gen_range(1u32..=5))),
                size_in_sqft: size.into(),
                age_of_property: age.into(),
                nearby_schools: f64::from(rng.gen_range(0u32..10)).into(),
                nearby_hospitals: f64::from(rng.gen_range(0u32..6)).into(),
                calc_price_per_sqft: (price * 100_000.0 / size).into(),
                annual_growth_rate: growth.into(),
                future_price_5y: (price * (1.0 + growth).powi(5)).into(),
            };
            Listing::new(&record, Some(price), Some(good))
        })
        .collect();
    HousingDataset::from_listings(listings)
}

/// Small ensembles so tests stay fast
pub fn fast_config(models_dir: &Path) -> TrainingConfig {
    let small = |n_estimators| BoostingParams {
        n_estimators,
        max_depth: 4,
        learning_rate: 0.3,
        ..BoostingParams::default()
    };
    TrainingConfig {
        models_dir: models_dir.to_path_buf(),
        classifier_params: small(20),
        regressor_params: small(30),
        ..TrainingConfig::default()
    }
}

/// Train and persist both pipelines into `models_dir`
pub fn train_fixture_models(models_dir: &Path) {
    let config = fast_config(models_dir);
    let dataset = synthetic_dataset(200);
    let trainer = Trainer::new(&config, &NoopTracker);
    trainer.train_classifier(&dataset).unwrap();
    trainer.train_regressor(&dataset).unwrap();
}
