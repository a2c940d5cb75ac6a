//! Historical housing dataset
//!
//! Loads the processed CSV, checks the required columns, and runs every row
//! through the feature builder on the way in.

use crate::cache::LazyLoad;
use crate::error::{AdvisorError, Result};
use crate::features::{build_features, REQUIRED_COLUMNS, TARGET_GOOD_INVESTMENT, TARGET_PRICE};
use crate::models::{FieldValue, PropertyRecord};
use csv::ReaderBuilder;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Default location of the processed dataset
pub const DEFAULT_DATA_PATH: &str = "data/processed/india_housing_with_targets.csv";

/// One historical listing: normalized features plus both targets
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub record: PropertyRecord,
    pub price_in_lakhs: Option<f64>,
    pub good_investment: Option<u8>,
}

impl Listing {
    pub fn new(
        record: &PropertyRecord,
        price_in_lakhs: Option<f64>,
        good_investment: Option<u8>,
    ) -> Self {
        Self {
            record: build_features(record),
            price_in_lakhs,
            good_investment,
        }
    }
}

/// In-memory housing dataset
#[derive(Debug, Clone, Default)]
pub struct HousingDataset {
    listings: Vec<Listing>,
    source: Option<PathBuf>,
}

impl HousingDataset {
    pub fn from_listings(listings: Vec<Listing>) -> Self {
        Self {
            listings,
            source: None,
        }
    }

    /// Load from a CSV file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AdvisorError::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path).map_err(|e| AdvisorError::io(path, e))?;
        let mut dataset = Self::from_reader(file)?;
        dataset.source = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            rows = dataset.len(),
            "Loaded housing dataset"
        );
        Ok(dataset)
    }

    /// Parse CSV content with a header row
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader.headers()?.clone();

        let columns: BTreeMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim(), i))
            .collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !columns.contains_key(*c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AdvisorError::MissingColumns { columns: missing });
        }

        let price_idx = columns[TARGET_PRICE];
        let label_idx = columns[TARGET_GOOD_INVESTMENT];

        let mut listings = Vec::new();
        for row in reader.records() {
            let row = row?;
            let cell = |idx: usize| FieldValue::from_cell(row.get(idx).unwrap_or(""));

            let mut record = PropertyRecord::default();
            for column in REQUIRED_COLUMNS {
                if let Some(value) = record.field_mut(column) {
                    *value = cell(columns[column]);
                }
            }

            let price = cell(price_idx).as_number();
            let label = parse_label(&cell(label_idx));
            listings.push(Listing::new(&record, price, label));
        }

        debug!(rows = listings.len(), "Parsed dataset rows");

        Ok(Self {
            listings,
            source: None,
        })
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Path the dataset was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Dataset read from `path` on first use and shared afterwards
#[derive(Debug)]
pub struct CachedDataset {
    path: PathBuf,
    cache: LazyLoad<HousingDataset>,
}

impl CachedDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: LazyLoad::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Result<Arc<HousingDataset>> {
        self.cache.get_or_try_load(|| HousingDataset::load(&self.path))
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.is_loaded()
    }
}

/// Read a 0/1 label; anything else is treated as missing
fn parse_label(value: &FieldValue) -> Option<u8> {
    match value.as_number()? {
        v if v == 0.0 => Some(0),
        v if v == 1.0 => Some(1),
        _ => None,
    }
}

/// Train/test index split
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded RNG and hold out `ceil(n * test_size)` rows
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> Split {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let test_len = ((n as f64) * test_size).ceil() as usize;
    let test_len = test_len.min(n);
    let train = indices.split_off(test_len);

    Split {
        train,
        test: indices,
    }
}

/// Split preserving the class balance of `labels` in both halves
pub fn stratified_split(labels: &[u8], test_size: f64, seed: u64) -> Split {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for (_, mut indices) in by_class {
        indices.shuffle(&mut rng);
        let test_len = ((indices.len() as f64) * test_size).round() as usize;
        let rest = indices.split_off(test_len.min(indices.len()));
        test.extend(indices);
        train.extend(rest);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Split { train, test }
}
