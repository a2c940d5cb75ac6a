//! Market insights over the historical dataset
//!
//! Filters listings and computes the KPI figures and chart series the
//! dashboard shows. Charts are returned as data; nothing is rendered here.

use crate::dataset::{HousingDataset, Listing};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const PRICE_HISTOGRAM_BINS: usize = 50;
pub const AGE_HISTOGRAM_BINS: usize = 30;
pub const TOP_CITIES: usize = 15;

/// Value that means "no filter" for the categorical filters
const ALL: &str = "All";

/// Dashboard filters. Absent fields do not filter; ranges are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightFilter {
    pub city: Option<String>,
    pub property_type: Option<String>,
    pub bhk: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_size: Option<f64>,
    pub max_size: Option<f64>,
    pub min_age: Option<f64>,
    pub max_age: Option<f64>,
    pub good_only: bool,
}

impl InsightFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        let record = &listing.record;
        let size = record.size_in_sqft.as_number();
        let age = record.age_of_property.as_number();
        category_matches(&self.city, &record.city.as_text())
            && category_matches(&self.property_type, &record.property_type.as_text())
            && category_matches(&self.bhk, &record.bhk.as_text())
            && range_matches(listing.price_in_lakhs, self.min_price, self.max_price)
            && range_matches(size, self.min_size, self.max_size)
            && range_matches(age, self.min_age, self.max_age)
            && (!self.good_only || listing.good_investment == Some(1))
    }

    pub fn apply<'a>(&self, dataset: &'a HousingDataset) -> Vec<&'a Listing> {
        dataset.listings().iter().filter(|l| self.matches(l)).collect()
    }
}

fn category_matches(filter: &Option<String>, value: &str) -> bool {
    match filter.as_deref().map(str::trim) {
        None | Some("") | Some(ALL) => true,
        Some(wanted) => wanted == value,
    }
}

/// A listing without the value is excluded only when a bound is set
fn range_matches(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    match value {
        Some(v) => min.map_or(true, |m| v >= m) && max.map_or(true, |m| v <= m),
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketKpis {
    pub avg_price_lakhs: f64,
    pub avg_price_per_sqft: f64,
    pub good_investment_rate_pct: f64,
    pub listings: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width histogram; the last bin includes its upper edge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    pub fn compute(values: &[f64], n_bins: usize) -> Self {
        if values.is_empty() || n_bins == 0 {
            return Self::default();
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if max == min {
            return Self {
                bins: vec![HistogramBin {
                    start: min,
                    end: max,
                    count: values.len(),
                }],
            };
        }

        let width = (max - min) / n_bins as f64;
        let mut counts = vec![0usize; n_bins];
        for &v in values {
            let idx = (((v - min) / width) as usize).min(n_bins - 1);
            counts[idx] += 1;
        }

        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                start: min + width * i as f64,
                end: if i + 1 == n_bins {
                    max
                } else {
                    min + width * (i + 1) as f64
                },
                count,
            })
            .collect();
        Self { bins }
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupValue {
    pub group: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCount {
    pub group: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub filter: InsightFilter,
    pub kpis: MarketKpis,
    pub price_histogram: Histogram,
    pub age_histogram: Histogram,
    pub price_per_sqft_by_city: Vec<GroupValue>,
    pub property_type_share: Vec<GroupCount>,
    pub good_rate_by_type: Vec<GroupValue>,
    pub good_rate_by_city: Vec<GroupValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

/// Values available to the dashboard filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub cities: Vec<String>,
    pub property_types: Vec<String>,
    pub bhks: Vec<String>,
    pub price_range: Option<NumericRange>,
    pub size_range: Option<NumericRange>,
    pub age_range: Option<NumericRange>,
}

impl FilterOptions {
    pub fn from_dataset(dataset: &HousingDataset) -> Self {
        let distinct = |f: fn(&Listing) -> String| -> Vec<String> {
            dataset
                .listings()
                .iter()
                .map(f)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };
        let range = |f: fn(&Listing) -> Option<f64>| -> Option<NumericRange> {
            dataset.listings().iter().filter_map(f).fold(None, |acc, v| {
                Some(match acc {
                    None => NumericRange { min: v, max: v },
                    Some(r) => NumericRange {
                        min: r.min.min(v),
                        max: r.max.max(v),
                    },
                })
            })
        };

        Self {
            cities: distinct(|l| l.record.city.as_text()),
            property_types: distinct(|l| l.record.property_type.as_text()),
            bhks: sort_bhks(distinct(|l| l.record.bhk.as_text())),
            price_range: range(|l| l.price_in_lakhs),
            size_range: range(|l| l.record.size_in_sqft.as_number()),
            age_range: range(|l| l.record.age_of_property.as_number()),
        }
    }
}

/// Numeric BHK labels in numeric order, anything else after them
fn sort_bhks(mut bhks: Vec<String>) -> Vec<String> {
    bhks.sort_by(|a, b| match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
    bhks
}

/// Compute the full dashboard over the listings matching `filter`
pub fn compute_insights(dataset: &HousingDataset, filter: &InsightFilter) -> InsightReport {
    let listings = filter.apply(dataset);

    let prices: Vec<f64> = listings.iter().filter_map(|l| l.price_in_lakhs).collect();
    let ages: Vec<f64> = listings
        .iter()
        .filter_map(|l| l.record.age_of_property.as_number())
        .collect();
    let price_per_sqft: Vec<f64> = listings
        .iter()
        .filter_map(|l| l.record.calc_price_per_sqft.as_number())
        .collect();
    let labels: Vec<f64> = listings
        .iter()
        .filter_map(|l| l.good_investment.map(f64::from))
        .collect();

    let kpis = MarketKpis {
        avg_price_lakhs: mean(&prices),
        avg_price_per_sqft: mean(&price_per_sqft),
        good_investment_rate_pct: mean(&labels) * 100.0,
        listings: listings.len(),
    };

    let city = |l: &Listing| l.record.city.as_text();
    let property_type = |l: &Listing| l.record.property_type.as_text();
    let ppsf = |l: &Listing| l.record.calc_price_per_sqft.as_number();
    let good_pct = |l: &Listing| l.good_investment.map(|g| f64::from(g) * 100.0);

    InsightReport {
        filter: filter.clone(),
        kpis,
        price_histogram: Histogram::compute(&prices, PRICE_HISTOGRAM_BINS),
        age_histogram: Histogram::compute(&ages, AGE_HISTOGRAM_BINS),
        price_per_sqft_by_city: top_n(group_mean(&listings, city, ppsf), TOP_CITIES),
        property_type_share: group_count(&listings, property_type),
        good_rate_by_type: group_mean(&listings, property_type, good_pct),
        good_rate_by_city: top_n(group_mean(&listings, city, good_pct), TOP_CITIES),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Mean of `value` per group, skipping missing values, ordered by group name
pub fn group_mean(
    listings: &[&Listing],
    key: impl Fn(&Listing) -> String,
    value: impl Fn(&Listing) -> Option<f64>,
) -> Vec<GroupValue> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for &listing in listings {
        if let Some(v) = value(listing) {
            let entry = sums.entry(key(listing)).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(group, (sum, count))| GroupValue {
            group,
            value: sum / count as f64,
        })
        .collect()
}

pub fn group_count(listings: &[&Listing], key: impl Fn(&Listing) -> String) -> Vec<GroupCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for &listing in listings {
        *counts.entry(key(listing)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(group, count)| GroupCount { group, count })
        .collect()
}

/// Sort descending by value (ties by name) and keep the first `n`
pub fn top_n(mut groups: Vec<GroupValue>, n: usize) -> Vec<GroupValue> {
    groups.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.group.cmp(&b.group)));
    groups.truncate(n);
    groups
}
