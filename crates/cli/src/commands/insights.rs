//! Market insight commands

use advisor_lib::insights::{
    FilterOptions, GroupCount, GroupValue, InsightFilter, InsightReport, NumericRange,
};
use anyhow::Result;
use clap::Args;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    format_indian, format_lakhs, format_pct, format_rupees, print_heading, print_json,
    print_table, print_warning, OutputFormat,
};

/// Dashboard filters; omitted filters match everything
#[derive(Args, Debug, Clone, Default)]
pub struct InsightFilterArgs {
    #[arg(long)]
    pub city: Option<String>,

    #[arg(long)]
    pub property_type: Option<String>,

    #[arg(long)]
    pub bhk: Option<String>,

    /// Minimum price in lakhs
    #[arg(long)]
    pub min_price: Option<f64>,

    /// Maximum price in lakhs
    #[arg(long)]
    pub max_price: Option<f64>,

    #[arg(long)]
    pub min_size: Option<f64>,

    #[arg(long)]
    pub max_size: Option<f64>,

    #[arg(long)]
    pub min_age: Option<f64>,

    #[arg(long)]
    pub max_age: Option<f64>,

    /// Only listings labelled as good investments
    #[arg(long)]
    pub good_only: bool,
}

impl From<InsightFilterArgs> for InsightFilter {
    fn from(args: InsightFilterArgs) -> Self {
        InsightFilter {
            city: args.city,
            property_type: args.property_type,
            bhk: args.bhk,
            min_price: args.min_price,
            max_price: args.max_price,
            min_size: args.min_size,
            max_size: args.max_size,
            min_age: args.min_age,
            max_age: args.max_age,
            good_only: args.good_only,
        }
    }
}

#[derive(Tabled)]
struct KpiRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct GroupValueRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct ShareRow {
    #[tabled(rename = "Property Type")]
    group: String,
    #[tabled(rename = "Listings")]
    count: String,
    #[tabled(rename = "Share")]
    share: String,
}

#[derive(Tabled)]
struct OptionRow {
    #[tabled(rename = "Filter")]
    filter: &'static str,
    #[tabled(rename = "Values")]
    values: String,
}

/// Show the dashboard for the filtered listings
pub async fn show_insights(
    client: &ApiClient,
    filter: InsightFilter,
    format: OutputFormat,
) -> Result<()> {
    let report: InsightReport = client.get_with_query("api/v1/insights", &filter).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &InsightReport) {
    let kpis = &report.kpis;
    if kpis.listings == 0 {
        print_warning("No listings match the selected filters");
        return;
    }

    print_heading("Market overview");
    print_table(
        vec![
            KpiRow {
                metric: "Listings",
                value: format_indian(kpis.listings as f64, 0),
            },
            KpiRow {
                metric: "Average price",
                value: format_lakhs(kpis.avg_price_lakhs),
            },
            KpiRow {
                metric: "Average price per sq ft",
                value: format_rupees(kpis.avg_price_per_sqft),
            },
            KpiRow {
                metric: "Good investment rate",
                value: format_pct(kpis.good_investment_rate_pct),
            },
        ],
        "No listings",
    );

    print_heading("Average price per sq ft by city");
    print_table(
        group_rows(&report.price_per_sqft_by_city, format_rupees),
        "No cities",
    );

    print_heading("Property type share");
    print_table(share_rows(&report.property_type_share), "No property types");

    print_heading("Good investment rate by property type");
    print_table(
        group_rows(&report.good_rate_by_type, format_pct),
        "No property types",
    );

    print_heading("Good investment rate by city");
    print_table(
        group_rows(&report.good_rate_by_city, format_pct),
        "No cities",
    );
}

fn group_rows(groups: &[GroupValue], render: fn(f64) -> String) -> Vec<GroupValueRow> {
    groups
        .iter()
        .map(|g| GroupValueRow {
            group: g.group.clone(),
            value: render(g.value),
        })
        .collect()
}

fn share_rows(groups: &[GroupCount]) -> Vec<ShareRow> {
    let total: usize = groups.iter().map(|g| g.count).sum();
    groups
        .iter()
        .map(|g| ShareRow {
            group: g.group.clone(),
            count: format_indian(g.count as f64, 0),
            share: format_pct(if total == 0 {
                0.0
            } else {
                g.count as f64 * 100.0 / total as f64
            }),
        })
        .collect()
}

/// Show the values each filter can take
pub async fn show_filters(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let options: FilterOptions = client.get("api/v1/insights/filters").await?;

    match format {
        OutputFormat::Json => print_json(&options)?,
        OutputFormat::Table => {
            let rows = vec![
                OptionRow {
                    filter: "City",
                    values: options.cities.join(", "),
                },
                OptionRow {
                    filter: "Property type",
                    values: options.property_types.join(", "),
                },
                OptionRow {
                    filter: "BHK",
                    values: options.bhks.join(", "),
                },
                OptionRow {
                    filter: "Price (lakhs)",
                    values: format_range(options.price_range),
                },
                OptionRow {
                    filter: "Size (sq ft)",
                    values: format_range(options.size_range),
                },
                OptionRow {
                    filter: "Age (years)",
                    values: format_range(options.age_range),
                },
            ];
            print_table(rows, "No filters available");
        }
    }

    Ok(())
}

fn format_range(range: Option<NumericRange>) -> String {
    match range {
        Some(r) => format!("{} to {}", format_indian(r.min, 2), format_indian(r.max, 2)),
        None => "-".to_string(),
    }
}
