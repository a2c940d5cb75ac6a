//! Investment form evaluation, remote or against local artifacts

use advisor_lib::{
    predictor::{evaluate_investment, InvestmentAssessment, InvestmentQuery, PropertyType},
    InferenceService,
};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_valuation, color_verdict, format_indian, format_lakhs, format_probability,
    format_rupees, print_json, print_table, OutputFormat,
};

/// Form fields; anything omitted takes the form default
#[derive(Args, Debug, Clone, Default)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub city: Option<String>,

    #[arg(long)]
    pub locality: Option<String>,

    /// Apartment, Independent House or Villa
    #[arg(long)]
    pub property_type: Option<PropertyType>,

    /// Bedrooms (1-5)
    #[arg(long)]
    pub bhk: Option<i64>,

    /// Built-up area in square feet (300-10000)
    #[arg(long)]
    pub size_sqft: Option<f64>,

    /// Age of the property in years (0-50)
    #[arg(long)]
    pub age: Option<i64>,

    /// Schools nearby (0-20)
    #[arg(long)]
    pub schools: Option<i64>,

    /// Hospitals nearby (0-20)
    #[arg(long)]
    pub hospitals: Option<i64>,

    /// Asking price in lakhs (10-1000)
    #[arg(long)]
    pub price: Option<f64>,

    /// Expected annual growth in percent (5-12)
    #[arg(long)]
    pub growth: Option<f64>,

    /// Investment horizon in years (3-10)
    #[arg(long)]
    pub horizon: Option<i64>,

    /// Score with the local artifacts instead of the API
    #[arg(long)]
    pub local: bool,

    /// Artifact directory used with --local
    #[arg(long, env = "ADVISOR_MODELS_DIR", default_value = "models")]
    pub models_dir: PathBuf,
}

impl EvaluateArgs {
    pub fn to_query(&self) -> InvestmentQuery {
        let defaults = InvestmentQuery::default();
        InvestmentQuery {
            city: self.city.clone().unwrap_or(defaults.city),
            locality: self.locality.clone().unwrap_or(defaults.locality),
            property_type: self.property_type.unwrap_or(defaults.property_type),
            bhk: self.bhk.unwrap_or(defaults.bhk),
            size_sqft: self.size_sqft.unwrap_or(defaults.size_sqft),
            age_years: self.age.unwrap_or(defaults.age_years),
            nearby_schools: self.schools.unwrap_or(defaults.nearby_schools),
            nearby_hospitals: self.hospitals.unwrap_or(defaults.nearby_hospitals),
            asking_price_lakhs: self.price.unwrap_or(defaults.asking_price_lakhs),
            expected_growth_pct: self.growth.unwrap_or(defaults.expected_growth_pct),
            horizon_years: self.horizon.unwrap_or(defaults.horizon_years),
        }
    }
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(field: impl Into<String>, value: impl Into<String>) -> FieldRow {
    FieldRow {
        field: field.into(),
        value: value.into(),
    }
}

/// Evaluate one property through the API at `api_url`, or locally with
/// `--local`, in which case the URL is never parsed
pub async fn evaluate(api_url: &str, args: EvaluateArgs, format: OutputFormat) -> Result<()> {
    let query = args.to_query();

    let assessment: InvestmentAssessment = if args.local {
        let models_dir = args.models_dir.clone();
        tokio::task::spawn_blocking(move || {
            let service = InferenceService::from_models_dir(&models_dir);
            evaluate_investment(&service, &query)
        })
        .await
        .context("Evaluation task failed")??
    } else {
        ApiClient::new(api_url)?
            .post("api/v1/evaluate", &query)
            .await?
    };

    match format {
        OutputFormat::Json => print_json(&assessment)?,
        OutputFormat::Table => print_assessment(&assessment),
    }

    Ok(())
}

fn print_assessment(assessment: &InvestmentAssessment) {
    let query = &assessment.query;
    let prediction = &assessment.prediction;

    let rows = vec![
        row(
            "Property",
            format!(
                "{} BHK {}, {}, {}",
                query.bhk, query.property_type, query.locality, query.city
            ),
        ),
        row(
            "Size",
            format!("{} sq ft", format_indian(query.size_sqft, 0)),
        ),
        row("Age", format!("{} years", query.age_years)),
        row(
            "Schools / Hospitals nearby",
            format!("{} / {}", query.nearby_schools, query.nearby_hospitals),
        ),
        row("Asking price", format_lakhs(query.asking_price_lakhs)),
        row("Price per sq ft", format_rupees(assessment.price_per_sqft)),
        row(
            format!(
                "Value in {} years at {}%",
                query.horizon_years, query.expected_growth_pct
            ),
            format_lakhs(assessment.future_price_lakhs),
        ),
        row(
            "Predicted market price",
            format_lakhs(prediction.predicted_price_lakhs),
        ),
        row(
            "Predicted minus asking",
            format_lakhs(assessment.valuation_delta_lakhs),
        ),
        row(
            "Good investment probability",
            format_probability(prediction.good_investment_prob),
        ),
    ];
    print_table(rows, "Nothing to show");

    println!(
        "\n{}",
        color_verdict(prediction.good_investment_label, &assessment.verdict)
    );
    println!("{}", color_valuation(assessment.valuation));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omitted_fields_take_form_defaults() {
        let query = EvaluateArgs::default().to_query();
        assert_eq!(query, InvestmentQuery::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = EvaluateArgs {
            city: Some("Pune".to_string()),
            property_type: Some(PropertyType::Villa),
            size_sqft: Some(2000.0),
            price: Some(150.0),
            ..EvaluateArgs::default()
        };
        let query = args.to_query();
        assert_eq!(query.city, "Pune");
        assert_eq!(query.property_type, PropertyType::Villa);
        assert_eq!(query.price_per_sqft(), 7500.0);
        assert_eq!(query.locality, InvestmentQuery::default().locality);
    }

    #[tokio::test]
    async fn test_local_evaluation_without_models_names_command() {
        let dir = tempfile::tempdir().unwrap();
        let args = EvaluateArgs {
            local: true,
            models_dir: dir.path().to_path_buf(),
            ..EvaluateArgs::default()
        };

        let err = evaluate("not a url", args, OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("advisor train classifier"));
    }

    #[tokio::test]
    async fn test_local_evaluation_validates_first() {
        let dir = tempfile::tempdir().unwrap();
        let args = EvaluateArgs {
            size_sqft: Some(0.0),
            local: true,
            models_dir: dir.path().to_path_buf(),
            ..EvaluateArgs::default()
        };

        let err = evaluate("http://localhost:1", args, OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("size_sqft must be positive"));
    }

    #[tokio::test]
    async fn test_remote_evaluation_posts_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/evaluate")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({ "city": "Pune", "bhk": 2 }),
            ))
            .with_status(422)
            .with_body(
                serde_json::json!({
                    "error": "invalid input",
                    "code": "invalid_input",
                    "details": ["age_years must be between 0 and 50, got -1"]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let args = EvaluateArgs {
            city: Some("Pune".to_string()),
            bhk: Some(2),
            age: Some(-1),
            ..EvaluateArgs::default()
        };
        let err = evaluate(&server.url(), args, OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("age_years"));
        mock.assert_async().await;
    }
}
