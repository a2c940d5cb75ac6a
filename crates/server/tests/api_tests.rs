//! Integration tests for the advisor API endpoints

use advisor_lib::{
    boosting::BoostingParams,
    dataset::HousingDataset,
    health::{Component, HealthRegistry},
    observability::{AdvisorLogger, AdvisorMetrics},
    tracking::NoopTracker,
    training::{Trainer, TrainingConfig},
};
use advisor_server::api::{create_router, AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const HEADER: &str = concat!(
    "City,Locality,Property_Type,BHK,Size_in_SqFt,Age_of_Property,",
    "Nearby_Schools,Nearby_Hospitals,Price_in_Lakhs,calc_price_per_sqft,",
    "Annual_Growth_Rate,Future_Price_5Y,Good_Investment"
);

const CITIES: [(&str, f64); 3] = [("Hyderabad", 7000.0), ("Pune", 8000.0), ("Mumbai", 15000.0)];

const TYPES: [&str; 3] = ["Apartment", "Independent House", "Villa"];

/// Deterministic historical listings
fn write_dataset(path: &Path, rows: usize) {
    let mut csv = format!("{}\n", HEADER);
    for i in 0..rows {
        let (city, rate) = CITIES[i % CITIES.len()];
        let size = 600.0 + ((i * 37) % 2400) as f64;
        let age = ((i * 7) % 30) as f64;
        let growth = 0.05 + ((i * 13) % 70) as f64 / 1000.0;
        let price = size * rate * (1.0 - age * 0.005) / 100_000.0;
        let good = u8::from(growth >= 0.08 && age < 20.0);
        writeln!(
            csv,
            "{},{} Sector {},{},{},{},{},{},{},{:.2},{:.2},{:.3},{:.2},{}",
            city,
            city,
            i % 4,
            TYPES[i % TYPES.len()],
            1 + i % 5,
            size,
            age,
            i % 10,
            i % 6,
            price,
            price * 100_000.0 / size,
            growth,
            price * (1.0 + growth).powi(5),
            good
        )
        .unwrap();
    }
    std::fs::write(path, csv).unwrap();
}

fn train_models(models_dir: &Path, data_path: &Path) {
    let small = |n_estimators| BoostingParams {
        n_estimators,
        max_depth: 4,
        learning_rate: 0.3,
        ..BoostingParams::default()
    };
    let config = TrainingConfig {
        models_dir: models_dir.to_path_buf(),
        classifier_params: small(20),
        regressor_params: small(30),
        ..TrainingConfig::default()
    };
    let dataset = HousingDataset::load(data_path).unwrap();
    let trainer = Trainer::new(&config, &NoopTracker);
    trainer.train_classifier(&dataset).unwrap();
    trainer.train_regressor(&dataset).unwrap();
}

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    _dir: TempDir,
}

async fn setup_test_app(with_data: bool, with_models: bool) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("housing.csv");
    let models_dir = dir.path().join("models");

    if with_data || with_models {
        write_dataset(&data_path, 150);
    }
    if with_models {
        train_models(&models_dir, &data_path);
    }
    if !with_data {
        let _ = std::fs::remove_file(&data_path);
    }

    let health_registry = HealthRegistry::new();
    for component in Component::ALL {
        health_registry.register(component).await;
    }

    let state = Arc::new(AppState::new(
        health_registry,
        AdvisorMetrics::new(),
        AdvisorLogger::new("property-advisor-test"),
        &models_dir,
        &data_path,
    ));
    let router = create_router(state.clone());

    TestApp {
        router,
        state,
        _dir: dir,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn predict_sample(router: &Router) -> (StatusCode, Value) {
    send(router, post_json("/api/v1/predict", &sample_property())).await
}

fn sample_property() -> Value {
    json!({
        "City": "Hyderabad",
        "Locality": "Hyderabad Sector 1",
        "Property_Type": "Apartment",
        "BHK": 3,
        "Size_in_SqFt": 1500,
        "Age_of_Property": 10,
        "Nearby_Schools": 5,
        "Nearby_Hospitals": 3,
        "calc_price_per_sqft": 7000,
        "Annual_Growth_Rate": 0.09,
        "Future_Price_5Y": 160
    })
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let app = setup_test_app(true, true).await;

    let (status, health) = send(&app.router, get("/healthz")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let app = setup_test_app(true, true).await;
    app.state
        .health_registry
        .set_degraded(Component::Dataset, "not found")
        .await;

    let (status, health) = send(&app.router, get("/healthz")).await;

    // Degraded still returns 200 (operational)
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let app = setup_test_app(true, true).await;
    app.state
        .health_registry
        .set_unhealthy(Component::Classifier, "checksum mismatch")
        .await;

    let (status, health) = send(&app.router, get("/healthz")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_follows_ready_flag() {
    let app = setup_test_app(true, true).await;

    let (status, readiness) = send(&app.router, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    app.state.health_registry.set_ready(true).await;
    let (status, readiness) = send(&app.router, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_predict_scores_property() {
    let app = setup_test_app(true, true).await;

    let (status, result) = predict_sample(&app.router).await;

    assert_eq!(status, StatusCode::OK);
    let prob = result["good_investment_prob"].as_f64().unwrap();
    let label = result["good_investment_label"].as_u64().unwrap();
    assert!((0.0..=1.0).contains(&prob));
    assert_eq!(label, u64::from(prob > 0.5));
    assert!(result["predicted_price_lakhs"].as_f64().unwrap().is_finite());
}

#[tokio::test]
async fn test_predict_is_deterministic() {
    let app = setup_test_app(true, true).await;

    let (_, first) = predict_sample(&app.router).await;
    let (_, second) = predict_sample(&app.router).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_predict_without_models_returns_503() {
    let app = setup_test_app(true, false).await;

    let (status, error) = predict_sample(&app.router).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error["code"], "artifact_not_found");
    assert!(error["error"]
        .as_str()
        .unwrap()
        .contains("advisor train classifier"));

    let (_, health) = send(&app.router, get("/healthz")).await;
    let classifier = &health["components"][Component::Classifier.as_str()];
    assert_eq!(classifier["status"], "degraded");
}

#[tokio::test]
async fn test_predict_rejects_malformed_body() {
    let app = setup_test_app(true, true).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/predict")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, error) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "invalid_body");
}

#[tokio::test]
async fn test_predict_treats_uncoercible_values_as_missing() {
    let app = setup_test_app(true, true).await;

    let mut property = sample_property();
    property["Size_in_SqFt"] = json!(true);
    property["Nearby_Schools"] = json!([5]);
    property["Locality"] = json!({ "name": "Madhapur" });
    let (status, result) = send(&app.router, post_json("/api/v1/predict", &property)).await;

    assert_eq!(status, StatusCode::OK);
    let prob = result["good_investment_prob"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&prob));
}

#[tokio::test]
async fn test_evaluate_returns_assessment() {
    let app = setup_test_app(true, true).await;

    let query = json!({
        "city": "Pune",
        "locality": "Pune Sector 2",
        "property_type": "Villa",
        "bhk": 4,
        "size_sqft": 2000.0,
        "asking_price_lakhs": 150.0
    });
    let (status, assessment) = send(&app.router, post_json("/api/v1/evaluate", &query)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(assessment["price_per_sqft"].as_f64().unwrap(), 7500.0);
    assert_eq!(assessment["features"]["BHK"], "4");
    assert!(assessment["verdict"].is_string());

    let delta = assessment["valuation_delta_lakhs"].as_f64().unwrap();
    let expected = if delta > 0.0 {
        "undervalued"
    } else if delta < 0.0 {
        "overvalued"
    } else {
        "fairly_priced"
    };
    assert_eq!(assessment["valuation"], expected);
}

#[tokio::test]
async fn test_evaluate_rejects_zero_size() {
    let app = setup_test_app(true, true).await;

    let query = json!({ "size_sqft": 0.0 });
    let (status, error) = send(&app.router, post_json("/api/v1/evaluate", &query)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "invalid_input");
    let details = error["details"].as_array().unwrap();
    assert!(!details.is_empty());
}

#[tokio::test]
async fn test_evaluate_reports_negative_counts_field_by_field() {
    let app = setup_test_app(true, true).await;

    let query = json!({ "age_years": -3, "bhk": 0, "nearby_schools": -1 });
    let (status, error) = send(&app.router, post_json("/api/v1/evaluate", &query)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "invalid_input");
    let details: Vec<&str> = error["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(details.iter().any(|d| d.starts_with("age_years")));
    assert!(details.iter().any(|d| d.starts_with("bhk")));
    assert!(details.iter().any(|d| d.starts_with("nearby_schools")));
}

#[tokio::test]
async fn test_insights_over_filtered_listings() {
    let app = setup_test_app(true, false).await;

    let (status, all) = send(&app.router, get("/api/v1/insights")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["kpis"]["listings"], 150);

    let uri = "/api/v1/insights?city=Pune&good_only=true";
    let (status, pune) = send(&app.router, get(uri)).await;
    assert_eq!(status, StatusCode::OK);
    let matched = pune["kpis"]["listings"].as_u64().unwrap();
    assert!(matched > 0 && matched < 50);
    let good_rate = pune["kpis"]["good_investment_rate_pct"].as_f64().unwrap();
    assert_eq!(good_rate, 100.0);

    let (_, everything) = send(&app.router, get("/api/v1/insights?city=All")).await;
    assert_eq!(everything["kpis"]["listings"], 150);
}

#[tokio::test]
async fn test_insights_rejects_bad_query() {
    let app = setup_test_app(true, false).await;

    let (status, error) = send(&app.router, get("/api/v1/insights?min_price=cheap")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "invalid_query");
}

#[tokio::test]
async fn test_insights_without_dataset_returns_503() {
    let app = setup_test_app(false, false).await;

    let (status, error) = send(&app.router, get("/api/v1/insights")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error["code"], "dataset_not_found");
}

#[tokio::test]
async fn test_insight_filters_lists_options() {
    let app = setup_test_app(true, false).await;

    let (status, options) = send(&app.router, get("/api/v1/insights/filters")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(options["cities"], json!(["Hyderabad", "Mumbai", "Pune"]));
    assert_eq!(options["bhks"], json!(["1", "2", "3", "4", "5"]));
    assert!(options["price_range"]["min"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_models_reports_artifacts() {
    let app = setup_test_app(true, true).await;

    let (status, models) = send(&app.router, get("/api/v1/models")).await;
    assert_eq!(status, StatusCode::OK);
    let models = models.as_array().unwrap();
    assert_eq!(models.len(), 2);
    assert!(models.iter().all(|m| m["loaded"] == false));
    assert!(models.iter().all(|m| m["header"]["checksum"].is_string()));

    predict_sample(&app.router).await;

    let (_, models) = send(&app.router, get("/api/v1/models")).await;
    assert!(models
        .as_array()
        .unwrap()
        .iter()
        .all(|m| m["loaded"] == true));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup_test_app(true, true).await;
    predict_sample(&app.router).await;

    let response = app.router.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("property_advisor_predictions_total"));
}
