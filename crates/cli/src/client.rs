//! API client for communicating with the advisor server

use advisor_lib::ErrorBody;
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Non-success responses from the API
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with its JSON error body
    #[error("{} ({}){}", .body.error, .body.code, format_details(&.body.details))]
    Api { status: StatusCode, body: ErrorBody },

    /// Anything else, e.g. a proxy error page
    #[error("API error ({status}): {body}")]
    Unexpected { status: StatusCode, body: String },
}

fn format_details(details: &Option<Vec<String>>) -> String {
    match details {
        Some(details) if !details.is_empty() => details
            .iter()
            .map(|d| format!("\n  - {}", d))
            .collect::<String>(),
        _ => String::new(),
    }
}

/// API client for the advisor server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        let url = self.base_url.join(path).context("Invalid path")?;
        debug!(url = %url, "Calling advisor API");
        Ok(url)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.client.get(self.url(path)?);
        self.send(request).await
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T> {
        let request = self.client.get(self.url(path)?).query(query);
        self.send(request).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let request = self.client.post(self.url(path)?).json(body);
        self.send(request).await
    }

    /// GET a status endpoint whose body is meaningful on 503 too
    pub async fn get_status<T: DeserializeOwned>(&self, path: &str) -> Result<(StatusCode, T)> {
        let response = self
            .client
            .get(self.url(path)?)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE {
            let body = response.json().await.context("Failed to parse response")?;
            return Ok((status, body));
        }
        Err(error_from(response).await.into())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            return Err(error_from(response).await.into());
        }

        response.json().await.context("Failed to parse response")
    }
}

async fn error_from(response: Response) -> ClientError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => ClientError::Api { status, body },
        Err(_) => ClientError::Unexpected { status, body: text },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_lib::PredictionResult;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_parses_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/models")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let models: Vec<serde_json::Value> = client.get("api/v1/models").await.unwrap();

        assert!(models.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_sends_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/predict")
            .match_body(mockito::Matcher::PartialJson(json!({ "City": "Pune" })))
            .with_status(200)
            .with_body(
                json!({
                    "good_investment_label": 1,
                    "good_investment_prob": 0.91,
                    "predicted_price_lakhs": 180.5
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let result: PredictionResult = client
            .post("api/v1/predict", &json!({ "City": "Pune" }))
            .await
            .unwrap();

        assert_eq!(result.good_investment_label, 1);
        assert_eq!(result.predicted_price_lakhs, 180.5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/evaluate")
            .with_status(422)
            .with_body(
                json!({
                    "error": "invalid input: size_sqft must be positive, got 0",
                    "code": "invalid_input",
                    "details": ["size_sqft must be positive, got 0"]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .post::<serde_json::Value, _>("api/v1/evaluate", &json!({ "size_sqft": 0 }))
            .await
            .unwrap_err();

        match err.downcast_ref::<ClientError>() {
            Some(ClientError::Api { status, body }) => {
                assert_eq!(*status, StatusCode::UNPROCESSABLE_ENTITY);
                assert_eq!(body.code, "invalid_input");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("- size_sqft must be positive"));
    }

    #[tokio::test]
    async fn test_non_json_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/insights/filters")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .get::<serde_json::Value>("api/v1/insights/filters")
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::Unexpected { .. })
        ));
    }

    #[tokio::test]
    async fn test_query_parameters_skip_absent_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/insights")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("city".into(), "Pune".into()),
                mockito::Matcher::UrlEncoded("good_only".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let filter = advisor_lib::insights::InsightFilter {
            city: Some("Pune".to_string()),
            good_only: true,
            ..Default::default()
        };
        let client = ApiClient::new(&server.url()).unwrap();
        let _: serde_json::Value = client
            .get_with_query("api/v1/insights", &filter)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_endpoint_accepts_503() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(503)
            .with_body(json!({ "status": "unhealthy", "components": {} }).to_string())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let (status, body): (StatusCode, serde_json::Value) =
            client.get_status("healthz").await.unwrap();

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
    }
}
