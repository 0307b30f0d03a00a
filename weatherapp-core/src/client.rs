use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{error::FetchError, model::WeatherRecord};

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com";

/// Source of current weather conditions for a city.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch(&self, api_key: &str, city: &str) -> Result<WeatherRecord, FetchError>;
}

/// WeatherAPI.com `current.json` client.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    base_url: String,
    http: Client,
}

impl WeatherApiClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at another host, e.g. a proxy or a local stub.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http: Client::new() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn current_url(&self) -> String {
        format!("{}/v1/current.json", self.base_url)
    }
}

impl Default for WeatherApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeatherClient for WeatherApiClient {
    async fn fetch(&self, api_key: &str, city: &str) -> Result<WeatherRecord, FetchError> {
        debug!(city, "requesting current conditions");

        let res = self
            .http
            .get(self.current_url())
            .query(&[("key", api_key), ("q", city)])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let message = provider_message(status, &body);
            warn!(status = status.as_u16(), %message, "provider rejected request");
            return Err(FetchError::Provider { status: status.as_u16(), message });
        }

        let record: WeatherRecord = serde_json::from_str(&body).map_err(|err| {
            warn!(error = %err, "provider body did not match the expected schema");
            FetchError::from(err)
        })?;

        debug!(location = %record.location.name, "received current conditions");
        Ok(record)
    }
}

/// `{"error": {"code": 1006, "message": "No matching location found."}}`
#[derive(Debug, Deserialize)]
struct WaErrorEnvelope {
    error: WaError,
}

#[derive(Debug, Deserialize)]
struct WaError {
    message: String,
}

fn provider_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<WaErrorEnvelope>(body) {
        return envelope.error.message;
    }

    match status.canonical_reason() {
        Some(reason) => reason.to_string(),
        None => truncate_body(body),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{Router, extract::Query, http::StatusCode, routing::get};

    use super::*;
    use crate::model::tests::{LONDON_JSON, london};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn stub(status: StatusCode, body: &'static str) -> Router {
        Router::new().route("/v1/current.json", get(move || async move { (status, body) }))
    }

    #[tokio::test]
    async fn success_returns_deserialized_record() {
        let app = Router::new().route(
            "/v1/current.json",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let ok = params.get("key").map(String::as_str) == Some("KEY")
                    && params.get("q").map(String::as_str) == Some("London");
                if ok {
                    (StatusCode::OK, LONDON_JSON)
                } else {
                    (StatusCode::UNAUTHORIZED, "{}")
                }
            }),
        );
        let client = WeatherApiClient::with_base_url(serve(app).await);

        let record = client.fetch("KEY", "London").await.expect("fetch should succeed");

        assert_eq!(record, london());
    }

    #[tokio::test]
    async fn provider_error_carries_provider_message() {
        let body = r#"{"error":{"code":1006,"message":"No matching location found."}}"#;
        let client = WeatherApiClient::with_base_url(serve(stub(StatusCode::BAD_REQUEST, body)).await);

        let err = client.fetch("KEY", "Atlantis").await.unwrap_err();

        assert_eq!(
            err,
            FetchError::Provider { status: 400, message: "No matching location found.".into() }
        );
    }

    #[tokio::test]
    async fn provider_error_without_envelope_uses_reason_phrase() {
        let client =
            WeatherApiClient::with_base_url(serve(stub(StatusCode::INTERNAL_SERVER_ERROR, "")).await);

        let err = client.fetch("KEY", "London").await.unwrap_err();

        assert_eq!(
            err,
            FetchError::Provider { status: 500, message: "Internal Server Error".into() }
        );
    }

    #[tokio::test]
    async fn schema_mismatch_is_schema_error() {
        let body = r#"{"location":{"name":"London"}}"#;
        let client = WeatherApiClient::with_base_url(serve(stub(StatusCode::OK, body)).await);

        let err = client.fetch("KEY", "London").await.unwrap_err();

        assert!(matches!(err, FetchError::Schema(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = WeatherApiClient::with_base_url(format!("http://127.0.0.1:{port}"));

        let err = client.fetch("SECRET", "London").await.unwrap_err();

        assert!(matches!(err, FetchError::Transport(_)), "got {err:?}");
        assert!(!err.to_string().contains("SECRET"), "api key leaked: {err}");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = WeatherApiClient::with_base_url("http://localhost:8080/");
        assert_eq!(client.current_url(), "http://localhost:8080/v1/current.json");
    }

    #[test]
    fn truncate_body_limits_long_bodies() {
        let long = "x".repeat(300);
        let out = truncate_body(&long);
        assert_eq!(out.len(), 203);
        assert!(out.ends_with("..."));
        assert_eq!(truncate_body("short"), "short");
    }
}
