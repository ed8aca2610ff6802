//! HTTP client for the external exchange-rate API.

use super::{RateClient, RateClientError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Client for the external rate API.
///
/// The configured URL already carries the API-key path segment; requests
/// append the base code: `GET {base_url}/{base}`.
#[derive(Debug, Clone)]
pub struct ExchangeRateClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    result: String,
    #[serde(default)]
    base_code: String,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

impl ExchangeRateClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        ExchangeRateClient { http, base_url }
    }
}

#[async_trait]
impl RateClient for ExchangeRateClient {
    async fn get_rates_for_base(
        &self,
        base: &str,
    ) -> Result<HashMap<String, f64>, RateClientError> {
        let url = format!("{}/{}", self.base_url, base);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| RateClientError::Request {
                base: base.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateClientError::Status {
                status: status.as_u16(),
                base: base.to_string(),
            });
        }

        let body: ApiResponse =
            response
                .json()
                .await
                .map_err(|source| RateClientError::Decode {
                    base: base.to_string(),
                    source,
                })?;

        if body.result != "success" {
            return Err(RateClientError::NonSuccess {
                base: base.to_string(),
                result: body.result,
            });
        }
        if body.conversion_rates.is_empty() {
            return Err(RateClientError::EmptyRates {
                base: base.to_string(),
            });
        }

        debug!(
            base = %body.base_code,
            rates = body.conversion_rates.len(),
            "fetched rates"
        );
        Ok(body.conversion_rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    /// Serves a canned exchange-rate API on an ephemeral local port.
    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_successful_response_returns_rates() {
        let router = Router::new().route(
            "/{base}",
            get(|Path(base): Path<String>| async move {
                Json(json!({
                    "result": "success",
                    "base_code": base,
                    "conversion_rates": {"EUR": 0.9231, "JPY": 148.32}
                }))
            }),
        );
        let url = spawn_stub(router).await;

        let client = ExchangeRateClient::new(Client::new(), url);
        let rates = client.get_rates_for_base("USD").await.unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates["EUR"], 0.9231);
        assert_eq!(rates["JPY"], 148.32);
    }

    #[tokio::test]
    async fn test_non_2xx_status_is_an_error() {
        let router = Router::new().route(
            "/{base}",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE.into_response() }),
        );
        let url = spawn_stub(router).await;

        let client = ExchangeRateClient::new(Client::new(), url);
        let err = client.get_rates_for_base("USD").await.unwrap_err();

        match err {
            RateClientError::Status { status, base } => {
                assert_eq!(status, 503);
                assert_eq!(base, "USD");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_success_result_is_an_error() {
        let router = Router::new().route(
            "/{base}",
            get(|| async { Json(json!({"result": "error", "error-type": "invalid-key"})) }),
        );
        let url = spawn_stub(router).await;

        let client = ExchangeRateClient::new(Client::new(), url);
        let err = client.get_rates_for_base("USD").await.unwrap_err();

        match err {
            RateClientError::NonSuccess { base, result } => {
                assert_eq!(base, "USD");
                assert_eq!(result, "error");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_conversion_rates_is_an_error() {
        let router = Router::new().route(
            "/{base}",
            get(|| async { Json(json!({"result": "success", "base_code": "USD"})) }),
        );
        let url = spawn_stub(router).await;

        let client = ExchangeRateClient::new(Client::new(), url);
        let err = client.get_rates_for_base("USD").await.unwrap_err();

        assert!(matches!(err, RateClientError::EmptyRates { .. }));
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_is_trimmed() {
        let router = Router::new().route(
            "/{base}",
            get(|Path(base): Path<String>| async move {
                Json(json!({
                    "result": "success",
                    "base_code": base,
                    "conversion_rates": {"EUR": 1.0}
                }))
            }),
        );
        let url = format!("{}/", spawn_stub(router).await);

        let client = ExchangeRateClient::new(Client::new(), url);
        assert!(client.get_rates_for_base("USD").await.is_ok());
    }
}
