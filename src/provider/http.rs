//! HTTP client wrapper for model-adapter requests.

use crate::provider::error::ModelError;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::Serialize;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Authentication configuration.
#[derive(Clone)]
pub enum AuthConfig {
    /// `Authorization: Bearer {token}`.
    Bearer(String),
    /// Custom header authentication, e.g. `x-api-key: {key}`.
    ApiKey { header: String, key: String },
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"[REDACTED]").finish(),
            Self::ApiKey { header, .. } => f
                .debug_struct("ApiKey")
                .field("header", header)
                .field("key", &"[REDACTED]")
                .finish(),
        }
    }
}

#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    auth: AuthConfig,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, auth: AuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
            auth,
        }
    }

    fn build_headers(&self) -> Result<HeaderMap, ModelError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match &self.auth {
            AuthConfig::Bearer(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| ModelError::Api("bearer token contains invalid header characters".into()))?;
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
            AuthConfig::ApiKey { header, key } => {
                let name = reqwest::header::HeaderName::try_from(header)
                    .map_err(|_| ModelError::Api("API key header name is invalid".into()))?;
                let value = HeaderValue::from_str(key)
                    .map_err(|_| ModelError::Api("API key contains invalid header characters".into()))?;
                headers.insert(name, value);
            }
        }

        Ok(headers)
    }

    /// POST a JSON body and return an SSE-framed byte stream.
    pub async fn post_stream<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<impl Stream<Item = Result<Bytes, reqwest::Error>>, ModelError> {
        let url = format!("{}{path}", self.base_url);
        let mut headers = self.build_headers()?;
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        let response = self.client.post(&url).headers(headers).json(body).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(&response);
            return Err(ModelError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("HTTP {status}: {text}")));
        }

        Ok(response.bytes_stream())
    }
}

fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    let value = response.headers().get(RETRY_AFTER)?;
    let s = value.to_str().ok()?;
    parse_retry_after_value(s)
}

/// Handles integer and fractional seconds (rounds up). Ignores HTTP-date
/// format and non-finite values.
fn parse_retry_after_value(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        Some(secs.max(1))
    } else if let Ok(f) = s.parse::<f64>() {
        if f.is_finite() && f > 0.0 {
            Some((f.ceil() as u64).max(1))
        } else {
            None
        }
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_auth_header() {
        let client = HttpClient::new("https://api.example.com", AuthConfig::Bearer("test-token".into()));
        let headers = client.build_headers().unwrap();
        assert_eq!(headers.get(reqwest::header::AUTHORIZATION).unwrap(), "Bearer test-token");
    }

    #[test]
    fn api_key_auth_header() {
        let client = HttpClient::new(
            "https://api.example.com",
            AuthConfig::ApiKey { header: "x-api-key".into(), key: "secret".into() },
        );
        let headers = client.build_headers().unwrap();
        assert_eq!(headers.get("x-api-key").unwrap(), "secret");
    }

    #[test]
    fn retry_after_fractional_rounds_up() {
        assert_eq!(parse_retry_after_value("2.5"), Some(3));
        assert_eq!(parse_retry_after_value("0.1"), Some(1));
    }

    #[test]
    fn retry_after_rejects_non_numeric() {
        assert_eq!(parse_retry_after_value("Thu, 01 Jan 2026 00:00:00 GMT"), None);
        assert_eq!(parse_retry_after_value("NaN"), None);
    }
}
