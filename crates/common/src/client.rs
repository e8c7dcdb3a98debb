//! Client for the IP Load Balancing REST API
//!
//! Resources only see the [`ApiClient`] trait. [`OvhClient`] is the
//! signed reqwest implementation used at runtime; tests inject their own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Generic REST verbs against string endpoints
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get(&self, endpoint: &str) -> Result<Value>;

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value>;

    async fn put(&self, endpoint: &str, body: &Value) -> Result<Value>;

    async fn delete(&self, endpoint: &str) -> Result<Value>;
}

/// Signed HTTP client
pub struct OvhClient {
    http: reqwest::Client,
    base_url: String,
    application_key: String,
    application_secret: String,
    consumer_key: String,
    /// Offset between the server clock and ours, fetched on first signed call
    time_delta: OnceCell<i64>,
}

/// Error body returned by the API on failure
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    class: Option<String>,
}

impl OvhClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url()?,
            application_key: config.application_key.clone(),
            application_secret: config.application_secret.clone(),
            consumer_key: config.consumer_key.clone(),
            time_delta: OnceCell::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Server time minus local time, in seconds
    async fn time_delta(&self) -> Result<i64> {
        self.time_delta
            .get_or_try_init(|| async {
                let response = self
                    .http
                    .get(format!("{}/auth/time", self.base_url))
                    .header("Accept", "application/json")
                    .send()
                    .await?;
                let status = response.status();
                let headers = response.headers().clone();
                let text = response.text().await?;

                let server_time = decode_response(status, &headers, &text)?;
                let server_time = server_time.as_i64().ok_or_else(|| {
                    Error::Internal(format!("unexpected /auth/time answer: {}", server_time))
                })?;
                let delta = server_time - chrono::Utc::now().timestamp();
                debug!("Server time delta is {}s", delta);
                Ok::<_, Error>(delta)
            })
            .await
            .copied()
    }

    async fn call(&self, method: Method, endpoint: &str, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        let payload = match body {
            Some(b) => serde_json::to_string(b)?,
            None => String::new(),
        };

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header("Accept", "application/json")
            .header("X-Ovh-Application", &self.application_key);

        if body.is_some() {
            request = request
                .header("Content-Type", "application/json;charset=utf-8")
                .body(payload.clone());
        }

        let timestamp = chrono::Utc::now().timestamp() + self.time_delta().await?;
        let signature = sign(
            &self.application_secret,
            &self.consumer_key,
            method.as_str(),
            &url,
            &payload,
            timestamp,
        );
        request = request
            .header("X-Ovh-Timestamp", timestamp.to_string())
            .header("X-Ovh-Consumer", &self.consumer_key)
            .header("X-Ovh-Signature", signature);

        debug!("{} {}", method, url);
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        decode_response(status, &headers, &text)
    }
}

#[async_trait]
impl ApiClient for OvhClient {
    async fn get(&self, endpoint: &str) -> Result<Value> {
        self.call(Method::GET, endpoint, None).await
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.call(Method::POST, endpoint, Some(body)).await
    }

    async fn put(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.call(Method::PUT, endpoint, Some(body)).await
    }

    async fn delete(&self, endpoint: &str) -> Result<Value> {
        self.call(Method::DELETE, endpoint, None).await
    }
}

/// Request signature: `$1$` followed by the hex SHA-1 of the `+` joined fields
pub fn sign(
    application_secret: &str,
    consumer_key: &str,
    method: &str,
    url: &str,
    body: &str,
    timestamp: i64,
) -> String {
    let material = format!(
        "{}+{}+{}+{}+{}+{}",
        application_secret, consumer_key, method, url, body, timestamp
    );
    let digest = ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, material.as_bytes());
    format!("$1${}", hex::encode(digest.as_ref()))
}

/// Turn a raw HTTP answer into JSON, or into [`Error::Api`] for non-2xx statuses
fn decode_response(status: StatusCode, headers: &HeaderMap, text: &str) -> Result<Value> {
    if status.is_success() {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_str(text)?);
    }

    let body: ApiErrorBody = serde_json::from_str(text).unwrap_or(ApiErrorBody {
        message: text.to_string(),
        class: None,
    });
    let query_id = headers
        .get("X-Ovh-QueryID")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Err(Error::Api {
        status: status.as_u16(),
        message: body.message,
        class: body.class,
        query_id,
    })
}
