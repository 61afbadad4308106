//! HTTP session bound to the API under test

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Raw API response. The status is always explicit; callers branch on it
/// instead of on error message text.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub method: Method,
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into an `HttpStatus` error
    pub fn error_for_status(self) -> E2eResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(E2eError::HttpStatus {
                method: self.method.to_string(),
                url: self.url,
                status: self.status,
                body: self.body,
            })
        }
    }

    /// Parse a successful body; non-2xx fails with the status and body
    pub fn json<T: DeserializeOwned>(self) -> E2eResult<T> {
        let response = self.error_for_status()?;
        if response.body.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Body as loosely typed JSON, `Null` when empty
    pub fn value(&self) -> E2eResult<Value> {
        if self.body.trim().is_empty() {
            Ok(Value::Null)
        } else {
            Ok(serde_json::from_str(&self.body)?)
        }
    }
}

/// One configured client per scenario
pub struct HttpSession {
    client: Client,
    base_url: String,
    disposed: AtomicBool,
}

impl HttpSession {
    /// Configure a session against `base_url`. No request is made.
    pub fn open(base_url: &str, timeout: Duration) -> E2eResult<Self> {
        let parsed = Url::parse(base_url).map_err(|e| E2eError::Initialization {
            resource: "HTTP session",
            reason: format!("invalid API base URL '{}': {}", base_url, e),
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(E2eError::Initialization {
                resource: "HTTP session",
                reason: format!("API base URL '{}' is not an http(s) address", base_url),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| E2eError::Initialization {
                resource: "HTTP session",
                reason: e.to_string(),
            })?;

        debug!("Opened HTTP session against {}", base_url);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            disposed: AtomicBool::new(false),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path, keeping any path prefix of the base
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&B>,
    ) -> E2eResult<ApiResponse> {
        if self.is_disposed() {
            return Err(E2eError::ResourceClosed("HTTP session"));
        }

        let url = self.url_for(path);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(reqwest::header::ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await?;

        debug!("{} {} -> {}", method, url, status);

        Ok(ApiResponse {
            method,
            url,
            status,
            body,
        })
    }

    pub async fn get(&self, path: &str, query: &[(String, String)]) -> E2eResult<ApiResponse> {
        self.send::<Value>(Method::GET, path, query, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> E2eResult<ApiResponse> {
        self.send(Method::POST, path, &[], Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> E2eResult<ApiResponse> {
        self.send(Method::PUT, path, &[], Some(body)).await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> E2eResult<ApiResponse> {
        self.send(Method::PATCH, path, &[], Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> E2eResult<ApiResponse> {
        self.send::<Value>(Method::DELETE, path, &[], None).await
    }

    /// Mark the session unusable. Later calls fail with `ResourceClosed`.
    pub fn dispose(&self) -> E2eResult<()> {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            debug!("Disposed HTTP session for {}", self.base_url);
        }
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
