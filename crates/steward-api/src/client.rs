//! HTTP client for the persistence API.

use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, json};
use steward_core::RetryConfig;
use tracing::{debug, instrument};

use crate::errors::RemoteError;

/// Response bodies longer than this are truncated in error messages.
const MAX_ERROR_BODY: usize = 2048;

/// Default per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin persistence-API client.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client against a base URL (no trailing slash required).
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    #[instrument(skip(self, payload), fields(method = %method, path))]
    async fn request(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = self.http.request(method, &url);
        if let Some(body) = payload {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            body.truncate(MAX_ERROR_BODY);
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let value = resp.json::<Value>().await?;
        debug!("api call succeeded");
        Ok(value)
    }

    /// GET `path`.
    pub async fn get(&self, path: &str) -> Result<Value, RemoteError> {
        self.request(Method::GET, path, None).await
    }

    /// POST `payload` to `path`.
    pub async fn post(&self, path: &str, payload: &Value) -> Result<Value, RemoteError> {
        self.request(Method::POST, path, Some(payload)).await
    }

    /// PATCH `payload` to `path`.
    pub async fn patch(&self, path: &str, payload: &Value) -> Result<Value, RemoteError> {
        self.request(Method::PATCH, path, Some(payload)).await
    }

    /// DELETE `path`.
    pub async fn delete(&self, path: &str) -> Result<Value, RemoteError> {
        self.request(Method::DELETE, path, None).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Typed convenience calls used by graph stages
    // ─────────────────────────────────────────────────────────────────────

    /// Create a project record.
    pub async fn create_project(&self, name: &str, summary: &str) -> Result<Value, RemoteError> {
        self.post("/projects", &json!({ "name": name, "summary": summary }))
            .await
    }

    /// Fetch a project record.
    pub async fn get_project(&self, project_id: &str) -> Result<Value, RemoteError> {
        self.get(&format!("/projects/{project_id}")).await
    }

    /// Request resource allocation for a project.
    pub async fn allocate_resources(
        &self,
        project_id: &str,
        request: &Value,
    ) -> Result<Value, RemoteError> {
        self.post(&format!("/projects/{project_id}/allocations"), request)
            .await
    }

    /// Record a deployment for a project.
    pub async fn create_deployment(
        &self,
        project_id: &str,
        payload: &Value,
    ) -> Result<Value, RemoteError> {
        self.post(&format!("/projects/{project_id}/deployments"), payload)
            .await
    }

    /// File an infrastructure incident.
    pub async fn record_incident(&self, payload: &Value) -> Result<Value, RemoteError> {
        self.post("/incidents", payload).await
    }
}

/// Run `op` with bounded retries per `config`. Only retryable errors
/// (transport faults, 5xx) are retried; the last error is returned once the
/// attempt cap is reached.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut op: F) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_attempts && e.is_retryable() => {
                debug!(attempt, error = %e, "retrying api call");
                tokio::time::sleep(config.backoff_delay(attempt)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn post_sends_json_and_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/projects"))
            .and(body_json(json!({ "name": "api", "summary": "a service" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "p1" })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let created = client.create_project("api", "a service").await.unwrap();
        assert_eq!(created["id"], "p1");
    }

    #[tokio::test]
    async fn non_success_status_is_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/p1"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = client.get_project("p1").await.unwrap_err();
        assert_matches!(err, RemoteError::Status { status: 404, .. });
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn server_errors_are_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/p1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = client.get_project("p1").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn with_retry_recovers_after_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/p1"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/projects/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "p1" })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let value = with_retry(fast_retry(), || client.get_project("p1"))
            .await
            .unwrap();
        assert_eq!(value["id"], "p1");
    }

    #[tokio::test]
    async fn with_retry_gives_up_at_the_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/p1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = with_retry(fast_retry(), || client.get_project("p1"))
            .await
            .unwrap_err();
        assert_matches!(err, RemoteError::Status { status: 500, .. });
    }

    #[tokio::test]
    async fn with_retry_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/p1"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = with_retry(fast_retry(), || client.get_project("p1"))
            .await
            .unwrap_err();
        assert_matches!(err, RemoteError::Status { status: 400, .. });
    }
}
