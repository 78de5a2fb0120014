//! HTTP client for the test-management API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::api::{CaseResult, NewRun, Project, RunId, RunInfo, TestOpsApi};
use crate::config::ReporterConfig;
use crate::error::{ApiError, ApiResult};

const USER_AGENT_VALUE: &str = concat!("casesync/", env!("CARGO_PKG_VERSION"));

/// Header carrying the API token
const TOKEN_HEADER: &str = "Token";

/// Marker in a 403 body that identifies the active-run limit.
const ACTIVE_RUN_LIMIT_MARKER: &str = "active runs";

/// Page size used when listing active runs.
const ACTIVE_RUNS_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CreatedRun {
    id: RunId,
}

#[derive(Debug, Deserialize)]
struct RunList {
    #[serde(default)]
    entities: Vec<RunInfo>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
    message: Option<String>,
}

/// reqwest-backed implementation of [`TestOpsApi`]
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
    token: String,
    upload_timeout: Duration,
}

impl HttpClient {
    /// Create a client from reporter configuration.
    pub fn new(config: &ReporterConfig) -> ApiResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(config.api_url.trim_end_matches('/'))
            .map_err(|e| ApiError::Network(format!("invalid API URL {}: {}", config.api_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Network(format!("invalid API URL {}", config.api_url)));
        }

        Ok(Self {
            client,
            base_url,
            token: config.api_token.clone(),
            upload_timeout: config.upload_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Network(format!("invalid API URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ApiResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        debug!(method = method.as_str(), url = url.as_str(), "api request");
        Ok(self.client.request(method, url).header(TOKEN_HEADER, &self.token))
    }

    async fn send(&self, request: RequestBuilder, resource: &str) -> ApiResult<Response> {
        let response = request.send().await?;
        check_status(response, resource).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> ApiResult<T> {
        let response = self.send(request, resource).await?;
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", resource, e)))?;
        Ok(envelope.result)
    }
}

#[async_trait]
impl TestOpsApi for HttpClient {
    async fn get_project(&self, code: &str) -> ApiResult<Project> {
        let request = self.request(Method::GET, &["project", code])?;
        self.send_json(request, &format!("project {}", code)).await
    }

    async fn create_run(&self, code: &str, run: &NewRun) -> ApiResult<RunId> {
        let request = self.request(Method::POST, &["run", code])?.json(run);
        let created: CreatedRun = self.send_json(request, &format!("project {}", code)).await?;
        Ok(created.id)
    }

    async fn list_active_runs(&self, code: &str) -> ApiResult<Vec<RunInfo>> {
        let request = self
            .request(Method::GET, &["run", code])?
            .query(&[("status", "active".to_string()), ("limit", ACTIVE_RUNS_LIMIT.to_string())]);
        let list: RunList = self.send_json(request, &format!("project {}", code)).await?;
        Ok(list.entities)
    }

    async fn upload_results(&self, code: &str, run: RunId, results: &[CaseResult]) -> ApiResult<()> {
        let request = self
            .request(Method::POST, &["result", code, &run.to_string(), "bulk"])?
            .timeout(self.upload_timeout)
            .json(&serde_json::json!({ "cases": results }));
        self.send(request, &format!("run {}", run)).await?;
        Ok(())
    }

    async fn complete_run(&self, code: &str, run: RunId) -> ApiResult<()> {
        let request = self.request(Method::POST, &["run", code, &run.to_string(), "complete"])?;
        self.send(request, &format!("run {}", run)).await?;
        Ok(())
    }
}

/// Map a non-success response onto an [`ApiError`].
async fn check_status(response: Response, resource: &str) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| status.to_string());

    Err(classify_status(status, resource, message))
}

fn classify_status(status: StatusCode, resource: &str, message: String) -> ApiError {
    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound {
            resource: resource.to_string(),
        },
        StatusCode::FORBIDDEN if is_active_run_limit(&message) => ApiError::ActiveRunLimit { message },
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized { message },
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

fn is_active_run_limit(message: &str) -> bool {
    message.to_ascii_lowercase().contains(ACTIVE_RUN_LIMIT_MARKER)
}

/// Extract the human-readable message from an error body.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed
            .error_message
            .or(parsed.message)
            .or_else(|| Some(body.to_string())),
        Err(_) => Some(body.to_string()),
    }
}
