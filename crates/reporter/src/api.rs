//! Remote test-management API boundary
//!
//! The reporter only talks to the remote service through [`TestOpsApi`].
//! [`crate::client::HttpClient`] is the production implementation.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::outcome::ResultStatus;

/// Server-assigned identifier of a test run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub code: String,
    #[serde(default)]
    pub title: String,
}

/// Request body for run creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRun {
    pub title: String,
    pub is_autotest: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A run as listed by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunInfo {
    pub id: RunId,
    #[serde(default)]
    pub title: String,
}

/// A single buffered case result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    pub case_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite_title: Option<String>,
    pub status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

#[async_trait]
pub trait TestOpsApi: Send + Sync {
    /// Look up a project; `ApiError::NotFound` when it does not exist.
    async fn get_project(&self, code: &str) -> ApiResult<Project>;

    /// Create a run; `ApiError::ActiveRunLimit` when the account is at its limit.
    async fn create_run(&self, code: &str, run: &NewRun) -> ApiResult<RunId>;

    async fn list_active_runs(&self, code: &str) -> ApiResult<Vec<RunInfo>>;

    /// Upload all results for a run in one request.
    async fn upload_results(&self, code: &str, run: RunId, results: &[CaseResult]) -> ApiResult<()>;

    async fn complete_run(&self, code: &str, run: RunId) -> ApiResult<()>;
}
