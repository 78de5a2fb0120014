//! Error types for the reporter

use thiserror::Error;

/// Configuration errors, raised before any event is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// Errors returned by the remote test-management API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Active run limit reached: {message}")]
    ActiveRunLimit { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Project '{code}' does not exist. Create it in the test-management service before reporting")]
    ProjectNotFound { code: String },

    #[error("Active run limit still reached after completing stale runs: {message}")]
    ActiveRunLimit { message: String },

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Result upload failed: {0}")]
    Upload(ApiError),

    #[error("Unknown outcome for test '{title}': {state}")]
    UnknownOutcome { title: String, state: String },

    #[error("Malformed host event at line {line}: {message}")]
    Event { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start async runtime: {0}")]
    Runtime(String),
}

impl ReporterError {
    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 1,
            Self::ProjectNotFound { .. } => 2,
            Self::Api(ApiError::Unauthorized { .. }) => 2,
            Self::ActiveRunLimit { .. } => 3,
            Self::Upload(_) => 4,
            Self::Api(_) => 5,
            Self::UnknownOutcome { .. } | Self::Event { .. } | Self::Io(_) | Self::Runtime(_) => 6,
        }
    }
}

pub type ReporterResult<T> = Result<T, ReporterError>;
pub type ApiResult<T> = Result<T, ApiError>;
