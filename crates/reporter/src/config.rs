//! Reporter configuration
//!
//! Settings come from the environment; the CLI maps the same variables onto
//! command-line arguments.

use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_API_TOKEN: &str = "CASESYNC_API_TOKEN";
pub const ENV_PROJECT: &str = "CASESYNC_PROJECT";
pub const ENV_RUN_TITLE: &str = "CASESYNC_RUN_TITLE";
pub const ENV_RUN_TAGS: &str = "CASESYNC_RUN_TAGS";
pub const ENV_API_URL: &str = "CASESYNC_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "CASESYNC_TIMEOUT_SECS";
pub const ENV_UPLOAD_TIMEOUT_SECS: &str = "CASESYNC_UPLOAD_TIMEOUT_SECS";
pub const ENV_FAIL_ON_UPLOAD_ERROR: &str = "CASESYNC_FAIL_ON_UPLOAD_ERROR";

pub const DEFAULT_API_URL: &str = "https://api.casesync.io/v1";

/// Reporter configuration
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// API token sent with every request
    pub api_token: String,

    /// Project code the run belongs to
    pub project: String,

    /// Title of the created run
    pub run_title: String,

    /// Tags attached to the created run
    pub tags: Vec<String>,

    /// Base URL of the API (no trailing slash)
    pub api_url: String,

    /// Default request timeout
    pub timeout: Duration,

    /// Timeout for the bulk result upload
    pub upload_timeout: Duration,

    /// Re-raise upload failures after the run is completed
    pub fail_on_upload_error: bool,
}

impl ReporterConfig {
    /// Create a config with the required settings and defaults for the rest.
    pub fn new(
        api_token: impl Into<String>,
        project: impl Into<String>,
        run_title: impl Into<String>,
    ) -> Self {
        Self {
            api_token: api_token.into(),
            project: project.into(),
            run_title: run_title.into(),
            tags: Vec::new(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(60),
            fail_on_upload_error: false,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `CASESYNC_API_TOKEN` | API token (required) |
    /// | `CASESYNC_PROJECT` | Project code (required) |
    /// | `CASESYNC_RUN_TITLE` | Run title (required) |
    /// | `CASESYNC_RUN_TAGS` | Comma-separated run tags |
    /// | `CASESYNC_API_URL` | API base URL |
    /// | `CASESYNC_TIMEOUT_SECS` | Request timeout |
    /// | `CASESYNC_UPLOAD_TIMEOUT_SECS` | Bulk upload timeout |
    /// | `CASESYNC_FAIL_ON_UPLOAD_ERROR` | Re-raise upload failures |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(var))
        };

        let mut config = Self::new(
            required(ENV_API_TOKEN)?,
            required(ENV_PROJECT)?,
            required(ENV_RUN_TITLE)?,
        );

        if let Some(tags) = lookup(ENV_RUN_TAGS) {
            config.tags = parse_tags(&tags);
        }
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config = config.with_api_url(url);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout = parse_secs(ENV_TIMEOUT_SECS, &secs)?;
        }
        if let Some(secs) = lookup(ENV_UPLOAD_TIMEOUT_SECS) {
            config.upload_timeout = parse_secs(ENV_UPLOAD_TIMEOUT_SECS, &secs)?;
        }
        if let Some(flag) = lookup(ENV_FAIL_ON_UPLOAD_ERROR) {
            config.fail_on_upload_error = parse_flag(&flag);
        }

        Ok(config)
    }

    /// Set the run tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the bulk upload timeout.
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Re-raise upload failures after completing the run.
    pub fn with_fail_on_upload_error(mut self, fail: bool) -> Self {
        self.fail_on_upload_error = fail;
        self
    }
}

/// Split a comma-separated tag list, dropping blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn parse_secs(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidValue {
            var,
            reason: e.to_string(),
        })
}

fn parse_flag(raw: &str) -> bool {
    let raw = raw.trim();
    raw == "1" || raw.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        (ENV_API_TOKEN, "secret"),
        (ENV_PROJECT, "DEMO"),
        (ENV_RUN_TITLE, "Nightly"),
    ];

    #[test]
    fn test_required_only() {
        let config = ReporterConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.api_token, "secret");
        assert_eq!(config.project, "DEMO");
        assert_eq!(config.run_title, "Nightly");
        assert!(config.tags.is_empty());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(!config.fail_on_upload_error);
    }

    #[test]
    fn test_missing_required_var() {
        let err = ReporterConfig::from_lookup(lookup(&REQUIRED[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ENV_RUN_TITLE)));
    }

    #[test]
    fn test_blank_required_var_is_missing() {
        let err = ReporterConfig::from_lookup(lookup(&[
            (ENV_API_TOKEN, "  "),
            (ENV_PROJECT, "DEMO"),
            (ENV_RUN_TITLE, "Nightly"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ENV_API_TOKEN)));
    }

    #[test]
    fn test_optional_settings() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            (ENV_RUN_TAGS, "smoke, ci,,nightly "),
            (ENV_API_URL, "http://localhost:8080/v1/"),
            (ENV_UPLOAD_TIMEOUT_SECS, "5"),
            (ENV_FAIL_ON_UPLOAD_ERROR, "TRUE"),
        ]);
        let config = ReporterConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.tags, vec!["smoke", "ci", "nightly"]);
        assert_eq!(config.api_url, "http://localhost:8080/v1");
        assert_eq!(config.upload_timeout, Duration::from_secs(5));
        assert!(config.fail_on_upload_error);
    }

    #[test]
    fn test_invalid_timeout() {
        let mut vars = REQUIRED.to_vec();
        vars.push((ENV_TIMEOUT_SECS, "soon"));
        let err = ReporterConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: ENV_TIMEOUT_SECS, .. }));
    }
}
