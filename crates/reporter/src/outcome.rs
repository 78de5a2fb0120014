//! Mapping of host test states onto reported result statuses

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReporterError, ReporterResult};
use crate::host::TestOutcome;

/// Status of a single case result as reported to the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Passed,
    Failed,
    Skipped,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Passed => "passed",
            ResultStatus::Failed => "failed",
            ResultStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a finished test.
///
/// A pending test is skipped regardless of its state. Any state outside
/// passed/failed/skipped is rejected so that nothing ambiguous is uploaded.
pub fn classify(test: &TestOutcome) -> ReporterResult<ResultStatus> {
    if test.pending {
        return Ok(ResultStatus::Skipped);
    }

    match test.state.as_deref() {
        Some("passed") => Ok(ResultStatus::Passed),
        Some("failed") => Ok(ResultStatus::Failed),
        Some("pending") | Some("skipped") => Ok(ResultStatus::Skipped),
        other => Err(ReporterError::UnknownOutcome {
            title: test.full_title.clone(),
            state: other.unwrap_or("<none>").to_string(),
        }),
    }
}
