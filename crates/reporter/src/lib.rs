//! casesync reporter
//!
//! Listens to test lifecycle events from a host runner and syncs the results
//! to a remote test-management service as one test run:
//!
//! ```text
//! ┌────────────┐  events   ┌──────────────────────────────┐  HTTP  ┌──────────────┐
//! │ host runner│ ────────► │ Reporter (LifecycleListener) │ ─────► │ TestOpsApi   │
//! │ / stream   │           │  classify, print, buffer     │        │ (HttpClient) │
//! └────────────┘           └──────────────────────────────┘        └──────────────┘
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod host;
pub mod outcome;
pub mod reporter;

pub use api::{CaseResult, NewRun, Project, RunId, RunInfo, TestOpsApi};
pub use client::HttpClient;
pub use config::ReporterConfig;
pub use console::ConsoleOutput;
pub use error::{ApiError, ApiResult, ConfigError, ReporterError, ReporterResult};
pub use host::{dispatch, read_events, HostEvent, LifecycleListener, Suite, TestError, TestOutcome};
pub use outcome::{classify, ResultStatus};
pub use reporter::{Reporter, RunSummary};
