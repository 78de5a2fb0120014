//! Host test runner contract
//!
//! A host runner drives a [`LifecycleListener`] through five callbacks. Hosts
//! that live in another process hand over a stream of [`HostEvent`]s instead,
//! either in the native JSON-lines format ([`read_events`]) or as libtest JSON
//! output ([`libtest::read_libtest_events`]). [`dispatch`] replays such a
//! stream onto a listener.

pub mod libtest;

use std::io::BufRead;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::{ReporterError, ReporterResult};
use crate::reporter::RunSummary;

/// A suite as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    /// Empty for the host's root suite
    #[serde(default)]
    pub title: String,
}

impl Suite {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }
}

/// Error attached to a failed test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestError {
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
}

/// A finished test as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub title: String,
    pub full_title: String,
    #[serde(default, alias = "duration")]
    pub duration_ms: Option<u64>,
    /// Host state: `passed`, `failed`, or `pending`/`skipped`
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub error: Option<TestError>,
}

/// One lifecycle signal from the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    RunBegin,
    SuiteBegin(Suite),
    SuiteEnd(Suite),
    TestEnd(TestOutcome),
    RunEnd,
}

/// Receiver of host lifecycle callbacks.
///
/// Callbacks are invoked sequentially from a synchronous context.
pub trait LifecycleListener {
    fn run_begin(&mut self) -> ReporterResult<()>;

    fn suite_begin(&mut self, suite: &Suite) -> ReporterResult<()>;

    fn suite_end(&mut self, suite: &Suite) -> ReporterResult<()>;

    fn test_end(&mut self, test: &TestOutcome) -> ReporterResult<()>;

    fn run_end(&mut self) -> ReporterResult<RunSummary>;
}

/// Replay an event stream onto a listener.
///
/// A stream that stops before `run_end` is closed implicitly. When a fatal
/// error hits after the run began, `run_end` is still invoked so the remote
/// run gets completed, and the original error is returned.
pub fn dispatch<L, I>(listener: &mut L, events: I) -> ReporterResult<RunSummary>
where
    L: LifecycleListener + ?Sized,
    I: IntoIterator<Item = ReporterResult<HostEvent>>,
{
    let mut began = false;

    for event in events {
        let result = event.and_then(|event| match event {
            HostEvent::RunBegin => {
                listener.run_begin()?;
                began = true;
                Ok(None)
            }
            HostEvent::SuiteBegin(suite) => listener.suite_begin(&suite).map(|_| None),
            HostEvent::SuiteEnd(suite) => listener.suite_end(&suite).map(|_| None),
            HostEvent::TestEnd(test) => listener.test_end(&test).map(|_| None),
            HostEvent::RunEnd => listener.run_end().map(Some),
        });

        match result {
            Ok(Some(summary)) => return Ok(summary),
            Ok(None) => {}
            Err(e) => {
                if began {
                    if let Err(close_err) = listener.run_end() {
                        error!(error = %close_err, "failed to close run after fatal error");
                    }
                }
                return Err(e);
            }
        }
    }

    if began {
        warn!("event stream ended without run_end, closing run");
    }
    listener.run_end()
}

/// Decode native JSON-lines host events. Blank lines are skipped.
pub fn read_events<R: BufRead>(reader: R) -> impl Iterator<Item = ReporterResult<HostEvent>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(parse_event(idx + 1, &line)),
            Err(e) => Some(Err(ReporterError::Io(e))),
        })
}

fn parse_event(line: usize, raw: &str) -> ReporterResult<HostEvent> {
    serde_json::from_str(raw).map_err(|e| ReporterError::Event {
        line,
        message: e.to_string(),
    })
}
