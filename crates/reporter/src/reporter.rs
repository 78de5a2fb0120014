//! Lifecycle reporter that syncs results to a remote test run
//!
//! Host callbacks are synchronous while the remote API is async, so every
//! remote call is driven to completion on a reporter-owned current-thread
//! runtime. Calls therefore never overlap:
//!
//! ```text
//! run_begin   get_project -> create_run (-> list_active_runs -> complete_run* -> create_run)
//! test_end    classify -> print -> buffer
//! run_end     upload_results -> complete_run
//! ```
//!
//! A `Reporter` must not be driven from inside another tokio runtime.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

use crate::api::{CaseResult, NewRun, RunId, TestOpsApi};
use crate::client::HttpClient;
use crate::config::ReporterConfig;
use crate::console::ConsoleOutput;
use crate::error::{ApiError, ReporterError, ReporterResult};
use crate::host::{LifecycleListener, Suite, TestOutcome};
use crate::outcome::{classify, ResultStatus};

/// Outcome of a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Option<RunId>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Whether the buffered results reached the remote run
    pub uploaded: bool,
}

pub struct Reporter {
    config: ReporterConfig,
    api: Box<dyn TestOpsApi>,
    runtime: Runtime,
    console: ConsoleOutput,

    suites: Vec<String>,
    results: Vec<CaseResult>,
    run_id: Option<RunId>,

    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,

    /// Set once run_end has gone through
    finished: Option<RunSummary>,
}

impl Reporter {
    /// Create a reporter talking HTTP to the configured API, printing to stdout.
    pub fn new(config: ReporterConfig) -> ReporterResult<Self> {
        let api = HttpClient::new(&config)?;
        Self::with_api(config, Box::new(api), ConsoleOutput::stdout())
    }

    /// Create a reporter with a custom API implementation and console sink.
    pub fn with_api(
        config: ReporterConfig,
        api: Box<dyn TestOpsApi>,
        console: ConsoleOutput,
    ) -> ReporterResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ReporterError::Runtime(e.to_string()))?;

        Ok(Self {
            config,
            api,
            runtime,
            console,
            suites: Vec::new(),
            results: Vec::new(),
            run_id: None,
            total: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            finished: None,
        })
    }

    /// Remote run created by `run_begin`, if any.
    pub fn run_id(&self) -> Option<RunId> {
        self.run_id
    }

    /// Results buffered since `run_begin` that have not been uploaded yet.
    pub fn buffered_results(&self) -> &[CaseResult] {
        &self.results
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn create_run(&self, new_run: &NewRun) -> ReporterResult<RunId> {
        let code = &self.config.project;

        match self.block_on(self.api.create_run(code, new_run)) {
            Ok(id) => return Ok(id),
            Err(ApiError::ActiveRunLimit { message }) => {
                warn!(project = %code, %message, "active run limit reached, completing stale runs");
            }
            Err(e) => return Err(e.into()),
        }

        let completed = self.complete_active_runs()?;
        info!(project = %code, completed, "completed stale runs, retrying run creation");

        match self.block_on(self.api.create_run(code, new_run)) {
            Ok(id) => Ok(id),
            Err(ApiError::ActiveRunLimit { message }) => Err(ReporterError::ActiveRunLimit { message }),
            Err(e) => Err(e.into()),
        }
    }

    fn complete_active_runs(&self) -> ReporterResult<usize> {
        let code = &self.config.project;
        let active = self.block_on(self.api.list_active_runs(code))?;

        for run in &active {
            debug!(project = %code, run_id = %run.id, title = %run.title, "completing active run");
            self.block_on(self.api.complete_run(code, run.id))?;
        }

        Ok(active.len())
    }

    fn current_suite(&self) -> Option<String> {
        self.suites.iter().rev().find(|title| !title.is_empty()).cloned()
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            total: self.total,
            passed: self.passed,
            failed: self.failed,
            skipped: self.skipped,
            uploaded: false,
        }
    }
}

impl LifecycleListener for Reporter {
    fn run_begin(&mut self) -> ReporterResult<()> {
        if let Some(run_id) = self.run_id {
            warn!(%run_id, "run already started, ignoring run_begin");
            return Ok(());
        }

        let code = self.config.project.clone();
        info!(project = %code, "checking project");

        match self.block_on(self.api.get_project(&code)) {
            Ok(project) => debug!(project = %project.code, title = %project.title, "project found"),
            Err(ApiError::NotFound { .. }) => return Err(ReporterError::ProjectNotFound { code }),
            Err(e) => return Err(e.into()),
        }

        let new_run = NewRun {
            title: self.config.run_title.clone(),
            is_autotest: true,
            tags: self.config.tags.clone(),
        };
        let run_id = self.create_run(&new_run)?;

        info!(project = %code, %run_id, title = %new_run.title, "created test run");
        self.run_id = Some(run_id);
        Ok(())
    }

    fn suite_begin(&mut self, suite: &Suite) -> ReporterResult<()> {
        self.suites.push(suite.title.clone());
        Ok(())
    }

    fn suite_end(&mut self, suite: &Suite) -> ReporterResult<()> {
        match self.suites.pop() {
            Some(title) if title != suite.title => {
                warn!(expected = %title, got = %suite.title, "suite_end does not match open suite");
            }
            None => warn!(suite = %suite.title, "suite_end without open suite"),
            _ => {}
        }
        Ok(())
    }

    fn test_end(&mut self, test: &TestOutcome) -> ReporterResult<()> {
        let status = classify(test)?;

        if let Err(e) = self.console.test_line(self.suites.len(), status, &test.full_title) {
            warn!(error = %e, "failed to write status line");
        }

        self.total += 1;
        match status {
            ResultStatus::Passed => self.passed += 1,
            ResultStatus::Failed => self.failed += 1,
            ResultStatus::Skipped => self.skipped += 1,
        }

        let stacktrace = match (status, &test.error) {
            (ResultStatus::Failed, Some(err)) => Some(err.stack.clone().unwrap_or_else(|| err.message.clone())),
            _ => None,
        };

        self.results.push(CaseResult {
            case_title: test.full_title.clone(),
            suite_title: self.current_suite(),
            status,
            time_ms: test.duration_ms,
            stacktrace,
        });
        Ok(())
    }

    fn run_end(&mut self) -> ReporterResult<RunSummary> {
        if let Some(summary) = &self.finished {
            debug!("run already finished");
            return Ok(summary.clone());
        }

        if let Err(e) = self.console.summary(self.passed, self.total) {
            warn!(error = %e, "failed to write summary");
        }

        let mut summary = self.summary();

        let Some(run_id) = self.run_id else {
            warn!(count = self.results.len(), "no remote run, results were not uploaded");
            self.finished = Some(summary.clone());
            return Ok(summary);
        };

        let code = self.config.project.clone();
        let results = std::mem::take(&mut self.results);

        let upload = self.block_on(self.api.upload_results(&code, run_id, &results));
        match &upload {
            Ok(()) => info!(%run_id, count = results.len(), "uploaded results"),
            Err(e) => error!(%run_id, error = %e, "failed to upload results"),
        }
        drop(results);
        summary.uploaded = upload.is_ok();

        let completion = self.block_on(self.api.complete_run(&code, run_id));
        self.finished = Some(summary.clone());
        completion?;
        info!(%run_id, "completed test run");

        match upload {
            Err(e) if self.config.fail_on_upload_error => Err(ReporterError::Upload(e)),
            _ => Ok(summary),
        }
    }
}
