//! Adapter for the libtest JSON event stream
//!
//! Turns the output of `cargo test -- -Z unstable-options --format json`
//! into [`HostEvent`]s. Module paths become nested suites. Output from
//! several test binaries is folded into one run.

use std::collections::VecDeque;
use std::io::{BufRead, Lines};

use serde::Deserialize;
use tracing::debug;

use super::{HostEvent, Suite, TestError, TestOutcome};
use crate::error::{ReporterError, ReporterResult};

/// One line of libtest JSON output
#[derive(Debug, Clone, Deserialize)]
pub struct LibtestLine {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Seconds
    #[serde(default)]
    pub exec_time: Option<f64>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Stateful libtest-to-host translation
#[derive(Debug, Default)]
pub struct LibtestTranslator {
    started: bool,
    open_suites: Vec<String>,
}

impl LibtestTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one libtest line into zero or more host events.
    pub fn translate(&mut self, line: LibtestLine) -> Vec<HostEvent> {
        let mut events = Vec::new();

        match (line.kind.as_str(), line.event.as_deref()) {
            ("suite", Some("started")) => {
                if !self.started {
                    self.started = true;
                    events.push(HostEvent::RunBegin);
                }
            }
            ("suite", Some("ok")) | ("suite", Some("failed")) => {
                self.close_suites(0, &mut events);
            }
            ("test", Some(event @ ("ok" | "failed" | "ignored"))) => {
                let Some(name) = line.name.clone() else {
                    debug!(event, "libtest test event without a name");
                    return events;
                };
                if !self.started {
                    self.started = true;
                    events.push(HostEvent::RunBegin);
                }
                let (suites, title) = split_path(&name);
                self.enter_suites(&suites, &mut events);
                events.push(HostEvent::TestEnd(outcome(event, &name, title, &line)));
            }
            (kind, event) => {
                debug!(kind, ?event, "ignoring libtest event");
            }
        }

        events
    }

    /// Close whatever is still open at the end of the stream.
    pub fn finish(&mut self) -> Vec<HostEvent> {
        let mut events = Vec::new();
        self.close_suites(0, &mut events);
        if self.started {
            self.started = false;
            events.push(HostEvent::RunEnd);
        }
        events
    }

    fn enter_suites(&mut self, suites: &[&str], events: &mut Vec<HostEvent>) {
        let common = self
            .open_suites
            .iter()
            .zip(suites)
            .take_while(|(open, next)| open.as_str() == **next)
            .count();
        self.close_suites(common, events);
        for suite in &suites[common..] {
            self.open_suites.push(suite.to_string());
            events.push(HostEvent::SuiteBegin(Suite::new(*suite)));
        }
    }

    fn close_suites(&mut self, keep: usize, events: &mut Vec<HostEvent>) {
        while self.open_suites.len() > keep {
            if let Some(title) = self.open_suites.pop() {
                events.push(HostEvent::SuiteEnd(Suite::new(title)));
            }
        }
    }
}

fn split_path(name: &str) -> (Vec<&str>, &str) {
    let mut parts: Vec<&str> = name.split("::").collect();
    let title = parts.pop().unwrap_or(name);
    (parts, title)
}

fn outcome(event: &str, name: &str, title: &str, line: &LibtestLine) -> TestOutcome {
    let (state, pending) = match event {
        "ok" => (Some("passed".to_string()), false),
        "failed" => (Some("failed".to_string()), false),
        _ => (None, true),
    };

    let error = (event == "failed").then(|| TestError {
        message: line
            .message
            .clone()
            .unwrap_or_else(|| "test failed".to_string()),
        stack: line.stdout.clone().filter(|s| !s.is_empty()),
    });

    TestOutcome {
        title: title.to_string(),
        full_title: name.to_string(),
        duration_ms: line.exec_time.map(|secs| (secs * 1000.0).round() as u64),
        state,
        pending,
        error,
    }
}

/// Iterator over host events decoded from libtest output.
///
/// Lines that are not JSON objects (cargo chatter, stray prints) are skipped.
pub struct LibtestEvents<R> {
    lines: std::iter::Enumerate<Lines<R>>,
    translator: LibtestTranslator,
    pending: VecDeque<HostEvent>,
    done: bool,
}

impl<R: BufRead> Iterator for LibtestEvents<R> {
    type Item = ReporterResult<HostEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }

            match self.lines.next() {
                Some((idx, Ok(raw))) => {
                    let raw = raw.trim();
                    if !raw.starts_with('{') {
                        continue;
                    }
                    match serde_json::from_str::<LibtestLine>(raw) {
                        Ok(line) => self.pending.extend(self.translator.translate(line)),
                        Err(e) => {
                            return Some(Err(ReporterError::Event {
                                line: idx + 1,
                                message: e.to_string(),
                            }))
                        }
                    }
                }
                Some((_, Err(e))) => return Some(Err(ReporterError::Io(e))),
                None => {
                    self.done = true;
                    self.pending.extend(self.translator.finish());
                }
            }
        }
    }
}

pub fn read_libtest_events<R: BufRead>(reader: R) -> LibtestEvents<R> {
    LibtestEvents {
        lines: reader.lines().enumerate(),
        translator: LibtestTranslator::new(),
        pending: VecDeque::new(),
        done: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const OUTPUT: &str = r#"
running 4 tests
{ "type": "suite", "event": "started", "test_count": 4 }
{ "type": "test", "event": "started", "name": "math::adds" }
{ "type": "test", "name": "math::adds", "event": "ok", "exec_time": 0.0021 }
{ "type": "test", "name": "math::div::by_zero", "event": "failed", "exec_time": 0.004, "stdout": "thread panicked at 'attempt to divide by zero'\n" }
{ "type": "test", "name": "math::div::slow", "event": "ignored" }
{ "type": "test", "name": "top_level", "event": "ok" }
{ "type": "suite", "event": "failed", "passed": 2, "failed": 1, "ignored": 1 }
"#;

    fn events(input: &str) -> Vec<HostEvent> {
        read_libtest_events(Cursor::new(input))
            .collect::<ReporterResult<_>>()
            .unwrap()
    }

    fn shape(events: &[HostEvent]) -> Vec<String> {
        events
            .iter()
            .map(|e| match e {
                HostEvent::RunBegin => "run_begin".to_string(),
                HostEvent::SuiteBegin(s) => format!("+{}", s.title),
                HostEvent::SuiteEnd(s) => format!("-{}", s.title),
                HostEvent::TestEnd(t) => format!("test:{}", t.full_title),
                HostEvent::RunEnd => "run_end".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_module_paths_become_suites() {
        let events = events(OUTPUT);
        assert_eq!(
            shape(&events),
            vec![
                "run_begin",
                "+math",
                "test:math::adds",
                "+div",
                "test:math::div::by_zero",
                "test:math::div::slow",
                "-div",
                "-math",
                "test:top_level",
                "run_end",
            ]
        );
    }

    #[test]
    fn test_outcome_mapping() {
        let tests: Vec<TestOutcome> = events(OUTPUT)
            .into_iter()
            .filter_map(|e| match e {
                HostEvent::TestEnd(t) => Some(t),
                _ => None,
            })
            .collect();

        assert_eq!(tests[0].title, "adds");
        assert_eq!(tests[0].state.as_deref(), Some("passed"));
        assert_eq!(tests[0].duration_ms, Some(2));

        assert_eq!(tests[1].state.as_deref(), Some("failed"));
        let error = tests[1].error.as_ref().unwrap();
        assert!(error.stack.as_deref().unwrap().contains("divide by zero"));

        assert!(tests[2].pending);
        assert_eq!(tests[2].state, None);
    }

    #[test]
    fn test_multiple_binaries_fold_into_one_run() {
        let input = r#"
{ "type": "suite", "event": "started", "test_count": 1 }
{ "type": "test", "name": "a::one", "event": "ok" }
{ "type": "suite", "event": "ok", "passed": 1 }
{ "type": "suite", "event": "started", "test_count": 1 }
{ "type": "test", "name": "b::two", "event": "ok" }
{ "type": "suite", "event": "ok", "passed": 1 }
"#;
        assert_eq!(
            shape(&events(input)),
            vec!["run_begin", "+a", "test:a::one", "-a", "+b", "test:b::two", "-b", "run_end"]
        );
    }

    #[test]
    fn test_empty_stream_yields_nothing() {
        assert!(events("no json here\n").is_empty());
    }

    #[test]
    fn test_broken_json_line() {
        let input = "{ \"type\": \"suite\", \"event\": \"started\" }\n{ \"type\": \n";
        let results: Vec<_> = read_libtest_events(Cursor::new(input)).collect();
        assert!(matches!(results[0], Ok(HostEvent::RunBegin)));
        assert!(matches!(results[1], Err(ReporterError::Event { line: 2, .. })));
    }
}
