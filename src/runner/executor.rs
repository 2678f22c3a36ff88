use anyhow::Result;
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use super::events::{EventEmitter, TestEvent};
use super::state::{TestCaseResult, TestStatus};

/// Longest `actual` text kept for a failed case
pub const MAX_ERROR_LEN: usize = 300;

/// Async action of one test case. Receives the run's driver and a record to
/// which it may attach screenshots and detail while it executes.
pub type CaseAction<D> =
    Box<dyn for<'a> Fn(&'a D, &'a mut CaseRecord) -> BoxFuture<'a, Result<Verdict>> + Send + Sync>;

/// Hook invoked after a case records FAIL, before its result is appended
pub type FailureHook<D> = Box<
    dyn for<'a> Fn(&'a D, &'a str, &'a mut CaseRecord) -> BoxFuture<'a, Result<()>> + Send + Sync,
>;

/// A named test case with its success condition fixed at registration time
pub struct TestCase<D: ?Sized> {
    pub name: String,
    pub expected: String,
    pub(crate) group: Option<String>,
    action: CaseAction<D>,
}

impl<D: ?Sized> TestCase<D> {
    pub fn new<F>(name: &str, expected: &str, action: F) -> Self
    where
        F: for<'a> Fn(&'a D, &'a mut CaseRecord) -> BoxFuture<'a, Result<Verdict>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.to_string(),
            expected: expected.to_string(),
            group: None,
            action: Box::new(action),
        }
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

/// Decision of a case action after comparing what it observed
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub status: TestStatus,
    pub actual: String,
}

impl Verdict {
    pub fn pass(actual: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Pass,
            actual: actual.into(),
        }
    }

    pub fn fail(actual: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Fail,
            actual: actual.into(),
        }
    }

    /// PASS when `passed` holds, FAIL otherwise; `actual` is kept either way
    pub fn check(passed: bool, actual: impl Into<String>) -> Self {
        Self {
            status: TestStatus::from_bool(passed),
            actual: actual.into(),
        }
    }
}

/// Scratch data a case collects while running
#[derive(Debug, Default)]
pub struct CaseRecord {
    attachments: Vec<String>,
    detail: Option<Map<String, Value>>,
    events: Option<EventEmitter>,
}

impl CaseRecord {
    /// Record whose progress lines go to the run's listeners
    pub fn with_events(emitter: EventEmitter) -> Self {
        Self {
            events: Some(emitter),
            ..Self::default()
        }
    }

    /// Report a progress line while the case is running
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("{}", message);
        if let Some(events) = &self.events {
            events.emit(TestEvent::Log { message });
        }
    }

    pub fn attach(&mut self, reference: impl Into<String>) {
        self.attachments.push(reference.into());
    }

    pub fn attachments(&self) -> &[String] {
        &self.attachments
    }

    /// Set one detail field, creating the detail object on first use
    pub fn detail(&mut self, key: &str, value: Value) {
        self.detail
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value);
    }

    /// Append to an array-valued detail field
    pub fn push_detail(&mut self, key: &str, value: Value) {
        let detail = self.detail.get_or_insert_with(Map::new);
        match detail.get_mut(key) {
            Some(Value::Array(items)) => items.push(value),
            _ => {
                detail.insert(key.to_string(), Value::Array(vec![value]));
            }
        }
    }

    pub fn detail_value(&self, key: &str) -> Option<&Value> {
        self.detail.as_ref().and_then(|d| d.get(key))
    }
}

/// Run one case to completion.
///
/// Errors and panics raised by the action or the failure hook are converted
/// into a FAIL result; nothing escapes to the caller.
pub async fn execute_case<D: ?Sized + Sync>(
    driver: &D,
    case: &TestCase<D>,
    on_failure: Option<&FailureHook<D>>,
    events: Option<&EventEmitter>,
) -> TestCaseResult {
    let timestamp = Utc::now();
    let clock = Instant::now();
    let mut record = match events {
        Some(emitter) => CaseRecord::with_events(emitter.clone()),
        None => CaseRecord::default(),
    };

    let outcome = AssertUnwindSafe((case.action)(driver, &mut record))
        .catch_unwind()
        .await;

    let verdict = match outcome {
        Ok(Ok(verdict)) => verdict,
        Ok(Err(e)) => Verdict::fail(error_actual(&format!("{:#}", e))),
        Err(panic) => Verdict::fail(error_actual(&format!(
            "panicked: {}",
            panic_message(panic.as_ref())
        ))),
    };

    if !verdict.status.is_pass() {
        if let Some(hook) = on_failure {
            match AssertUnwindSafe(hook(driver, &case.name, &mut record))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("failure hook for '{}' failed: {:#}", case.name, e),
                Err(panic) => log::warn!(
                    "failure hook for '{}' panicked: {}",
                    case.name,
                    panic_message(panic.as_ref())
                ),
            }
        }
    }

    TestCaseResult {
        name: case.name.clone(),
        group: case.group.clone(),
        expected: case.expected.clone(),
        actual: verdict.actual,
        status: verdict.status,
        timestamp,
        duration_ms: clock.elapsed().as_millis() as u64,
        attachments: record.attachments,
        detail: record.detail,
    }
}

fn error_actual(message: &str) -> String {
    truncate(&format!("Error: {}", message), MAX_ERROR_LEN)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `...`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
