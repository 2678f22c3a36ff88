pub mod context;
pub mod events;
pub mod executor;
pub mod state;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::broadcast;

use crate::driver::traits::Session;
use crate::report::{self, ReportPaths};

pub use context::*;
pub use events::*;
pub use executor::*;
pub use state::*;

/// Owns the ordered cases of one suite and runs them one at a time
pub struct SuiteRunner<D: ?Sized> {
    suite: String,
    cases: Vec<TestCase<D>>,
    current_group: Option<String>,
    emitter: EventEmitter,
    on_failure: Option<FailureHook<D>>,
}

impl<D: ?Sized + Sync> SuiteRunner<D> {
    pub fn new(suite: &str) -> Self {
        Self {
            suite: suite.to_string(),
            cases: Vec::new(),
            current_group: None,
            emitter: EventEmitter::default(),
            on_failure: None,
        }
    }

    /// Start a named group; cases added afterwards belong to it
    pub fn group(mut self, name: &str) -> Self {
        self.current_group = Some(name.to_string());
        self
    }

    pub fn case(mut self, mut case: TestCase<D>) -> Self {
        if case.group.is_none() {
            case.group = self.current_group.clone();
        }
        self.cases.push(case);
        self
    }

    pub fn cases(self, cases: impl IntoIterator<Item = TestCase<D>>) -> Self {
        cases.into_iter().fold(self, |runner, case| runner.case(case))
    }

    /// Register a hook that runs for every case recorded as FAIL
    pub fn on_failure<F>(mut self, hook: F) -> Self
    where
        F: for<'a> Fn(&'a D, &'a str, &'a mut CaseRecord) -> BoxFuture<'a, Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.on_failure = Some(Box::new(hook));
        self
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn case_names(&self) -> Vec<&str> {
        self.cases.iter().map(|c| c.name.as_str()).collect()
    }

    /// Subscribe to run events
    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.emitter.subscribe()
    }

    /// Execute every case in declaration order.
    ///
    /// Case N+1 starts only after case N has fully returned. A failing case
    /// never stops the run; the result list always has one entry per case.
    pub async fn run(self, driver: &D) -> RunSummary {
        self.run_from(driver, Utc::now()).await
    }

    /// Same as [`SuiteRunner::run`], stamping the summary with a known start time
    pub async fn run_from(self, driver: &D, executed_at: DateTime<Utc>) -> RunSummary {
        self.emitter.emit(TestEvent::RunStarted {
            suite: self.suite.clone(),
            case_count: self.cases.len(),
        });

        let mut results = Vec::with_capacity(self.cases.len());
        let mut group: Option<&str> = None;

        for (index, case) in self.cases.iter().enumerate() {
            if case.group() != group {
                group = case.group();
                if let Some(name) = group {
                    self.emitter.emit(TestEvent::GroupStarted {
                        name: name.to_string(),
                    });
                }
            }

            self.emitter.emit(TestEvent::CaseStarted {
                index,
                name: case.name.clone(),
            });

            let result = execute_case(driver, case, self.on_failure.as_ref(), Some(&self.emitter)).await;

            self.emitter.emit(TestEvent::CaseFinished {
                index,
                name: result.name.clone(),
                status: result.status,
                actual: result.actual.clone(),
                duration_ms: result.duration_ms,
            });

            results.push(result);
        }

        let summary = RunSummary::new(&self.suite, executed_at, results);
        self.emitter.emit(TestEvent::RunFinished {
            summary: summary.clone(),
        });
        summary
    }
}

/// Run an ordered list of cases against `driver` and summarize the results
pub async fn run_suite<D: ?Sized + Sync>(
    suite: &str,
    driver: &D,
    cases: Vec<TestCase<D>>,
) -> RunSummary {
    SuiteRunner::new(suite).cases(cases).run(driver).await
}

/// How a full run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// All cases executed and the reports were written
    Completed {
        summary: RunSummary,
        reports: ReportPaths,
    },
    /// The run could not proceed; only the fatal-error artifact was written
    Aborted {
        error: anyhow::Error,
        error_report: PathBuf,
    },
}

impl RunOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, RunOutcome::Aborted { .. })
    }
}

/// Acquire the driver, run the suite, release the driver and write reports.
///
/// A setup failure or a report-writing failure aborts the run and writes a
/// fatal-error artifact instead of a report. The returned error is reserved
/// for the case where even that artifact cannot be written.
pub async fn execute_run<D, S>(
    ctx: &RunContext,
    setup: S,
    runner: SuiteRunner<D>,
) -> Result<RunOutcome>
where
    D: Session + ?Sized,
    S: Future<Output = Result<Box<D>>>,
{
    let driver = match setup.await {
        Ok(driver) => driver,
        Err(error) => return abort(ctx, error),
    };

    let summary = runner.run_from(&*driver, ctx.started_at()).await;

    if let Err(e) = driver.close().await {
        log::warn!("failed to release {} session: {:#}", ctx.suite(), e);
    }

    match report::write_reports(&summary, ctx) {
        Ok(reports) => Ok(RunOutcome::Completed { summary, reports }),
        Err(error) => abort(ctx, error.context("Failed to write reports")),
    }
}

fn abort(ctx: &RunContext, error: anyhow::Error) -> Result<RunOutcome> {
    let error_report = report::fatal::write_fatal_report(ctx, &error)?;
    Ok(RunOutcome::Aborted {
        error,
        error_report,
    })
}
