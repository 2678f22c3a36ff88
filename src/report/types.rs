use crate::runner::state::{RunSummary, TestCaseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// On-disk shape of a run report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub suite: String,
    /// Run id shared with the CSV and JUnit reports of the same run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub execution_time: DateTime<Utc>,
    pub summary: ReportSummary,
    pub results: Vec<TestCaseResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub pass_rate: f64,
}

impl From<&RunSummary> for ReportDocument {
    fn from(summary: &RunSummary) -> Self {
        Self {
            suite: summary.suite().to_string(),
            run_id: None,
            execution_time: summary.executed_at(),
            summary: ReportSummary {
                total: summary.total(),
                passed: summary.passed(),
                failed: summary.failed(),
                pass_rate: summary.pass_rate(),
            },
            results: summary.results().to_vec(),
        }
    }
}

impl ReportDocument {
    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = Some(run_id.to_string());
        self
    }

    /// Rebuild the summary from the stored results; stored counts are not trusted
    pub fn into_summary(self) -> RunSummary {
        RunSummary::new(&self.suite, self.execution_time, self.results)
    }
}
