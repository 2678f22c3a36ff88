use crate::runner::context::RunContext;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Artifact written when a run aborts before producing a report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FatalReport {
    pub timestamp: DateTime<Utc>,
    pub suite: String,
    pub error: String,
    /// Full error chain, outermost first
    pub context: Vec<String>,
}

impl FatalReport {
    pub fn new(suite: &str, error: &anyhow::Error) -> Self {
        Self {
            timestamp: Utc::now(),
            suite: suite.to_string(),
            error: format!("{:#}", error),
            context: error.chain().map(|cause| cause.to_string()).collect(),
        }
    }
}

/// Write `<suite>_fatal_error_<run-id>.json` and return its path
pub fn write_fatal_report(ctx: &RunContext, error: &anyhow::Error) -> Result<PathBuf> {
    let report = FatalReport::new(ctx.suite(), error);
    let path = ctx.artifact_path("fatal_error", "json");
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write error report {}", path.display()))?;
    log::error!("{} run aborted: {}", ctx.suite(), report.error);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_fatal_report_keeps_error_chain() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new("mobile", dir.path()).unwrap();
        let error = anyhow!("connection refused").context("Failed to reach Appium server");

        let path = write_fatal_report(&ctx, &error).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, format!("mobile_fatal_error_{}.json", ctx.run_id()));

        let report: FatalReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report.suite, "mobile");
        assert_eq!(
            report.error,
            "Failed to reach Appium server: connection refused"
        );
        assert_eq!(
            report.context,
            vec![
                "Failed to reach Appium server".to_string(),
                "connection refused".to_string()
            ]
        );
    }
}
