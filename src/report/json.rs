use super::types::ReportDocument;
use crate::runner::state::RunSummary;
use anyhow::{Context, Result};
use std::path::Path;

/// Render the pretty-printed JSON report
pub fn render(summary: &RunSummary) -> Result<String> {
    render_document(&ReportDocument::from(summary))
}

pub fn render_document(document: &ReportDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Parse a JSON report back into a summary
pub fn parse(text: &str) -> Result<RunSummary> {
    Ok(parse_document(text)?.into_summary())
}

pub fn parse_document(text: &str) -> Result<ReportDocument> {
    serde_json::from_str(text).context("Failed to parse JSON report")
}

/// Read a saved report, keeping its run id
pub fn load_document(path: &Path) -> Result<ReportDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    parse_document(&text)
}

pub fn load(path: &Path) -> Result<RunSummary> {
    Ok(load_document(path)?.into_summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::{TestCaseResult, TestStatus};
    use chrono::Utc;
    use serde_json::{json, Value};

    fn summary() -> RunSummary {
        let mut detail = serde_json::Map::new();
        detail.insert("userId".to_string(), json!(1));
        RunSummary::new(
            "api",
            Utc::now(),
            vec![
                TestCaseResult {
                    name: "GET /posts/1".to_string(),
                    group: Some("Positive".to_string()),
                    expected: "Status 200".to_string(),
                    actual: "Status 200, ID: 1".to_string(),
                    status: TestStatus::Pass,
                    timestamp: Utc::now(),
                    duration_ms: 42,
                    attachments: vec![],
                    detail: Some(detail),
                },
                TestCaseResult {
                    name: "GET /posts/99999".to_string(),
                    group: Some("Negative".to_string()),
                    expected: "Status 404".to_string(),
                    actual: "Error: Network error: timed out".to_string(),
                    status: TestStatus::Fail,
                    timestamp: Utc::now(),
                    duration_ms: 30000,
                    attachments: vec!["shots/01.png".to_string()],
                    detail: None,
                },
            ],
        )
    }

    #[test]
    fn test_report_shape() {
        let value: Value = serde_json::from_str(&render(&summary()).unwrap()).unwrap();
        assert_eq!(value["suite"], "api");
        assert!(value["executionTime"].is_string());
        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["summary"]["passed"], 1);
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["summary"]["passRate"], 50.0);
        assert_eq!(value["results"][0]["status"], "PASS");
        assert_eq!(value["results"][0]["detail"]["userId"], 1);
        assert_eq!(value["results"][0]["durationMs"], 42);
        assert!(value["results"][1].get("detail").is_none());
    }

    #[test]
    fn test_render_parse_render_is_stable() {
        let original = summary();
        let first = render(&original).unwrap();
        let reparsed = parse(&first).unwrap();
        assert_eq!(reparsed, original);
        assert_eq!(render(&reparsed).unwrap(), first);
    }

    #[test]
    fn test_run_id_survives_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let document = ReportDocument::from(&summary()).with_run_id("20261019_101500_042_a1b2c3d4");
        std::fs::write(&path, render_document(&document).unwrap()).unwrap();

        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["runId"], "20261019_101500_042_a1b2c3d4");

        let loaded = load_document(&path).unwrap();
        assert_eq!(loaded.run_id.as_deref(), Some("20261019_101500_042_a1b2c3d4"));
        let summary = load(&path).unwrap();
        assert_eq!(summary.total(), 2);
        assert_eq!(summary.results()[1].attachments, vec!["shots/01.png".to_string()]);
    }

    #[test]
    fn test_empty_run_renders_valid_json() {
        let empty = RunSummary::new("api", Utc::now(), vec![]);
        let value: Value = serde_json::from_str(&render(&empty).unwrap()).unwrap();
        assert_eq!(value["summary"]["total"], 0);
        assert_eq!(value["summary"]["passRate"], 0.0);
        assert_eq!(value["results"], json!([]));
        assert!(value.get("runId").is_none());
        assert_eq!(parse(&render(&empty).unwrap()).unwrap(), empty);
    }
}
