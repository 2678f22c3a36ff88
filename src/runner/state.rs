use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of a single test case
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Pass,
    Fail,
}

impl TestStatus {
    pub fn from_bool(passed: bool) -> Self {
        if passed {
            TestStatus::Pass
        } else {
            TestStatus::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, TestStatus::Pass)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result record for one executed test case
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub expected: String,
    pub actual: String,
    pub status: TestStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Map<String, Value>>,
}

/// Aggregate over all results of one run.
///
/// Counts are derived once in [`RunSummary::new`]; the value is read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    suite: String,
    executed_at: DateTime<Utc>,
    total: u32,
    passed: u32,
    failed: u32,
    pass_rate: f64,
    results: Vec<TestCaseResult>,
}

impl RunSummary {
    pub fn new(suite: &str, executed_at: DateTime<Utc>, results: Vec<TestCaseResult>) -> Self {
        let (passed, failed) = results
            .iter()
            .fold((0u32, 0u32), |(p, f), r| match r.status {
                TestStatus::Pass => (p + 1, f),
                TestStatus::Fail => (p, f + 1),
            });
        let total = passed + failed;

        Self {
            suite: suite.to_string(),
            executed_at,
            total,
            passed,
            failed,
            pass_rate: pass_rate(passed, total),
            results,
        }
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn executed_at(&self) -> DateTime<Utc> {
        self.executed_at
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn passed(&self) -> u32 {
        self.passed
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// Percentage of passed cases, rounded to one decimal. `0.0` for an empty run.
    pub fn pass_rate(&self) -> f64 {
        self.pass_rate
    }

    pub fn results(&self) -> &[TestCaseResult] {
        &self.results
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

fn pass_rate(passed: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (passed as f64 / total as f64 * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, status: TestStatus) -> TestCaseResult {
        TestCaseResult {
            name: name.to_string(),
            group: None,
            expected: "expected".to_string(),
            actual: "actual".to_string(),
            status,
            timestamp: Utc::now(),
            duration_ms: 0,
            attachments: vec![],
            detail: None,
        }
    }

    #[test]
    fn test_counts_add_up() {
        let summary = RunSummary::new(
            "api",
            Utc::now(),
            vec![
                result("a", TestStatus::Pass),
                result("b", TestStatus::Fail),
                result("c", TestStatus::Pass),
            ],
        );
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.passed(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.total(), summary.passed() + summary.failed());
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_pass_rate_rounding() {
        assert_eq!(pass_rate(11, 12), 91.7);
        assert_eq!(pass_rate(2, 3), 66.7);
        assert_eq!(pass_rate(1, 3), 33.3);
        assert_eq!(pass_rate(3, 3), 100.0);
    }

    #[test]
    fn test_empty_run_has_zero_pass_rate() {
        let summary = RunSummary::new("web", Utc::now(), vec![]);
        assert_eq!(summary.total(), 0);
        assert_eq!(summary.pass_rate(), 0.0);
        assert!(summary.pass_rate().is_finite());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&TestStatus::Pass).unwrap(), "\"PASS\"");
        assert_eq!(serde_json::to_string(&TestStatus::Fail).unwrap(), "\"FAIL\"");
        let parsed: TestStatus = serde_json::from_str("\"FAIL\"").unwrap();
        assert_eq!(parsed, TestStatus::Fail);
        assert!(serde_json::from_str::<TestStatus>("\"SKIPPED\"").is_err());
    }

    #[test]
    fn test_absent_detail_is_omitted() {
        let json = serde_json::to_value(result("a", TestStatus::Pass)).unwrap();
        assert!(json.get("detail").is_none());
        assert!(json.get("group").is_none());
        assert_eq!(json["attachments"], serde_json::json!([]));
    }
}
