use crate::runner::context::slugify;
use crate::runner::state::{RunSummary, TestCaseResult};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

/// Generate JUnit XML report string from a run summary
pub fn generate_junit_xml(summary: &RunSummary, run_id: &str) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let total_tests = summary.total().to_string();
    let failures = summary.failed().to_string();
    let total_duration: u64 = summary.results().iter().map(|r| r.duration_ms).sum();
    let time = seconds(total_duration);

    // <testsuites>
    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "lumi-qa"));
    suites_start.push_attribute(("tests", total_tests.as_str()));
    suites_start.push_attribute(("failures", failures.as_str()));
    suites_start.push_attribute(("time", time.as_str()));
    writer.write_event(Event::Start(suites_start))?;

    // One <testsuite> per run
    let timestamp = summary.executed_at().to_rfc3339();
    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", summary.suite()));
    suite_start.push_attribute(("tests", total_tests.as_str()));
    suite_start.push_attribute(("failures", failures.as_str()));
    suite_start.push_attribute(("skipped", "0"));
    suite_start.push_attribute(("id", run_id));
    suite_start.push_attribute(("time", time.as_str()));
    suite_start.push_attribute(("timestamp", timestamp.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    for result in summary.results() {
        write_test_case(&mut writer, summary.suite(), result)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    suite: &str,
    result: &TestCaseResult,
) -> Result<()> {
    let classname = match &result.group {
        Some(group) => format!("{}.{}", suite, slugify(group)),
        None => suite.to_string(),
    };
    let time = seconds(result.duration_ms);

    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", result.name.as_str()));
    case_start.push_attribute(("classname", classname.as_str()));
    case_start.push_attribute(("time", time.as_str()));
    writer.write_event(Event::Start(case_start))?;

    if !result.status.is_pass() {
        let mut fail_start = BytesStart::new("failure");
        fail_start.push_attribute(("message", result.actual.as_str()));
        fail_start.push_attribute(("type", "AssertionError"));
        writer.write_event(Event::Start(fail_start))?;
        let body = format!("expected: {}\nactual: {}", result.expected, result.actual);
        writer.write_event(Event::Text(BytesText::new(&body)))?;
        writer.write_event(Event::End(BytesEnd::new("failure")))?;
    }

    if !result.attachments.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("system-out")))?;
        let lines: Vec<String> = result
            .attachments
            .iter()
            .map(|a| format!("[[ATTACHMENT|{}]]", a))
            .collect();
        writer.write_event(Event::Text(BytesText::new(&lines.join("\n"))))?;
        writer.write_event(Event::End(BytesEnd::new("system-out")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

fn seconds(ms: u64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::TestStatus;
    use chrono::Utc;

    #[test]
    fn test_generate_junit_xml() {
        let summary = RunSummary::new(
            "mobile",
            Utc::now(),
            vec![
                TestCaseResult {
                    name: "Login Flow".to_string(),
                    group: Some("Login Flow".to_string()),
                    expected: "Login succeeds".to_string(),
                    actual: "Success message shown".to_string(),
                    status: TestStatus::Pass,
                    timestamp: Utc::now(),
                    duration_ms: 1500,
                    attachments: vec!["shots/01_login.png".to_string()],
                    detail: None,
                },
                TestCaseResult {
                    name: "Swipe Test".to_string(),
                    group: None,
                    expected: "Cards change".to_string(),
                    actual: "Error: Element not found: ~Swipe".to_string(),
                    status: TestStatus::Fail,
                    timestamp: Utc::now(),
                    duration_ms: 2000,
                    attachments: vec![],
                    detail: None,
                },
            ],
        );

        let xml = generate_junit_xml(&summary, "20240101_120000_000_abcd1234")
            .expect("Failed to generate XML");

        assert!(xml.contains(r#"<testsuites name="lumi-qa""#));
        assert!(xml.contains(r#"tests="2""#));
        assert!(xml.contains(r#"failures="1""#));
        assert!(xml.contains(r#"time="3.500""#));
        assert!(xml.contains(r#"<testcase name="Login Flow" classname="mobile.login_flow""#));
        assert!(xml.contains(r#"message="Error: Element not found: ~Swipe""#));
        assert!(xml.contains("[[ATTACHMENT|shots/01_login.png]]"));
    }
}
