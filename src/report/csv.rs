use crate::runner::state::RunSummary;
use anyhow::{Context, Result};

pub const HEADER: &str = "Test Case,Expected Result,Actual Result,Status";

/// Render the CSV report.
///
/// The header row is written bare; every data field is quoted and commas in
/// free-text fields are replaced with `;`.
pub fn render(summary: &RunSummary) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for result in summary.results() {
        writer.write_record([
            sanitize(&result.name),
            sanitize(&result.expected),
            sanitize(&result.actual),
            result.status.as_str().to_string(),
        ])?;
    }

    let rows = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e))?;
    let rows = String::from_utf8(rows).context("CSV output was not UTF-8")?;

    Ok(format!("{}\n{}", HEADER, rows))
}

fn sanitize(field: &str) -> String {
    field.replace(',', ";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::{TestCaseResult, TestStatus};
    use chrono::Utc;

    fn result(name: &str, expected: &str, actual: &str, status: TestStatus) -> TestCaseResult {
        TestCaseResult {
            name: name.to_string(),
            group: None,
            expected: expected.to_string(),
            actual: actual.to_string(),
            status,
            timestamp: Utc::now(),
            duration_ms: 0,
            attachments: vec![],
            detail: None,
        }
    }

    #[test]
    fn test_commas_are_replaced() {
        let summary = RunSummary::new(
            "api",
            Utc::now(),
            vec![result(
                "POST /posts",
                "Status 201, ID present",
                "Status 201, ID: 101",
                TestStatus::Pass,
            )],
        );

        let csv = render(&summary).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(HEADER));
        assert_eq!(
            lines.next(),
            Some("\"POST /posts\",\"Status 201; ID present\",\"Status 201; ID: 101\",\"PASS\"")
        );
        assert_eq!(lines.next(), None);
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn test_every_row_has_four_columns() {
        let summary = RunSummary::new(
            "web",
            Utc::now(),
            vec![
                result("a, b", "x,y,z", "\"quoted\", text", TestStatus::Fail),
                result("plain", "", "", TestStatus::Pass),
            ],
        );

        let csv = render(&summary).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        assert_eq!(reader.headers().unwrap().len(), 4);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.len(), 4);
        }
        assert_eq!(&rows[0][0], "a; b");
        assert_eq!(&rows[0][2], "\"quoted\"; text");
        assert_eq!(&rows[0][3], "FAIL");
    }

    #[test]
    fn test_empty_run_is_header_only() {
        let summary = RunSummary::new("mobile", Utc::now(), vec![]);
        assert_eq!(render(&summary).unwrap(), format!("{}\n", HEADER));
    }
}
