use crate::runner::state::{RunSummary, TestStatus};
use colored::Colorize;
use std::fmt::Write;

/// Render the end-of-run summary as plain text
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Total Tests: {}", summary.total());
    let _ = writeln!(out, "Passed: {}", summary.passed());
    let _ = writeln!(out, "Failed: {}", summary.failed());
    let _ = writeln!(out, "Pass Rate: {:.1}%", summary.pass_rate());

    for (index, result) in summary.results().iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}. {}", index + 1, result.name);
        let _ = writeln!(out, "   Expected: {}", result.expected);
        let _ = writeln!(out, "   Actual:   {}", result.actual);
        let _ = writeln!(out, "   Status:   {}", result.status);
        if let Some(detail) = &result.detail {
            let compact = serde_json::to_string(detail).unwrap_or_default();
            let _ = writeln!(out, "   Detail:   {}", compact);
        }
        for attachment in &result.attachments {
            let _ = writeln!(out, "   Screenshot: {}", attachment);
        }
    }

    out
}

/// Print the summary with a banner and colored status lines
pub fn print_summary(summary: &RunSummary) {
    println!("\n{}", "=".repeat(60));
    println!(
        "  {} {}",
        "TEST SUMMARY".bold(),
        format!("({})", summary.suite()).dimmed()
    );
    println!("{}", "=".repeat(60));

    for line in render_summary(summary).lines() {
        if line.ends_with(TestStatus::Fail.as_str()) {
            println!("{}", line.red());
        } else if line.ends_with(TestStatus::Pass.as_str()) {
            println!("{}", line.green());
        } else {
            println!("{}", line);
        }
    }

    let verdict = if summary.all_passed() {
        "ALL TESTS PASSED".green().bold()
    } else {
        format!("{} TEST(S) FAILED", summary.failed()).red().bold()
    };
    println!("{}\n  {}\n{}", "=".repeat(60), verdict, "=".repeat(60));
}
