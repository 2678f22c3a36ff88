pub mod console;
pub mod csv;
pub mod fatal;
pub mod json;
pub mod junit;
pub mod types;

use crate::runner::context::RunContext;
use crate::runner::state::RunSummary;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use types::ReportDocument;

/// Locations of the reports written for one completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
    pub junit: PathBuf,
}

/// Write the JSON, CSV and JUnit reports under run-unique names.
///
/// All three are rendered before any file is touched; if one write fails the
/// reports already written are removed, so a run never leaves a partial set.
pub fn write_reports(summary: &RunSummary, ctx: &RunContext) -> Result<ReportPaths> {
    let paths = ReportPaths {
        json: ctx.artifact_path("test_report", "json"),
        csv: ctx.artifact_path("test_results", "csv"),
        junit: ctx.artifact_path("junit", "xml"),
    };

    let document = ReportDocument::from(summary).with_run_id(ctx.run_id());
    let json = json::render_document(&document)?;
    let csv = csv::render(summary)?;
    let junit = junit::generate_junit_xml(summary, ctx.run_id())?;

    write_all(&[
        (paths.json.as_path(), json.as_str()),
        (paths.csv.as_path(), csv.as_str()),
        (paths.junit.as_path(), junit.as_str()),
    ])?;

    log::info!(
        "reports written: {}, {}, {}",
        paths.json.display(),
        paths.csv.display(),
        paths.junit.display()
    );
    Ok(paths)
}

fn write_all(files: &[(&Path, &str)]) -> Result<()> {
    for (i, (path, contents)) in files.iter().enumerate() {
        if let Err(e) = std::fs::write(path, contents) {
            for (written, _) in &files[..i] {
                if let Err(cleanup) = std::fs::remove_file(written) {
                    log::warn!("could not remove {}: {}", written.display(), cleanup);
                }
            }
            return Err(e).with_context(|| format!("Failed to write report {}", path.display()));
        }
    }
    Ok(())
}

/// Re-render a saved JSON report in another format
pub fn generate_report(results_path: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let document = json::load_document(results_path)?;
    let run_id = document.run_id.clone();
    let summary = document.into_summary();

    let rendered = match format {
        "json" => json::render_document(&ReportDocument {
            run_id: run_id.clone(),
            ..ReportDocument::from(&summary)
        })?,
        "csv" => csv::render(&summary)?,
        "junit" => {
            // Reports saved before run ids were recorded fall back to the start time
            let id = run_id.unwrap_or_else(|| {
                summary
                    .executed_at()
                    .format("%Y%m%d_%H%M%S_%3f")
                    .to_string()
            });
            junit::generate_junit_xml(&summary, &id)?
        }
        "console" => {
            console::print_summary(&summary);
            return Ok(());
        }
        _ => anyhow::bail!("Unknown format: {}", format),
    };

    if let Some(path) = output {
        std::fs::write(path, rendered)?;
        println!("Report saved to: {}", path.display());
    } else {
        println!("{}", rendered);
    }

    Ok(())
}
