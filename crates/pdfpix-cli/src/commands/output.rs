//! Reports, summaries and diagnostics printed or written after a run.

use std::fs;
use std::path::Path;
use std::time::Duration;

use console::style;
use tracing::debug;

use pdfpix_core::models::{ImageOutcome, PageReport, RunReport};

use super::options::ExtractOptions;

/// Handle `--diagnostics`, `--report` and `--summary`, then print the
/// closing summary.
pub fn finish(report: &RunReport, options: &ExtractOptions, elapsed: Duration) -> anyhow::Result<()> {
    if options.diagnostics {
        print_diagnostics(report);
    }

    if let Some(path) = &options.report {
        fs::write(path, serde_json::to_string_pretty(report)?)?;
        println!("{} Report written to {}", style("✓").green(), path.display());
    }

    if options.summary {
        let path = report.output_dir.join("summary.csv");
        write_summary(&path, report)?;
        println!("{} Summary written to {}", style("✓").green(), path.display());
    }

    println!();
    println!(
        "{} Processed {} documents in {:?}",
        style("✓").green(),
        report.documents.len() + report.failed.len(),
        elapsed
    );
    println!(
        "   {} images written, {} skipped, {} documents failed",
        style(report.written()).green(),
        style(report.skipped()).yellow(),
        style(report.failed.len()).red()
    );
    println!("   Output: {}", report.output_dir.display());

    if !report.failed.is_empty() {
        println!();
        println!("{}", style("Failed documents:").red());
        for failed in &report.failed {
            println!("  - {}: {}", failed.source.display(), failed.error);
        }
    }

    Ok(())
}

/// One line per page: text presence, position and image count.
fn print_diagnostics(report: &RunReport) {
    for document in &report.documents {
        println!("{}", style(document.source.display()).bold());
        for page in &document.pages {
            println!(
                "  page {:>3}: text={} position={} images={} written={}",
                page.index + 1,
                if page.has_text { "yes" } else { "no" },
                page_position(page),
                page.image_count,
                page.written()
            );
        }
    }
}

fn page_position(page: &PageReport) -> String {
    match &page.heading {
        Some(heading) => heading.to_string(),
        None if page.records.is_empty() => "-".to_string(),
        None => page
            .records
            .iter()
            .map(|r| r.position.to_string())
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Write one CSV row per image, plus one per failed document.
fn write_summary(path: &Path, report: &RunReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "document", "page", "xref", "position", "status", "file", "width", "height", "reason",
    ])?;

    for document in &report.documents {
        let name = document
            .source
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        for record in document.records() {
            let page = (record.page + 1).to_string();
            let xref = record.xref.to_string();
            let position = record.position.to_string();
            match &record.outcome {
                ImageOutcome::Written {
                    path, width, height, ..
                } => wtr.write_record([
                    name,
                    &page,
                    &xref,
                    &position,
                    "written",
                    path.file_name().and_then(|s| s.to_str()).unwrap_or(""),
                    &width.to_string(),
                    &height.to_string(),
                    "",
                ])?,
                ImageOutcome::Skipped { reason } => wtr.write_record([
                    name,
                    &page,
                    &xref,
                    &position,
                    "skipped",
                    "",
                    "",
                    "",
                    &reason.to_string(),
                ])?,
            }
        }
    }

    for failed in &report.failed {
        let name = failed
            .source
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        wtr.write_record([name, "", "", "", "error", "", "", "", &failed.error])?;
    }

    wtr.flush()?;
    debug!("Wrote summary to {}", path.display());
    Ok(())
}
