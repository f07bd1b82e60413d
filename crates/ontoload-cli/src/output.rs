//! Terminal output formatting.

use std::collections::BTreeMap;
use std::path::PathBuf;

use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};

use ontoload_core::IngestError;
use ontoload_graph::{BatchOutcome, GraphCounts, IngestionReport, RowReport};

/// Result of loading one file.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: FileResult,
}

#[derive(Debug)]
pub enum FileResult {
    /// Row-by-row ingestion; rows are 0-based data rows of the file.
    Rows(IngestionReport),
    /// Whole-file batch; a rolled-back index is a 0-based data row.
    Batch(BatchOutcome),
    /// The batch could not be opened or committed.
    BatchFailed(IngestError),
}

impl FileReport {
    pub fn succeeded(&self) -> usize {
        match &self.result {
            FileResult::Rows(report) => report.succeeded(),
            FileResult::Batch(BatchOutcome::Committed { applied }) => *applied,
            FileResult::Batch(BatchOutcome::RolledBack { .. }) | FileResult::BatchFailed(_) => 0,
        }
    }

    pub fn failed(&self) -> usize {
        match &self.result {
            FileResult::Rows(report) => report.failed(),
            FileResult::Batch(BatchOutcome::Committed { .. }) => 0,
            FileResult::Batch(BatchOutcome::RolledBack { .. }) | FileResult::BatchFailed(_) => 1,
        }
    }

    fn failures(&self) -> Vec<(Option<usize>, &IngestError)> {
        match &self.result {
            FileResult::Rows(report) => report.failures().map(|(row, err)| (Some(row), err)).collect(),
            FileResult::Batch(BatchOutcome::RolledBack { index, reason }) => vec![(Some(*index), reason)],
            FileResult::Batch(BatchOutcome::Committed { .. }) => Vec::new(),
            FileResult::BatchFailed(err) => vec![(None, err)],
        }
    }
}

/// Progress bar over `total` rows, hidden when `quiet`.
pub fn progress_bar(total: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} rows {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    pb.set_style(style);
    pb
}

fn kind_colored(kind: &str) -> ColoredString {
    match kind {
        "endpoint_missing" | "constraint_violated" => kind.yellow(),
        "store_unavailable" | "aborted" => kind.red(),
        _ => kind.magenta(),
    }
}

/// Human-readable summary of a `load` run.
pub fn print_load_summary(reports: &[FileReport]) {
    let mut by_kind: BTreeMap<&'static str, Vec<(String, &IngestError)>> = BTreeMap::new();

    for report in reports {
        let name = report.path.display().to_string();
        let line = format!(
            "{} success = {} failure = {}",
            name.cyan(),
            report.succeeded(),
            report.failed()
        );
        match &report.result {
            FileResult::Batch(BatchOutcome::Committed { .. }) => println!("{} {}", line, "(committed)".green()),
            FileResult::Batch(BatchOutcome::RolledBack { .. }) => println!("{} {}", line, "(rolled back)".red()),
            FileResult::BatchFailed(_) => println!("{} {}", line, "(batch failed)".red()),
            FileResult::Rows(_) => println!("{}", line),
        }

        for (row, err) in report.failures() {
            let at = match row {
                Some(row) => format!("{} row {}", name, row + 1),
                None => name.clone(),
            };
            by_kind.entry(err.kind()).or_default().push((at, err));
        }
    }

    let succeeded: usize = reports.iter().map(FileReport::succeeded).sum();
    let failed: usize = reports.iter().map(FileReport::failed).sum();

    println!("{}", "─".repeat(50));
    let total = format!("success = {} failure = {}", succeeded, failed);
    if failed == 0 {
        println!("{}", total.green().bold());
    } else {
        println!("{}", total.red().bold());
    }

    for (kind, failures) in &by_kind {
        println!("\n{} ({}):", kind_colored(kind), failures.len());
        for (at, err) in failures {
            println!("  {} {}: {}", "•".dimmed(), at.dimmed(), err);
        }
    }

    let retryable = by_kind.values().flatten().any(|(_, err)| err.is_transport());
    if retryable {
        println!(
            "\n{}",
            "Some rows failed because the store was unreachable; loading them again is safe.".yellow()
        );
    }
}

fn row_json(report: &RowReport) -> Value {
    match &report.outcome {
        Ok(success) => json!({ "row": report.row, "outcome": success }),
        Err(err) => json!({ "row": report.row, "error": err.kind(), "message": err.to_string() }),
    }
}

/// Machine-readable report of a `load` run.
pub fn load_summary_json(reports: &[FileReport]) -> Value {
    let files: Vec<Value> = reports
        .iter()
        .map(|report| {
            let detail = match &report.result {
                FileResult::Rows(rows) => json!({
                    "mode": "rows",
                    "failures_by_kind": rows.failures_by_kind(),
                    "rows": rows.outcomes.iter().map(row_json).collect::<Vec<_>>(),
                }),
                FileResult::Batch(BatchOutcome::Committed { applied }) => json!({
                    "mode": "batch",
                    "committed": true,
                    "applied": applied,
                }),
                FileResult::Batch(BatchOutcome::RolledBack { index, reason }) => json!({
                    "mode": "batch",
                    "committed": false,
                    "row": index,
                    "error": reason.kind(),
                    "message": reason.to_string(),
                }),
                FileResult::BatchFailed(err) => json!({
                    "mode": "batch",
                    "committed": false,
                    "error": err.kind(),
                    "message": err.to_string(),
                }),
            };
            json!({
                "file": report.path.display().to_string(),
                "success": report.succeeded(),
                "failure": report.failed(),
                "detail": detail,
            })
        })
        .collect();

    json!({
        "success": reports.iter().map(FileReport::succeeded).sum::<usize>(),
        "failure": reports.iter().map(FileReport::failed).sum::<usize>(),
        "files": files,
    })
}

/// Print node and relationship counts.
pub fn print_counts(counts: &GraphCounts) {
    println!("{}", "Graph Status".bold());
    println!("{}", "─".repeat(40));
    println!("  Nodes:         {}", counts.nodes.to_string().cyan());
    println!("  Relationships: {}", counts.relationships.to_string().cyan());
    println!("{}", "─".repeat(40));
}
