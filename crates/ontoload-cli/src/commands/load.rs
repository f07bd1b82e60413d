//! `load`: classify source files, parse rows, and ingest them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::{info, warn};

use ontoload_core::naming::{classify_file, parse_relation_row, SourceKind};
use ontoload_core::{IngestResult, Label, NodeRequest, Row, WriteRequest, ID_KEY};
use ontoload_graph::{
    ensure_unique_ids, ingest_all_with_progress, ingest_sequential, run_batch, BatchOutcome, GraphStore,
    IngestionReport, MemoryGraph, Neo4jStore, RowReport,
};

use crate::config::{IngestMode, Settings};
use crate::output::{self, FileReport, FileResult};
use crate::source::{CsvRowSource, RowSource};

#[derive(Args)]
pub struct LoadArgs {
    /// Source files (entity_<label>.csv, relation-entity_<a>-entity_<b>.csv)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Maximum concurrent workers (concurrent mode)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Ingestion mode
    #[arg(short, long, value_enum)]
    pub mode: Option<IngestMode>,

    /// Load into a throwaway in-memory graph instead of Neo4j
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// One source file turned into write requests.
struct PreparedFile {
    path: PathBuf,
    kind: SourceKind,
    requests: Vec<WriteRequest>,
    /// Data row of each request.
    positions: Vec<usize>,
    /// Rows that never became a request.
    rejected: Vec<RowReport>,
}

impl PreparedFile {
    fn rows(&self) -> usize {
        self.requests.len() + self.rejected.len()
    }

    fn labels(&self) -> Vec<Label> {
        match &self.kind {
            SourceKind::Entity { label } => vec![label.clone()],
            SourceKind::Relation { subject, object } => vec![subject.clone(), object.clone()],
        }
    }
}

fn to_request(kind: &SourceKind, row: &Row) -> IngestResult<WriteRequest> {
    match kind {
        SourceKind::Entity { label } => NodeRequest::from_row(label.clone(), row).map(WriteRequest::Entity),
        SourceKind::Relation { subject, object } => {
            let edge = parse_relation_row(row)?;
            Ok(WriteRequest::relationship(edge, subject.clone(), object.clone()))
        }
    }
}

fn prepare(path: &Path, kind: SourceKind, source: &mut dyn RowSource) -> PreparedFile {
    let mut prepared = PreparedFile {
        path: path.to_path_buf(),
        kind,
        requests: Vec::new(),
        positions: Vec::new(),
        rejected: Vec::new(),
    };

    for (row, parsed) in source.collect_rows().into_iter().enumerate() {
        match parsed.and_then(|r| to_request(&prepared.kind, &r)) {
            Ok(request) => {
                prepared.requests.push(request);
                prepared.positions.push(row);
            }
            Err(err) => {
                warn!(file = %path.display(), row, error = %err, "Row rejected before ingestion");
                prepared.rejected.push(RowReport { row, outcome: Err(err) });
            }
        }
    }
    prepared
}

/// Classify and parse every file before anything is written.
///
/// Entity files are ordered before relation files so edge endpoints exist.
fn prepare_all(files: &[PathBuf]) -> Result<Vec<PreparedFile>> {
    let mut prepared = Vec::with_capacity(files.len());
    for path in files {
        let kind = classify_file(path).with_context(|| format!("Cannot load {}", path.display()))?;
        let mut source = CsvRowSource::open(path)?;
        if let SourceKind::Entity { label } = &kind {
            if !source.headers().iter().any(|h| h == ID_KEY) {
                bail!("{} has no `{}` column for {} nodes", path.display(), ID_KEY, label);
            }
        }
        prepared.push(prepare(path, kind, &mut source));
    }
    prepared.sort_by_key(|file| matches!(file.kind, SourceKind::Relation { .. }));
    Ok(prepared)
}

/// Rewrite report rows from request positions to data rows and merge in the
/// rejected rows.
fn to_file_rows(report: IngestionReport, positions: &[usize], rejected: Vec<RowReport>) -> IngestionReport {
    let mut outcomes: Vec<RowReport> = report
        .outcomes
        .into_iter()
        .map(|r| RowReport {
            row: positions.get(r.row).copied().unwrap_or(r.row),
            outcome: r.outcome,
        })
        .chain(rejected)
        .collect();
    outcomes.sort_by_key(|r| r.row);
    IngestionReport { outcomes }
}

async fn load_file<S>(
    store: &Arc<S>,
    file: PreparedFile,
    mode: IngestMode,
    workers: usize,
    quiet: bool,
) -> Result<FileReport>
where
    S: GraphStore,
{
    info!(file = %file.path.display(), rows = file.rows(), ?mode, "Loading file");
    let PreparedFile {
        path,
        requests,
        positions,
        rejected,
        ..
    } = file;

    let result = match mode {
        IngestMode::Batch => match rejected.into_iter().next() {
            // An unparseable row fails the whole batch before it is opened.
            Some(RowReport { row, outcome: Err(reason) }) => {
                FileResult::Batch(BatchOutcome::RolledBack { index: row, reason })
            }
            _ => {
                let mut session = store.session().await?;
                match run_batch(&mut session, &requests).await {
                    Ok(BatchOutcome::RolledBack { index, reason }) => FileResult::Batch(BatchOutcome::RolledBack {
                        index: positions.get(index).copied().unwrap_or(index),
                        reason,
                    }),
                    Ok(committed) => FileResult::Batch(committed),
                    Err(err) => FileResult::BatchFailed(err),
                }
            }
        },
        IngestMode::Concurrent => {
            let pb = output::progress_bar(requests.len(), quiet);
            let report = ingest_all_with_progress(Arc::clone(store), requests, workers, |_| pb.inc(1)).await;
            pb.finish_and_clear();
            FileResult::Rows(to_file_rows(report, &positions, rejected))
        }
        IngestMode::Sequential => {
            let pb = output::progress_bar(requests.len(), quiet);
            let report = ingest_sequential(store.as_ref(), &requests, |_| pb.inc(1)).await;
            pb.finish_and_clear();
            FileResult::Rows(to_file_rows(report, &positions, rejected))
        }
    };

    Ok(FileReport { path, result })
}

async fn load_files<S>(
    store: &Arc<S>,
    files: Vec<PreparedFile>,
    mode: IngestMode,
    workers: usize,
    quiet: bool,
) -> Result<Vec<FileReport>>
where
    S: GraphStore,
{
    let labels: BTreeSet<Label> = files.iter().flat_map(PreparedFile::labels).collect();
    let labels: Vec<Label> = labels.into_iter().collect();
    {
        let mut session = store.session().await?;
        ensure_unique_ids(&mut session, &labels)
            .await
            .context("Failed to install uniqueness constraints")?;
    }

    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        reports.push(load_file(store, file, mode, workers, quiet).await?);
    }
    Ok(reports)
}

/// Load `files` into `store`, closing it whether or not loading succeeds.
async fn run<S>(store: Arc<S>, files: Vec<PreparedFile>, mode: IngestMode, workers: usize, quiet: bool) -> Result<Vec<FileReport>>
where
    S: GraphStore,
{
    let result = load_files(&store, files, mode, workers, quiet).await;
    store.close().await;
    result
}

pub async fn execute(args: LoadArgs, settings: &Settings) -> Result<ExitCode> {
    let mode = args.mode.unwrap_or(settings.ingest.mode);
    let workers = args.workers.unwrap_or(settings.ingest.workers).max(1);
    let files = prepare_all(&args.files)?;

    if !args.json {
        let target = if args.dry_run {
            "in-memory graph (dry run)".to_string()
        } else {
            settings.graph.uri.clone()
        };
        println!("{} {} file(s) into {}", "Loading".bold(), files.len(), target.cyan());
    }

    let reports = if args.dry_run {
        run(Arc::new(MemoryGraph::new()), files, mode, workers, args.json).await?
    } else {
        let store = Neo4jStore::connect(&settings.graph)
            .await
            .context("Failed to connect to Neo4j")?;
        run(Arc::new(store), files, mode, workers, args.json).await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output::load_summary_json(&reports))?);
    } else {
        output::print_load_summary(&reports);
    }

    let failed: usize = reports.iter().map(FileReport::failed).sum();
    Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
