//! Row ingestion: bounded concurrent fan-out and the sequential fallback.
//!
//! Every row is an independent task. A worker acquires its own session for
//! the task, runs the entity or relationship path in one transaction, reports
//! and drops the session. A failing row never cancels its siblings, and there
//! is no transaction spanning rows. Relationship rows that touch the same
//! functional endpoint, or write the same edge, run one at a time.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use ontoload_core::{IngestError, WriteRequest};

use crate::entity::{create_entity, EntityOutcome};
use crate::locks::WriteLocks;
use crate::relationship::{relate, EdgeOutcome};
use crate::store::GraphStore;

/// What a successful row did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSuccess {
    NodeCreated,
    NodeAlreadyExists,
    EdgeCreated,
    EdgeAlreadyExists,
}

impl From<EntityOutcome> for RowSuccess {
    fn from(outcome: EntityOutcome) -> Self {
        match outcome {
            EntityOutcome::Created => Self::NodeCreated,
            EntityOutcome::AlreadyExists => Self::NodeAlreadyExists,
        }
    }
}

impl From<EdgeOutcome> for RowSuccess {
    fn from(outcome: EdgeOutcome) -> Self {
        match outcome {
            EdgeOutcome::Created => Self::EdgeCreated,
            EdgeOutcome::AlreadyExists => Self::EdgeAlreadyExists,
        }
    }
}

/// Outcome of one row, tied to its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct RowReport {
    pub row: usize,
    pub outcome: Result<RowSuccess, IngestError>,
}

/// Per-row outcomes of an ingestion run, ordered by row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionReport {
    pub outcomes: Vec<RowReport>,
}

impl IngestionReport {
    fn from_unordered(mut outcomes: Vec<RowReport>) -> Self {
        outcomes.sort_by_key(|r| r.row);
        Self { outcomes }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Count of successful rows that did each kind of thing.
    pub fn count(&self, what: RowSuccess) -> usize {
        self.outcomes
            .iter()
            .filter(|r| matches!(r.outcome, Ok(s) if s == what))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &IngestError)> {
        self.outcomes
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r.row, e)))
    }

    pub fn failures_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut by_kind = BTreeMap::new();
        for (_, err) in self.failures() {
            *by_kind.entry(err.kind()).or_insert(0) += 1;
        }
        by_kind
    }
}

/// Run one request on a fresh session from `store`.
pub async fn ingest_one<S>(store: &S, request: &WriteRequest) -> Result<RowSuccess, IngestError>
where
    S: GraphStore,
{
    let mut session = store.session().await?;
    match request {
        WriteRequest::Entity(node) => create_entity(&mut session, node).await.map(RowSuccess::from),
        WriteRequest::Relationship {
            edge,
            subject_label,
            object_label,
        } => relate(&mut session, edge, subject_label, object_label)
            .await
            .map(RowSuccess::from),
    }
}

fn log_outcome(row: usize, request: &WriteRequest, outcome: &Result<RowSuccess, IngestError>) {
    match outcome {
        Ok(success) => debug!(row, request = %request.describe(), outcome = ?success, "Row ingested"),
        Err(err) => warn!(row, request = %request.describe(), kind = err.kind(), error = %err, "Row failed"),
    }
}

/// Ingest `requests` on at most `max_workers` concurrent workers.
pub async fn ingest_all<S>(store: Arc<S>, requests: Vec<WriteRequest>, max_workers: usize) -> IngestionReport
where
    S: GraphStore,
{
    ingest_all_with_progress(store, requests, max_workers, |_| {}).await
}

/// [`ingest_all`], calling `on_report` as each row finishes.
///
/// Returns once every row has a result. Rows whose worker died before
/// reporting are failed with [`IngestError::Aborted`].
pub async fn ingest_all_with_progress<S, F>(
    store: Arc<S>,
    requests: Vec<WriteRequest>,
    max_workers: usize,
    mut on_report: F,
) -> IngestionReport
where
    S: GraphStore,
    F: FnMut(&RowReport),
{
    let total = requests.len();
    if total == 0 {
        return IngestionReport::default();
    }
    let workers = max_workers.clamp(1, total);
    info!(rows = total, workers, "Starting concurrent ingestion");

    let queue: Arc<Mutex<VecDeque<(usize, WriteRequest)>>> =
        Arc::new(Mutex::new(requests.into_iter().enumerate().collect()));
    let (report_tx, mut report_rx) = mpsc::unbounded_channel::<RowReport>();
    let locks = Arc::new(WriteLocks::default());

    let mut join_set = JoinSet::new();
    for worker in 0..workers {
        let store = Arc::clone(&store);
        let queue = Arc::clone(&queue);
        let locks = Arc::clone(&locks);
        let report_tx = report_tx.clone();
        join_set.spawn(async move {
            loop {
                let next = queue.lock().pop_front();
                let Some((row, request)) = next else { break };

                let guard = locks.acquire(&request).await;
                let outcome = ingest_one(store.as_ref(), &request).await;
                drop(guard);
                log_outcome(row, &request, &outcome);
                if report_tx.send(RowReport { row, outcome }).is_err() {
                    break;
                }
            }
            debug!(worker, "Worker finished");
        });
    }
    drop(report_tx);

    let mut outcomes = Vec::with_capacity(total);
    while let Some(report) = report_rx.recv().await {
        on_report(&report);
        outcomes.push(report);
    }

    while let Some(joined) = join_set.join_next().await {
        if let Err(err) = joined {
            error!(error = %err, "Ingestion worker terminated abnormally");
        }
    }

    if outcomes.len() < total {
        let reported: BTreeSet<usize> = outcomes.iter().map(|r| r.row).collect();
        for row in (0..total).filter(|row| !reported.contains(row)) {
            let report = RowReport {
                row,
                outcome: Err(IngestError::aborted("worker terminated")),
            };
            on_report(&report);
            outcomes.push(report);
        }
    }

    let report = IngestionReport::from_unordered(outcomes);
    info!(succeeded = report.succeeded(), failed = report.failed(), "Concurrent ingestion complete");
    report
}

/// Ingest `requests` one after another, each on its own session.
pub async fn ingest_sequential<S, F>(store: &S, requests: &[WriteRequest], mut on_report: F) -> IngestionReport
where
    S: GraphStore,
    F: FnMut(&RowReport),
{
    let mut outcomes = Vec::with_capacity(requests.len());
    for (row, request) in requests.iter().enumerate() {
        let outcome = ingest_one(store, request).await;
        log_outcome(row, request, &outcome);
        let report = RowReport { row, outcome };
        on_report(&report);
        outcomes.push(report);
    }

    let report = IngestionReport::from_unordered(outcomes);
    info!(succeeded = report.succeeded(), failed = report.failed(), "Sequential ingestion complete");
    report
}
