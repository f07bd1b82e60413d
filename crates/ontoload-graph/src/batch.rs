//! All-or-nothing batch writes.
//!
//! One transaction wraps the whole batch. Requests are applied in order with
//! the same mutation logic the standalone materializers use, but in the
//! shared scope. The first failing member rolls everything back; nothing is
//! visible to other sessions before commit.

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use ontoload_core::{IngestError, IngestResult, WriteRequest};

use crate::entity::{materialize_entity, EntityOutcome};
use crate::relationship::{materialize_edge, EdgeOutcome};
use crate::store::{discard, Session, Transaction};
use crate::validator::validate;

/// Result of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Every request was applied and committed.
    Committed { applied: usize },
    /// Request `index` (0-based) failed; no request of the batch was kept.
    RolledBack { index: usize, reason: IngestError },
}

/// Apply one member in the batch scope. Existing nodes and edges are failures here.
async fn apply_member<T>(txn: &mut T, request: &WriteRequest) -> IngestResult<()>
where
    T: Transaction,
{
    match request {
        WriteRequest::Entity(node) => match materialize_entity(txn, node).await? {
            EntityOutcome::Created => Ok(()),
            EntityOutcome::AlreadyExists => Err(IngestError::already_exists(node.label.as_str(), node.id())),
        },
        WriteRequest::Relationship {
            edge,
            subject_label,
            object_label,
        } => {
            validate(txn, edge, subject_label, object_label).await?;
            match materialize_edge(txn, edge, subject_label, object_label).await? {
                EdgeOutcome::Created => Ok(()),
                EdgeOutcome::AlreadyExists => Err(IngestError::already_exists(
                    edge.rel.as_str(),
                    format!("{}->{}", edge.subject_id, edge.object_id),
                )),
            }
        }
    }
}

/// Run `requests` as one atomic unit on `session`.
///
/// Member failures are reported as [`BatchOutcome::RolledBack`]. An error is
/// returned only when the scope cannot be opened or committed, in which case
/// nothing was written either.
pub async fn run_batch<S>(session: &mut S, requests: &[WriteRequest]) -> IngestResult<BatchOutcome>
where
    S: Session,
{
    if requests.is_empty() {
        return Ok(BatchOutcome::Committed { applied: 0 });
    }

    let batch_id = Uuid::new_v4();
    let span = info_span!("batch", %batch_id, size = requests.len());

    async move {
        let mut txn = session.begin().await?;

        for (index, request) in requests.iter().enumerate() {
            if let Err(reason) = apply_member(&mut txn, request).await {
                warn!(index, request = %request.describe(), error = %reason, "Batch member failed, rolling back");
                discard(&mut txn).await;
                return Ok(BatchOutcome::RolledBack { index, reason });
            }
        }

        if let Err(err) = txn.commit().await {
            warn!(error = %err, "Batch commit failed");
            return Err(err.into());
        }

        info!(applied = requests.len(), "Batch committed");
        Ok(BatchOutcome::Committed {
            applied: requests.len(),
        })
    }
    .instrument(span)
    .await
}
