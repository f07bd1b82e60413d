//! Idempotent node creation.

use serde::Serialize;
use tracing::debug;

use ontoload_core::{IngestError, IngestResult, NodeRequest, StoreError};

use crate::resolver::node_exists;
use crate::statement::Statement;
use crate::store::{discard, Executor, Session, Transaction};

/// Result of materializing one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityOutcome {
    Created,
    /// A node with the same `(label, id)` was already present; nothing was written.
    AlreadyExists,
}

/// Check-then-create inside the caller's scope. Does not commit.
///
/// The existence check only short-circuits; a create rejected by the store's
/// uniqueness constraint is also reported as [`EntityOutcome::AlreadyExists`].
pub(crate) async fn materialize_entity<E>(executor: &mut E, node: &NodeRequest) -> IngestResult<EntityOutcome>
where
    E: Executor,
{
    let id = node.id();
    if node_exists(executor, &node.label, &id).await? {
        debug!(label = %node.label, id = %id, "Node already exists");
        return Ok(EntityOutcome::AlreadyExists);
    }

    let statement = Statement::CreateNode {
        label: node.label.clone(),
        properties: node.properties.clone(),
    };
    match executor.count(&statement).await {
        Ok(0) => Err(IngestError::aborted(format!(
            "store created no node for ({}:{})",
            node.label, id
        ))),
        Ok(_) => Ok(EntityOutcome::Created),
        Err(StoreError::Conflict(_)) => Ok(EntityOutcome::AlreadyExists),
        Err(err) => Err(err.into()),
    }
}

/// Create a node unless one with the same `(label, id)` exists.
///
/// Runs in its own transaction on `session`.
pub async fn create_entity<S>(session: &mut S, node: &NodeRequest) -> IngestResult<EntityOutcome>
where
    S: Session,
{
    let mut txn = session.begin().await?;

    match materialize_entity(&mut txn, node).await {
        Ok(EntityOutcome::Created) => match txn.commit().await {
            Ok(()) => {
                debug!(label = %node.label, id = %node.id(), "Node created");
                Ok(EntityOutcome::Created)
            }
            // Lost a race with a concurrent writer at commit time.
            Err(StoreError::Conflict(_)) => Ok(EntityOutcome::AlreadyExists),
            Err(err) => Err(err.into()),
        },
        Ok(EntityOutcome::AlreadyExists) => {
            discard(&mut txn).await;
            Ok(EntityOutcome::AlreadyExists)
        }
        Err(err) => {
            discard(&mut txn).await;
            Err(err)
        }
    }
}
