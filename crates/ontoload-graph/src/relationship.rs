//! Relationship materialization.
//!
//! The write is a single match-match-create statement:
//!
//! ```cypher
//! MATCH (s:Subject {id: $p0})
//! MATCH (o:Object {id: $p1})
//! WHERE NOT (s)-[:REL]->(o)
//! CREATE (s)-[r:REL]->(o)
//! ```
//!
//! It either creates the whole edge or nothing, and it always runs inside a
//! transaction.

use serde::Serialize;
use tracing::{debug, warn};

use ontoload_core::{EdgeRequest, IngestResult, Label};

use crate::resolver::require_node;
use crate::statement::{EdgeKey, Statement};
use crate::store::{settle, Executor, Session};
use crate::validator::validate;

/// Result of materializing one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOutcome {
    Created,
    /// The same typed edge already links these endpoints; nothing was written.
    AlreadyExists,
}

/// Create the edge inside the caller's scope. Does not validate or commit.
pub(crate) async fn materialize_edge<E>(
    executor: &mut E,
    edge: &EdgeRequest,
    subject_label: &Label,
    object_label: &Label,
) -> IngestResult<EdgeOutcome>
where
    E: Executor,
{
    let key = EdgeKey::new(edge, subject_label, object_label);

    if executor.count(&Statement::EdgeExists(key.clone())).await? > 0 {
        debug!(rel = %edge.rel, subject = %edge.subject_id, object = %edge.object_id, "Edge already exists");
        return Ok(EdgeOutcome::AlreadyExists);
    }

    let created = executor.count(&Statement::CreateEdge(key)).await?;
    if created == 0 {
        // Nothing matched: find out which endpoint is gone.
        require_node(executor, subject_label, &edge.subject_id).await?;
        require_node(executor, object_label, &edge.object_id).await?;
        return Ok(EdgeOutcome::AlreadyExists);
    }
    if created > 1 {
        warn!(
            rel = %edge.rel,
            created,
            "Endpoint ids are not unique; edge was created for every matching pair"
        );
    }
    Ok(EdgeOutcome::Created)
}

/// Create a validated edge in its own transaction.
///
/// Fails with `EndpointMissing`, `StoreUnavailable` or `Aborted`; never
/// leaves a partial edge behind.
pub async fn create_edge<S>(
    session: &mut S,
    edge: &EdgeRequest,
    subject_label: &Label,
    object_label: &Label,
) -> IngestResult<EdgeOutcome>
where
    S: Session,
{
    let mut txn = session.begin().await?;
    let result = materialize_edge(&mut txn, edge, subject_label, object_label).await;
    settle(&mut txn, result).await
}

/// Validate and create an edge in one transaction.
pub async fn relate<S>(
    session: &mut S,
    edge: &EdgeRequest,
    subject_label: &Label,
    object_label: &Label,
) -> IngestResult<EdgeOutcome>
where
    S: Session,
{
    let mut txn = session.begin().await?;
    let result = match validate(&mut txn, edge, subject_label, object_label).await {
        Ok(()) => materialize_edge(&mut txn, edge, subject_label, object_label).await,
        Err(err) => Err(err),
    };
    settle(&mut txn, result).await
}
