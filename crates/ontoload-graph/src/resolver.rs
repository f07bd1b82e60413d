//! Identity resolution: does a node with this label and id exist?

use serde::Serialize;

use ontoload_core::{IngestError, IngestResult, Label, RelType};

use crate::statement::Statement;
use crate::store::{Executor, GraphStore};

/// Whether a node of `label` carries `id`. Read-only.
///
/// A store failure is returned as [`IngestError::StoreUnavailable`] and is
/// never reported as "not found".
pub async fn node_exists<E>(executor: &mut E, label: &Label, id: &str) -> IngestResult<bool>
where
    E: Executor,
{
    let matched = executor.count(&Statement::node_exists(label, id)).await?;
    Ok(matched > 0)
}

/// Fail with [`IngestError::EndpointMissing`] unless the node exists.
pub async fn require_node<E>(executor: &mut E, label: &Label, id: &str) -> IngestResult<()>
where
    E: Executor,
{
    if node_exists(executor, label, id).await? {
        Ok(())
    } else {
        Err(IngestError::endpoint_missing(label.as_str(), id))
    }
}

/// [`node_exists`] on a fresh session from `store`.
pub async fn exists<S>(store: &S, label: &Label, id: &str) -> IngestResult<bool>
where
    S: GraphStore,
{
    let mut session = store.session().await?;
    node_exists(&mut session, label, id).await
}

/// Node and relationship counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphCounts {
    pub nodes: u64,
    pub relationships: u64,
}

/// Count committed nodes (of `label`) and relationships (of `rel`).
pub async fn graph_counts<S>(store: &S, label: Option<&Label>, rel: Option<&RelType>) -> IngestResult<GraphCounts>
where
    S: GraphStore,
{
    let mut session = store.session().await?;
    let nodes = session
        .count(&Statement::CountNodes { label: label.cloned() })
        .await?;
    let relationships = session
        .count(&Statement::CountEdges { rel: rel.cloned() })
        .await?;
    Ok(GraphCounts { nodes, relationships })
}
