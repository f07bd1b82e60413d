//! Schema initialization (uniqueness constraints).
//!
//! Uniqueness of `(label, id)` is the store's job: the existence check done
//! by the entity materializer is only a short-circuit, and two concurrent
//! writers can both pass it. Install these constraints before ingesting.

use tracing::info;

use ontoload_core::{IngestResult, Label};

use crate::statement::Statement;
use crate::store::Executor;

/// Install a `(label, id)` uniqueness constraint for every label.
///
/// Safe to run multiple times.
pub async fn ensure_unique_ids<E>(executor: &mut E, labels: &[Label]) -> IngestResult<()>
where
    E: Executor,
{
    info!("Initializing graph schema...");

    for label in labels {
        executor
            .execute(&Statement::EnsureUniqueId { label: label.clone() })
            .await?;
    }

    info!("Graph schema initialized ({} constraints)", labels.len());
    Ok(())
}
