//! Relationship constraint validation.
//!
//! Checks run in order and stop at the first failure:
//!
//! 1. the subject node exists
//! 2. the object node exists
//! 3. FUNCTIONAL: the subject has no `rel` edge to any other object
//! 4. INVERSE_FUNCTIONAL: the object has no `rel` edge from any other subject
//!
//! TRANSITIVE, SYMMETRIC, ASYMMETRIC, REFLEXIVE and IRREFLEXIVE are carried
//! on the request but are declared, unenforced: they never reject an edge.

use tracing::debug;

use ontoload_core::{Characteristic, EdgeRequest, IngestError, IngestResult, Label};

use crate::resolver::require_node;
use crate::statement::{EdgeKey, Statement};
use crate::store::Executor;

/// Decide whether `edge` may be written between the two labelled endpoints.
///
/// Returns `Ok(())`, [`IngestError::EndpointMissing`],
/// [`IngestError::ConstraintViolated`], or a store failure.
pub async fn validate<E>(
    executor: &mut E,
    edge: &EdgeRequest,
    subject_label: &Label,
    object_label: &Label,
) -> IngestResult<()>
where
    E: Executor,
{
    require_node(executor, subject_label, &edge.subject_id).await?;
    require_node(executor, object_label, &edge.object_id).await?;

    let key = EdgeKey::new(edge, subject_label, object_label);

    if edge.is_functional() {
        let others = executor.count(&Statement::CountOtherObjects(key.clone())).await?;
        if others > 0 {
            return Err(IngestError::ConstraintViolated {
                rel: edge.rel.to_string(),
                characteristic: Characteristic::Functional,
                detail: format!(
                    "{} '{}' already relates to {} other object(s)",
                    subject_label, edge.subject_id, others
                ),
            });
        }
    }

    if edge.is_inverse_functional() {
        let others = executor.count(&Statement::CountOtherSubjects(key)).await?;
        if others > 0 {
            return Err(IngestError::ConstraintViolated {
                rel: edge.rel.to_string(),
                characteristic: Characteristic::InverseFunctional,
                detail: format!(
                    "{} '{}' is already related from {} other subject(s)",
                    object_label, edge.object_id, others
                ),
            });
        }
    }

    let unenforced: Vec<&str> = edge.characteristics.unenforced().map(|c| c.as_str()).collect();
    if !unenforced.is_empty() {
        debug!(rel = %edge.rel, characteristics = ?unenforced, "Declared, unenforced characteristics");
    }

    Ok(())
}
