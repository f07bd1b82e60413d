//! Keyed write locks for concurrent relationship rows.
//!
//! The store has no FUNCTIONAL or INVERSE_FUNCTIONAL constraint, and a
//! characteristic check in one transaction cannot see another transaction's
//! uncommitted edge. Rows checking the same endpoint, or writing the same
//! edge, hold a shared key from validation through commit. Entity rows take
//! no lock; `(label, id)` uniqueness is enforced by the store.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use ontoload_core::{Label, RelType, WriteRequest};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum LockKey {
    /// Outgoing `rel` edges of a FUNCTIONAL subject.
    Outgoing { label: Label, id: String, rel: RelType },
    /// Incoming `rel` edges of an INVERSE_FUNCTIONAL object.
    Incoming { label: Label, id: String, rel: RelType },
    /// One typed edge between two endpoints.
    Edge {
        subject: (Label, String),
        rel: RelType,
        object: (Label, String),
    },
}

fn keys_for(request: &WriteRequest) -> BTreeSet<LockKey> {
    let mut keys = BTreeSet::new();
    let WriteRequest::Relationship {
        edge,
        subject_label,
        object_label,
    } = request
    else {
        return keys;
    };

    if edge.is_functional() {
        keys.insert(LockKey::Outgoing {
            label: subject_label.clone(),
            id: edge.subject_id.clone(),
            rel: edge.rel.clone(),
        });
    }
    if edge.is_inverse_functional() {
        keys.insert(LockKey::Incoming {
            label: object_label.clone(),
            id: edge.object_id.clone(),
            rel: edge.rel.clone(),
        });
    }
    keys.insert(LockKey::Edge {
        subject: (subject_label.clone(), edge.subject_id.clone()),
        rel: edge.rel.clone(),
        object: (object_label.clone(), edge.object_id.clone()),
    });
    keys
}

/// Lock table shared by the workers of one ingestion run.
#[derive(Debug, Default)]
pub(crate) struct WriteLocks {
    slots: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

/// Locks held for one row; released on drop.
pub(crate) struct RowGuard {
    _held: Vec<OwnedMutexGuard<()>>,
}

impl WriteLocks {
    /// Take every lock `request` needs. Keys are acquired in sorted order,
    /// so two rows never wait on each other in a cycle.
    pub(crate) async fn acquire(&self, request: &WriteRequest) -> RowGuard {
        let slots: Vec<Arc<AsyncMutex<()>>> = {
            let mut table = self.slots.lock();
            keys_for(request)
                .into_iter()
                .map(|key| Arc::clone(table.entry(key).or_default()))
                .collect()
        };

        let mut held = Vec::with_capacity(slots.len());
        for slot in slots {
            held.push(slot.lock_owned().await);
        }
        RowGuard { _held: held }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoload_core::{Characteristic, EdgeRequest, NodeRequest, Properties, ID_KEY};

    fn takes(subject: &str, object: &str) -> EdgeRequest {
        EdgeRequest::new(RelType::new("takes").unwrap(), subject, object)
    }

    fn enrolment(edge: EdgeRequest) -> WriteRequest {
        WriteRequest::relationship(edge, Label::new("Student").unwrap(), Label::new("Course").unwrap())
    }

    #[test]
    fn test_entity_rows_take_no_locks() {
        let mut properties = Properties::new();
        properties.insert(ID_KEY.to_string(), "1".into());
        let node = NodeRequest::new(Label::new("Student").unwrap(), properties).unwrap();
        assert!(keys_for(&WriteRequest::Entity(node)).is_empty());
    }

    #[test]
    fn test_keys_follow_characteristics() {
        assert_eq!(keys_for(&enrolment(takes("1", "9"))).len(), 1);
        assert_eq!(keys_for(&enrolment(takes("1", "9").with(Characteristic::Functional))).len(), 2);

        let both = takes("1", "9")
            .with(Characteristic::Functional)
            .with(Characteristic::InverseFunctional)
            .with(Characteristic::Symmetric);
        assert_eq!(keys_for(&enrolment(both)).len(), 3);
    }

    #[test]
    fn test_functional_rows_share_subject_key() {
        let a = keys_for(&enrolment(takes("1", "9").with(Characteristic::Functional)));
        let b = keys_for(&enrolment(takes("1", "10").with(Characteristic::Functional)));
        assert_eq!(a.intersection(&b).count(), 1);

        let c = keys_for(&enrolment(takes("2", "10").with(Characteristic::Functional)));
        assert_eq!(a.intersection(&c).count(), 0);
    }

    #[tokio::test]
    async fn test_second_row_waits_for_first() {
        let locks = WriteLocks::default();
        let first = enrolment(takes("1", "9").with(Characteristic::Functional));
        let second = enrolment(takes("1", "10").with(Characteristic::Functional));

        let guard = locks.acquire(&first).await;
        let waiting = tokio::time::timeout(std::time::Duration::from_millis(20), locks.acquire(&second)).await;
        assert!(waiting.is_err());

        drop(guard);
        let acquired = tokio::time::timeout(std::time::Duration::from_millis(200), locks.acquire(&second)).await;
        assert!(acquired.is_ok());
    }
}
