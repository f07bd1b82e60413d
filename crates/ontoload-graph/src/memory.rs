//! In-process labeled property graph.
//!
//! Each transaction buffers its writes in a private overlay; reads inside the
//! transaction see committed state plus the overlay. Commit re-checks
//! uniqueness constraints against whatever was committed in the meantime,
//! then publishes the overlay atomically. Autocommit statements run in a
//! one-statement transaction.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use ontoload_core::{Label, Properties, PropertyValue, RelType, StoreError, StoreResult, ID_KEY};

use crate::statement::{EdgeKey, Statement, COUNT_COLUMN};
use crate::store::{Executor, GraphStore, Record, Session, Transaction};

#[derive(Debug, Clone)]
struct StoredNode {
    label: Label,
    id: String,
    properties: Properties,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    rel: RelType,
    from: u64,
    to: u64,
}

#[derive(Debug, Default)]
struct GraphState {
    nodes: BTreeMap<u64, StoredNode>,
    edges: Vec<StoredEdge>,
    unique: BTreeSet<Label>,
}

#[derive(Debug, Default)]
struct Overlay {
    nodes: BTreeMap<u64, StoredNode>,
    edges: Vec<StoredEdge>,
    unique: BTreeSet<Label>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<GraphState>,
    next_key: AtomicU64,
    offline: AtomicBool,
    closed: AtomicBool,
}

impl Shared {
    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory graph is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Committed state plus one transaction's overlay.
struct View<'a> {
    base: &'a GraphState,
    overlay: &'a Overlay,
}

impl View<'_> {
    fn nodes(&self) -> impl Iterator<Item = (&u64, &StoredNode)> {
        self.base.nodes.iter().chain(self.overlay.nodes.iter())
    }

    fn edges(&self) -> impl Iterator<Item = &StoredEdge> {
        self.base.edges.iter().chain(self.overlay.edges.iter())
    }

    fn node(&self, key: u64) -> Option<&StoredNode> {
        self.base.nodes.get(&key).or_else(|| self.overlay.nodes.get(&key))
    }

    fn keys_of(&self, label: &Label, id: &str) -> HashSet<u64> {
        self.nodes()
            .filter(|(_, n)| &n.label == label && n.id == id)
            .map(|(k, _)| *k)
            .collect()
    }

    fn is_unique(&self, label: &Label) -> bool {
        self.base.unique.contains(label) || self.overlay.unique.contains(label)
    }

    fn node_is(&self, key: u64, label: &Label, id: &str) -> bool {
        self.node(key).is_some_and(|n| &n.label == label && n.id == id)
    }

    fn has_duplicate_ids(&self, label: &Label) -> bool {
        let mut seen = HashSet::new();
        self.nodes()
            .filter(|(_, n)| &n.label == label)
            .any(|(_, n)| !seen.insert(n.id.as_str()))
    }

    fn count_other_objects(&self, key: &EdgeKey) -> usize {
        let subjects = self.keys_of(&key.subject_label, &key.subject_id);
        self.edges()
            .filter(|e| e.rel == key.rel && subjects.contains(&e.from))
            .filter(|e| !self.node_is(e.to, &key.object_label, &key.object_id))
            .count()
    }

    fn count_other_subjects(&self, key: &EdgeKey) -> usize {
        let objects = self.keys_of(&key.object_label, &key.object_id);
        self.edges()
            .filter(|e| e.rel == key.rel && objects.contains(&e.to))
            .filter(|e| !self.node_is(e.from, &key.subject_label, &key.subject_id))
            .count()
    }

    fn has_edge(&self, rel: &RelType, from: u64, to: u64) -> bool {
        self.edges().any(|e| &e.rel == rel && e.from == from && e.to == to)
    }
}

fn count_record(matched: usize) -> Vec<Record> {
    let mut record = Record::new();
    record.insert(COUNT_COLUMN.to_string(), PropertyValue::Int(matched as i64));
    vec![record]
}

fn apply(
    shared: &Shared,
    base: &GraphState,
    overlay: &mut Overlay,
    statement: &Statement,
) -> StoreResult<Vec<Record>> {
    match statement {
        Statement::NodeExists { label, id } => {
            let view = View { base, overlay };
            Ok(count_record(view.keys_of(label, id).len()))
        }
        Statement::CreateNode { label, properties } => {
            let id = properties
                .get(ID_KEY)
                .map(PropertyValue::to_id_string)
                .unwrap_or_default();
            let view = View { base, overlay };
            if view.is_unique(label) && !view.keys_of(label, &id).is_empty() {
                return Err(StoreError::Conflict(format!(
                    "node ({}) already exists with property id = '{}'",
                    label, id
                )));
            }
            let key = shared.next_key.fetch_add(1, Ordering::SeqCst);
            let properties = properties
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            overlay.nodes.insert(
                key,
                StoredNode {
                    label: label.clone(),
                    id,
                    properties,
                },
            );
            Ok(count_record(1))
        }
        Statement::CountOtherObjects(key) => {
            let view = View { base, overlay };
            Ok(count_record(view.count_other_objects(key)))
        }
        Statement::CountOtherSubjects(key) => {
            let view = View { base, overlay };
            Ok(count_record(view.count_other_subjects(key)))
        }
        Statement::EdgeExists(key) => {
            let view = View { base, overlay };
            let subjects = view.keys_of(&key.subject_label, &key.subject_id);
            let objects = view.keys_of(&key.object_label, &key.object_id);
            let matched = view
                .edges()
                .filter(|e| e.rel == key.rel && subjects.contains(&e.from) && objects.contains(&e.to))
                .count();
            Ok(count_record(matched))
        }
        Statement::CreateEdge(key) => {
            let pairs: Vec<(u64, u64)> = {
                let view = View { base, overlay };
                let subjects = view.keys_of(&key.subject_label, &key.subject_id);
                let objects = view.keys_of(&key.object_label, &key.object_id);
                subjects
                    .iter()
                    .flat_map(|s| objects.iter().map(move |o| (*s, *o)))
                    .filter(|(s, o)| !view.has_edge(&key.rel, *s, *o))
                    .collect()
            };
            for (from, to) in &pairs {
                overlay.edges.push(StoredEdge {
                    rel: key.rel.clone(),
                    from: *from,
                    to: *to,
                });
            }
            Ok(count_record(pairs.len()))
        }
        Statement::EnsureUniqueId { label } => {
            let view = View { base, overlay };
            if view.is_unique(label) {
                return Ok(Vec::new());
            }
            if view.has_duplicate_ids(label) {
                return Err(StoreError::Query(format!(
                    "cannot add unique constraint on {}.id: duplicate ids present",
                    label
                )));
            }
            overlay.unique.insert(label.clone());
            Ok(Vec::new())
        }
        Statement::CountNodes { label } => {
            let view = View { base, overlay };
            let matched = view
                .nodes()
                .filter(|(_, n)| label.as_ref().is_none_or(|l| &n.label == l))
                .count();
            Ok(count_record(matched))
        }
        Statement::CountEdges { rel } => {
            let view = View { base, overlay };
            let matched = view
                .edges()
                .filter(|e| rel.as_ref().is_none_or(|r| &e.rel == r))
                .count();
            Ok(count_record(matched))
        }
    }
}

/// Publish an overlay, re-validating uniqueness against committed state.
fn publish(state: &mut GraphState, overlay: Overlay) -> StoreResult<()> {
    let unique: BTreeSet<&Label> = state.unique.iter().chain(overlay.unique.iter()).collect();

    for label in &overlay.unique {
        let mut seen = HashSet::new();
        let duplicate = state
            .nodes
            .values()
            .chain(overlay.nodes.values())
            .filter(|n| &n.label == label)
            .any(|n| !seen.insert(n.id.as_str()));
        if duplicate {
            return Err(StoreError::Query(format!(
                "cannot add unique constraint on {}.id: duplicate ids present",
                label
            )));
        }
    }

    let mut seen: HashSet<(&Label, &str)> = state
        .nodes
        .values()
        .filter(|n| unique.contains(&n.label))
        .map(|n| (&n.label, n.id.as_str()))
        .collect();
    for node in overlay.nodes.values() {
        if unique.contains(&node.label) && !seen.insert((&node.label, node.id.as_str())) {
            return Err(StoreError::Conflict(format!(
                "node ({}) already exists with property id = '{}'",
                node.label, node.id
            )));
        }
    }

    drop(seen);
    drop(unique);
    state.nodes.extend(overlay.nodes);
    state.edges.extend(overlay.edges);
    state.unique.extend(overlay.unique);
    Ok(())
}

/// Shared handle to an in-memory graph. Clones observe the same graph.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    shared: Arc<Shared>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store becoming unreachable (or reachable again).
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.store(offline, Ordering::SeqCst);
    }

    /// Committed node count, optionally for one label.
    pub fn node_count(&self, label: Option<&Label>) -> usize {
        let state = self.shared.state.lock();
        state
            .nodes
            .values()
            .filter(|n| label.is_none_or(|l| &n.label == l))
            .count()
    }

    /// Properties of the committed node with this `(label, id)`, if any.
    pub fn node_properties(&self, label: &Label, id: &str) -> Option<Properties> {
        let state = self.shared.state.lock();
        state
            .nodes
            .values()
            .find(|n| &n.label == label && n.id == id)
            .map(|n| n.properties.clone())
    }

    /// Committed edge count, optionally for one type.
    pub fn edge_count(&self, rel: Option<&RelType>) -> usize {
        let state = self.shared.state.lock();
        state
            .edges
            .iter()
            .filter(|e| rel.is_none_or(|r| &e.rel == r))
            .count()
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    type Session = MemorySession;

    async fn session(&self) -> StoreResult<MemorySession> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory graph is closed".to_string()));
        }
        self.shared.ensure_online()?;
        Ok(MemorySession {
            shared: Arc::clone(&self.shared),
        })
    }

    async fn check_connectivity(&self) -> StoreResult<()> {
        self.shared.ensure_online()
    }

    async fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
    }
}

/// Session on a [`MemoryGraph`].
#[derive(Debug)]
pub struct MemorySession {
    shared: Arc<Shared>,
}

#[async_trait]
impl Executor for MemorySession {
    async fn execute(&mut self, statement: &Statement) -> StoreResult<Vec<Record>> {
        let mut txn = self.begin().await?;
        let records = txn.execute(statement).await?;
        txn.commit().await?;
        Ok(records)
    }
}

#[async_trait]
impl Session for MemorySession {
    type Txn = MemoryTxn;

    async fn begin(&mut self) -> StoreResult<MemoryTxn> {
        self.shared.ensure_online()?;
        Ok(MemoryTxn {
            shared: Arc::clone(&self.shared),
            overlay: Overlay::default(),
            open: true,
        })
    }
}

/// Transaction on a [`MemoryGraph`].
#[derive(Debug)]
pub struct MemoryTxn {
    shared: Arc<Shared>,
    overlay: Overlay,
    open: bool,
}

#[async_trait]
impl Executor for MemoryTxn {
    async fn execute(&mut self, statement: &Statement) -> StoreResult<Vec<Record>> {
        if !self.open {
            return Err(StoreError::TransactionClosed);
        }
        self.shared.ensure_online()?;
        // Give other tasks a chance to interleave, as a network round trip would.
        tokio::task::yield_now().await;

        let state = self.shared.state.lock();
        apply(&self.shared, &state, &mut self.overlay, statement)
    }
}

#[async_trait]
impl Transaction for MemoryTxn {
    async fn commit(&mut self) -> StoreResult<()> {
        if !self.open {
            return Err(StoreError::TransactionClosed);
        }
        self.open = false;
        let overlay = std::mem::take(&mut self.overlay);
        self.shared.ensure_online()?;
        tokio::task::yield_now().await;

        let mut state = self.shared.state.lock();
        let result = publish(&mut state, overlay);
        if let Err(ref err) = result {
            debug!(error = %err, "Memory transaction rejected at commit");
        }
        result
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        if !self.open {
            return Err(StoreError::TransactionClosed);
        }
        self.open = false;
        self.overlay = Overlay::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str) -> Statement {
        let mut properties = Properties::new();
        properties.insert(ID_KEY.to_string(), id.into());
        Statement::CreateNode {
            label: Label::new("Student").unwrap(),
            properties,
        }
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let graph = MemoryGraph::new();
        let mut writer = graph.session().await.unwrap();
        let mut reader = graph.session().await.unwrap();

        let mut txn = writer.begin().await.unwrap();
        assert_eq!(txn.count(&student("1")).await.unwrap(), 1);

        let exists = Statement::node_exists(&Label::new("Student").unwrap(), "1");
        assert_eq!(txn.count(&exists).await.unwrap(), 1);
        assert_eq!(reader.count(&exists).await.unwrap(), 0);

        txn.commit().await.unwrap();
        assert_eq!(reader.count(&exists).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_overlay() {
        let graph = MemoryGraph::new();
        let mut session = graph.session().await.unwrap();
        let mut txn = session.begin().await.unwrap();
        txn.execute(&student("1")).await.unwrap();
        txn.rollback().await.unwrap();
        assert_eq!(graph.node_count(None), 0);
        assert_eq!(txn.execute(&student("2")).await, Err(StoreError::TransactionClosed));
    }

    #[tokio::test]
    async fn test_unique_constraint_checked_at_commit() {
        let graph = MemoryGraph::new();
        let label = Label::new("Student").unwrap();
        let mut session = graph.session().await.unwrap();
        session
            .execute(&Statement::EnsureUniqueId { label: label.clone() })
            .await
            .unwrap();

        let mut a = graph.session().await.unwrap().begin().await.unwrap();
        let mut b = graph.session().await.unwrap().begin().await.unwrap();
        a.execute(&student("7")).await.unwrap();
        b.execute(&student("7")).await.unwrap();

        a.commit().await.unwrap();
        assert!(matches!(b.commit().await, Err(StoreError::Conflict(_))));
        assert_eq!(graph.node_count(Some(&label)), 1);
    }

    #[tokio::test]
    async fn test_commit_rejects_duplicates_within_one_transaction() {
        let graph = MemoryGraph::new();
        let label = Label::new("Student").unwrap();

        let mut a = graph.session().await.unwrap().begin().await.unwrap();
        a.execute(&student("5")).await.unwrap();
        a.execute(&student("5")).await.unwrap();

        let mut session = graph.session().await.unwrap();
        session
            .execute(&Statement::EnsureUniqueId { label: label.clone() })
            .await
            .unwrap();

        assert!(matches!(a.commit().await, Err(StoreError::Conflict(_))));
        assert_eq!(graph.node_count(Some(&label)), 0);
    }

    #[tokio::test]
    async fn test_constraint_refused_over_duplicates() {
        let graph = MemoryGraph::new();
        let mut session = graph.session().await.unwrap();
        session.execute(&student("1")).await.unwrap();
        session.execute(&student("1")).await.unwrap();
        let result = session
            .execute(&Statement::EnsureUniqueId { label: Label::new("Student").unwrap() })
            .await;
        assert!(matches!(result, Err(StoreError::Query(_))));
    }

    #[tokio::test]
    async fn test_offline_graph_is_unavailable() {
        let graph = MemoryGraph::new();
        graph.set_offline(true);
        assert!(matches!(graph.check_connectivity().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(graph.session().await, Err(StoreError::Unavailable(_))));
        graph.set_offline(false);
        assert!(graph.check_connectivity().await.is_ok());
    }

    #[tokio::test]
    async fn test_closed_graph_refuses_sessions() {
        let graph = MemoryGraph::new();
        graph.close().await;
        assert!(matches!(graph.session().await, Err(StoreError::Unavailable(_))));
    }
}
