//! # Ontoload Graph
//!
//! Constraint-aware ingestion of entity and relationship records into a
//! labeled property graph.
//!
//! Provides idempotent node creation, relationship validation against
//! declared characteristics, atomic batches, and a bounded concurrent
//! ingestion coordinator, over Neo4j or an in-process graph.

pub mod batch;
pub mod client;
pub mod cypher;
pub mod entity;
pub mod ingest;
mod locks;
pub mod memory;
pub mod relationship;
pub mod resolver;
pub mod schema;
pub mod statement;
pub mod store;
pub mod validator;

pub use batch::{run_batch, BatchOutcome};
pub use client::{GraphConfig, Neo4jSession, Neo4jStore, Neo4jTxn};
pub use entity::{create_entity, EntityOutcome};
pub use ingest::{
    ingest_all, ingest_all_with_progress, ingest_one, ingest_sequential, IngestionReport, RowReport, RowSuccess,
};
pub use memory::{MemoryGraph, MemorySession, MemoryTxn};
pub use relationship::{create_edge, relate, EdgeOutcome};
pub use resolver::{exists, graph_counts, node_exists, GraphCounts};
pub use schema::ensure_unique_ids;
pub use statement::Statement;
pub use store::{Executor, GraphStore, Record, Session, Transaction};
pub use validator::validate;
