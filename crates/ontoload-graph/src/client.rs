//! Neo4j connection client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query};
use serde::Deserialize;
use tracing::{debug, info};

use ontoload_core::{PropertyValue, StoreError, StoreResult};

use crate::cypher::CypherQuery;
use crate::statement::{Statement, COUNT_COLUMN};
use crate::store::{Executor, GraphStore, Record, Session, Transaction};

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Pool size; should be at least the number of ingestion workers.
    pub max_connections: usize,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "neo4j".to_string(),
            database: "neo4j".to_string(),
            max_connections: 16,
            fetch_size: 200,
        }
    }
}

/// Classify a driver error into the store taxonomy.
fn map_error(err: neo4rs::Error) -> StoreError {
    let message = err.to_string();
    if message.contains("ConstraintValidationFailed") || message.contains("already exists with label") {
        StoreError::Conflict(message)
    } else if message.contains("Neo.ClientError") {
        StoreError::Query(message)
    } else {
        StoreError::Unavailable(message)
    }
}

fn to_query(cypher: CypherQuery) -> Query {
    let mut query = Query::new(cypher.text);
    for (name, value) in cypher.params {
        query = match value {
            PropertyValue::Null => query.param::<Option<String>>(&name, None),
            PropertyValue::Bool(b) => query.param(&name, b),
            PropertyValue::Int(i) => query.param(&name, i),
            PropertyValue::Float(f) => query.param(&name, f),
            PropertyValue::Str(s) => query.param(&name, s),
        };
    }
    query
}

fn to_record(statement: &Statement, row: &neo4rs::Row) -> StoreResult<Record> {
    let mut record = Record::new();
    if statement.returns_count() {
        let matched: i64 = row
            .get(COUNT_COLUMN)
            .map_err(|e| StoreError::Query(format!("Failed to get field '{}': {:?}", COUNT_COLUMN, e)))?;
        record.insert(COUNT_COLUMN.to_string(), PropertyValue::Int(matched));
    }
    Ok(record)
}

/// Neo4j-backed [`GraphStore`].
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
    closed: Arc<AtomicBool>,
}

impl Neo4jStore {
    /// Connect using `config`.
    ///
    /// neo4rs builds its pool lazily, so a `RETURN 1` ping runs immediately
    /// to surface an unreachable server here rather than on first use.
    pub async fn connect(config: &GraphConfig) -> StoreResult<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(config.max_connections)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("Failed to build Neo4j config: {}", e)))?;

        let graph = Graph::connect(neo4j_config).await.map_err(map_error)?;

        let store = Self {
            graph,
            closed: Arc::new(AtomicBool::new(false)),
        };
        store.check_connectivity().await?;
        info!(uri = %config.uri, database = %config.database, "Connected to Neo4j");
        Ok(store)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("Neo4j client is closed".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    type Session = Neo4jSession;

    async fn session(&self) -> StoreResult<Neo4jSession> {
        self.ensure_open()?;
        Ok(Neo4jSession {
            graph: self.graph.clone(),
        })
    }

    async fn check_connectivity(&self) -> StoreResult<()> {
        self.ensure_open()?;
        self.graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .map_err(map_error)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Neo4j client closed");
        }
    }
}

/// Autocommit access to the pool; transactions pin one connection.
pub struct Neo4jSession {
    graph: Graph,
}

#[async_trait]
impl Executor for Neo4jSession {
    async fn execute(&mut self, statement: &Statement) -> StoreResult<Vec<Record>> {
        let cypher = statement.to_cypher();
        debug!(query = %cypher.text, write = statement.is_write(), "Executing statement");

        if !statement.returns_count() {
            self.graph.run(to_query(cypher)).await.map_err(map_error)?;
            return Ok(Vec::new());
        }

        let mut stream = self.graph.execute(to_query(cypher)).await.map_err(map_error)?;
        let mut records = Vec::new();
        while let Some(row) = stream.next().await.map_err(map_error)? {
            records.push(to_record(statement, &row)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl Session for Neo4jSession {
    type Txn = Neo4jTxn;

    async fn begin(&mut self) -> StoreResult<Neo4jTxn> {
        let txn = self.graph.start_txn().await.map_err(map_error)?;
        Ok(Neo4jTxn { txn: Some(txn) })
    }
}

/// An explicit Neo4j transaction.
pub struct Neo4jTxn {
    txn: Option<neo4rs::Txn>,
}

#[async_trait]
impl Executor for Neo4jTxn {
    async fn execute(&mut self, statement: &Statement) -> StoreResult<Vec<Record>> {
        let txn = self.txn.as_mut().ok_or(StoreError::TransactionClosed)?;
        let cypher = statement.to_cypher();
        debug!(query = %cypher.text, write = statement.is_write(), "Executing statement in transaction");

        if !statement.returns_count() {
            txn.run(to_query(cypher)).await.map_err(map_error)?;
            return Ok(Vec::new());
        }

        let mut stream = txn.execute(to_query(cypher)).await.map_err(map_error)?;
        let mut records = Vec::new();
        while let Some(row) = stream.next(txn.handle()).await.map_err(map_error)? {
            records.push(to_record(statement, &row)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl Transaction for Neo4jTxn {
    async fn commit(&mut self) -> StoreResult<()> {
        let txn = self.txn.take().ok_or(StoreError::TransactionClosed)?;
        txn.commit().await.map_err(map_error)
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        let txn = self.txn.take().ok_or(StoreError::TransactionClosed)?;
        txn.rollback().await.map_err(map_error)
    }
}
