//! Graph store abstraction.
//!
//! A [`GraphStore`] hands out [`Session`]s; a session runs autocommit
//! statements or opens a [`Transaction`]. Sessions are never shared between
//! concurrent workers: each worker acquires its own and drops it when its
//! task finishes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::warn;

use ontoload_core::{IngestResult, PropertyValue, StoreError, StoreResult};

use crate::statement::{Statement, COUNT_COLUMN};

/// One result record: column name to value.
pub type Record = BTreeMap<String, PropertyValue>;

/// Anything that can run a [`Statement`].
#[async_trait]
pub trait Executor: Send {
    async fn execute(&mut self, statement: &Statement) -> StoreResult<Vec<Record>>;

    /// Run a counting statement and return its [`COUNT_COLUMN`] value.
    ///
    /// A missing record or column is a [`StoreError::Query`]; it never reads
    /// as zero.
    async fn count(&mut self, statement: &Statement) -> StoreResult<u64> {
        let records = self.execute(statement).await?;
        let matched = records
            .first()
            .and_then(|record| record.get(COUNT_COLUMN))
            .and_then(PropertyValue::as_int)
            .ok_or_else(|| StoreError::Query(format!("count returned no integer '{}' column", COUNT_COLUMN)))?;
        Ok(matched.max(0) as u64)
    }
}

/// An open transactional scope.
///
/// Writes become visible to other sessions only on [`commit`](Transaction::commit).
/// Dropping an uncommitted transaction discards its writes.
#[async_trait]
pub trait Transaction: Executor + 'static {
    async fn commit(&mut self) -> StoreResult<()>;
    async fn rollback(&mut self) -> StoreResult<()>;
}

/// A unit of exclusive access to the store.
#[async_trait]
pub trait Session: Executor + 'static {
    type Txn: Transaction;

    /// Open a transactional scope.
    async fn begin(&mut self) -> StoreResult<Self::Txn>;
}

/// An explicitly constructed store handle with an open/close lifecycle.
#[async_trait]
pub trait GraphStore: Send + Sync + 'static {
    type Session: Session;

    /// Acquire a fresh session.
    async fn session(&self) -> StoreResult<Self::Session>;

    /// Verify the store answers.
    async fn check_connectivity(&self) -> StoreResult<()>;

    /// Refuse further sessions. Idempotent.
    async fn close(&self);
}

/// Roll back and log a failed rollback.
pub(crate) async fn discard<T: Transaction>(txn: &mut T) {
    if let Err(err) = txn.rollback().await {
        warn!(error = %err, "Rollback failed; transaction abandoned");
    }
}

/// Commit on success, roll back on failure.
pub(crate) async fn settle<T, V>(txn: &mut T, result: IngestResult<V>) -> IngestResult<V>
where
    T: Transaction,
    V: Send,
{
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            discard(txn).await;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoload_core::Label;

    /// Answers every statement with the same records.
    struct Canned(Vec<Record>);

    #[async_trait]
    impl Executor for Canned {
        async fn execute(&mut self, _statement: &Statement) -> StoreResult<Vec<Record>> {
            Ok(self.0.clone())
        }
    }

    fn exists() -> Statement {
        Statement::node_exists(&Label::new("Student").unwrap(), "1")
    }

    #[tokio::test]
    async fn test_count_reads_matched_column() {
        let mut record = Record::new();
        record.insert(COUNT_COLUMN.to_string(), PropertyValue::Int(3));
        assert_eq!(Canned(vec![record]).count(&exists()).await, Ok(3));
    }

    #[tokio::test]
    async fn test_count_without_record_is_an_error() {
        let result = Canned(Vec::new()).count(&exists()).await;
        assert!(matches!(result, Err(StoreError::Query(_))));
    }

    #[tokio::test]
    async fn test_count_without_matched_column_is_an_error() {
        let mut record = Record::new();
        record.insert("n".to_string(), PropertyValue::Int(1));
        let result = Canned(vec![record]).count(&exists()).await;
        assert!(matches!(result, Err(StoreError::Query(_))));
    }
}
