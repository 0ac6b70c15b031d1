//! In-memory `Database` used by the integration tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use workload_core::{Database, DbError, SqlRow, SqlValue};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FakeError(pub String);

/// Records executed statements and fails the Nth `exec` on request.
#[derive(Default)]
pub struct RecordingDb {
    pub executed: Mutex<Vec<(String, Vec<SqlValue>)>>,
    pub exec_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
    /// 1-based index of the `exec` call that fails
    pub fail_exec_at: Option<usize>,
    /// Value returned by every `query`
    pub count: i64,
}

impl RecordingDb {
    pub fn failing_at(call: usize) -> Self {
        Self {
            fail_exec_at: Some(call),
            ..Default::default()
        }
    }

    pub fn with_count(count: i64) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }

    /// Rows committed through multi-row INSERTs with `columns` columns.
    pub fn committed_rows(&self, columns: usize) -> usize {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(_, params)| params.len() / columns)
            .sum()
    }
}

#[async_trait]
impl Database for RecordingDb {
    async fn query(&self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<SqlRow>, DbError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![SqlRow::new(vec![SqlValue::Int(self.count)])])
    }

    async fn exec(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError> {
        let call = self.exec_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_exec_at == Some(call) {
            return Err(DbError::statement(FakeError(format!(
                "duplicate key value (call {call})"
            ))));
        }
        self.executed
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        Ok(params.len() as u64)
    }
}
