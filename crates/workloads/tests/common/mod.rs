//! Scripted in-memory `Database` for exercising the plugins.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use workload_core::{Database, DbError, SqlRow, SqlValue};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FakeError(pub String);

/// Answers counts, vector dimensions and `RETURNING id` with fixed values and
/// records every statement it receives.
pub struct ScriptedDb {
    pub executed: Mutex<Vec<(String, Vec<SqlValue>)>>,
    pub queries: Mutex<Vec<String>>,
    pub exec_calls: AtomicUsize,
    /// Value returned for `COUNT(*)`
    pub count: i64,
    /// Value returned for `vector_dims(..)`
    pub dimensions: i64,
    /// 1-based index of the `exec` call that fails
    pub fail_exec_at: Option<usize>,
    /// Fail every `query` while set
    pub fail_queries: AtomicBool,
}

impl Default for ScriptedDb {
    fn default() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            exec_calls: AtomicUsize::new(0),
            count: 100,
            dimensions: 8,
            fail_exec_at: None,
            fail_queries: AtomicBool::new(false),
        }
    }
}

impl ScriptedDb {
    pub fn failing_at(call: usize) -> Self {
        Self {
            fail_exec_at: Some(call),
            ..Default::default()
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    /// Parameters of every INSERT into `table`, concatenated.
    pub fn inserted(&self, table: &str) -> Vec<SqlValue> {
        let prefix = format!("INSERT INTO \"{table}\" ");
        self.executed
            .lock()
            .unwrap()
            .iter()
            .filter(|(sql, _)| sql.starts_with(&prefix))
            .flat_map(|(_, params)| params.clone())
            .collect()
    }

    /// Number of queries whose text contains `needle`.
    pub fn queries_containing(&self, needle: &str) -> usize {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|sql| sql.contains(needle))
            .count()
    }
}

#[async_trait]
impl Database for ScriptedDb {
    async fn query(&self, sql: &str, _params: &[SqlValue]) -> Result<Vec<SqlRow>, DbError> {
        self.queries.lock().unwrap().push(sql.to_string());
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(DbError::connection(FakeError(
                "connection refused".to_string(),
            )));
        }

        let value = if sql.contains("COUNT(*)") && !sql.contains("JOIN") {
            self.count
        } else if sql.contains("vector_dims") {
            self.dimensions
        } else {
            1
        };
        Ok(vec![SqlRow::new(vec![SqlValue::Int(value)]); 3])
    }

    async fn exec(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError> {
        let call = self.exec_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_exec_at == Some(call) {
            return Err(DbError::statement(FakeError(format!(
                "relation does not exist (call {call})"
            ))));
        }
        self.executed
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        Ok(1)
    }
}
