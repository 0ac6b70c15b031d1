//! Batched, parameterized INSERT pipeline.
//!
//! Rows for one table are accumulated in memory and flushed as a single
//! multi-row `INSERT` once the batch is full or the stream ends. A failed
//! flush stops the table: earlier batches stay committed, later ones are
//! never attempted.

use crate::database::{Database, SqlValue};
use crate::error::GenerationError;
use crate::types::GeneratorConfig;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default number of rows per bulk INSERT.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default number of rows between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub progress_interval: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl From<&GeneratorConfig> for BatchOptions {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            progress_interval: config.progress_interval,
        }
    }
}

/// Metrics from populating one table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InsertStats {
    /// Rows committed
    pub rows: u64,
    /// Bulk statements executed
    pub batches: u64,
    pub elapsed: Duration,
}

impl InsertStats {
    pub fn rows_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.rows as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Accumulates rows for one table and flushes them as bulk INSERTs.
pub struct BatchInserter<'a> {
    db: &'a dyn Database,
    table: String,
    columns: Vec<String>,
    batch_size: usize,
    progress_interval: u64,
    pending: Vec<Vec<SqlValue>>,
    rows_committed: u64,
    batches: u64,
    next_progress: u64,
    started: Instant,
}

impl<'a> BatchInserter<'a> {
    /// Create an inserter for `table`.
    ///
    /// The effective batch size is clamped so one statement never exceeds
    /// the database's parameter limit.
    pub fn new(
        db: &'a dyn Database,
        table: impl Into<String>,
        columns: &[&str],
        options: BatchOptions,
    ) -> Self {
        let table = table.into();
        let max_rows = (db.max_parameters() / columns.len().max(1)).max(1);
        let batch_size = options.batch_size.clamp(1, max_rows);
        if batch_size < options.batch_size {
            debug!(
                "Clamping batch size for '{}' from {} to {} ({} columns)",
                table,
                options.batch_size,
                batch_size,
                columns.len()
            );
        }

        Self {
            db,
            table,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            batch_size,
            progress_interval: options.progress_interval,
            pending: Vec::with_capacity(batch_size),
            rows_committed: 0,
            batches: 0,
            next_progress: options.progress_interval,
            started: Instant::now(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Rows successfully flushed so far.
    pub fn rows_committed(&self) -> u64 {
        self.rows_committed
    }

    /// Queue a row, flushing when the batch is full.
    pub async fn push(&mut self, row: Vec<SqlValue>) -> Result<(), GenerationError> {
        if row.len() != self.columns.len() {
            return Err(GenerationError::RowShape {
                table: self.table.clone(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.pending.push(row);
        if self.pending.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Flush the trailing partial batch and return the table's metrics.
    pub async fn finish(mut self) -> Result<InsertStats, GenerationError> {
        self.flush().await?;
        let stats = InsertStats {
            rows: self.rows_committed,
            batches: self.batches,
            elapsed: self.started.elapsed(),
        };
        info!(
            "Populated '{}': {} rows in {} batches ({:?}, {:.0} rows/sec)",
            self.table,
            stats.rows,
            stats.batches,
            stats.elapsed,
            stats.rows_per_second()
        );
        Ok(stats)
    }

    async fn flush(&mut self) -> Result<(), GenerationError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let rows = std::mem::take(&mut self.pending);
        let batch = self.batches + 1;
        let first_row = self.rows_committed + 1;
        let last_row = self.rows_committed + rows.len() as u64;

        let (sql, params) = self.build_statement(rows);
        debug!(
            "Flushing batch {} for '{}' (rows {}..={})",
            batch, self.table, first_row, last_row
        );

        self.db
            .exec(&sql, &params)
            .await
            .map_err(|source| GenerationError::Flush {
                table: self.table.clone(),
                batch,
                first_row,
                last_row,
                source,
            })?;

        self.batches = batch;
        self.rows_committed = last_row;
        self.pending = Vec::with_capacity(self.batch_size);

        if self.progress_interval > 0 && self.rows_committed >= self.next_progress {
            info!(
                "'{}': {} rows inserted ({:.0} rows/sec)",
                self.table,
                self.rows_committed,
                self.rows_committed as f64 / self.started.elapsed().as_secs_f64().max(1e-9)
            );
            while self.next_progress <= self.rows_committed {
                self.next_progress += self.progress_interval;
            }
        }
        Ok(())
    }

    /// Build `INSERT INTO "t" ("a", "b") VALUES ($1, $2), ($3, $4)` and its parameters.
    fn build_statement(&self, rows: Vec<Vec<SqlValue>>) -> (String, Vec<SqlValue>) {
        let mut params = Vec::with_capacity(rows.len() * self.columns.len());
        let mut tuples = Vec::with_capacity(rows.len());

        for row in rows {
            let placeholders: Vec<String> = row
                .iter()
                .map(|value| {
                    let placeholder = self.db.placeholder(params.len() + 1, value);
                    params.push(value.clone());
                    placeholder
                })
                .collect();
            tuples.push(format!("({})", placeholders.join(", ")));
        }

        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES {}",
            self.table,
            self.columns
                .iter()
                .map(|c| format!("\"{c}\""))
                .collect::<Vec<_>>()
                .join(", "),
            tuples.join(", ")
        );
        (sql, params)
    }
}

/// Insert every row of `rows` into `table`, stopping at the first failure.
pub async fn insert_all<I>(
    db: &dyn Database,
    table: &str,
    columns: &[&str],
    options: BatchOptions,
    rows: I,
) -> Result<InsertStats, GenerationError>
where
    I: IntoIterator<Item = Vec<SqlValue>>,
{
    let mut inserter = BatchInserter::new(db, table, columns, options);
    for row in rows {
        inserter.push(row).await?;
    }
    inserter.finish().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqlRow;
    use crate::error::DbError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        statements: Mutex<Vec<(String, usize)>>,
        max_parameters: Option<usize>,
    }

    #[async_trait]
    impl Database for Recorder {
        async fn query(&self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<SqlRow>, DbError> {
            Ok(Vec::new())
        }

        async fn exec(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError> {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), params.len()));
            Ok(params.len() as u64)
        }

        fn max_parameters(&self) -> usize {
            self.max_parameters.unwrap_or(65_535)
        }
    }

    fn row(id: i64) -> Vec<SqlValue> {
        vec![SqlValue::Int(id), SqlValue::Text(format!("item {id}"))]
    }

    #[tokio::test]
    async fn test_statement_shape() {
        let db = Recorder::default();
        let options = BatchOptions {
            batch_size: 2,
            progress_interval: 0,
        };
        insert_all(&db, "items", &["id", "name"], options, (1..=2).map(row))
            .await
            .unwrap();

        let statements = db.statements.lock().unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].0,
            "INSERT INTO \"items\" (\"id\", \"name\") VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(statements[0].1, 4);
    }

    #[tokio::test]
    async fn test_vector_placeholder() {
        let db = Recorder::default();
        let mut inserter = BatchInserter::new(&db, "docs", &["id", "embedding"], BatchOptions::default());
        inserter
            .push(vec![SqlValue::Int(1), SqlValue::Vector(vec![0.5, 0.5])])
            .await
            .unwrap();
        inserter.finish().await.unwrap();

        let statements = db.statements.lock().unwrap();
        assert_eq!(
            statements[0].0,
            "INSERT INTO \"docs\" (\"id\", \"embedding\") VALUES ($1, $2::text::vector)"
        );
    }

    #[tokio::test]
    async fn test_partial_trailing_batch() {
        let db = Recorder::default();
        let options = BatchOptions {
            batch_size: 4,
            progress_interval: 3,
        };
        let stats = insert_all(&db, "items", &["id", "name"], options, (1..=10).map(row))
            .await
            .unwrap();

        assert_eq!(stats.rows, 10);
        assert_eq!(stats.batches, 3);
        let sizes: Vec<usize> = db
            .statements
            .lock()
            .unwrap()
            .iter()
            .map(|(_, params)| params / 2)
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[tokio::test]
    async fn test_batch_size_clamped_to_parameter_limit() {
        let db = Recorder {
            max_parameters: Some(10),
            ..Default::default()
        };
        let inserter = BatchInserter::new(&db, "items", &["id", "name", "price"], BatchOptions::default());
        assert_eq!(inserter.batch_size(), 3);
    }

    #[tokio::test]
    async fn test_row_shape_mismatch() {
        let db = Recorder::default();
        let mut inserter = BatchInserter::new(&db, "items", &["id", "name"], BatchOptions::default());
        let err = inserter.push(vec![SqlValue::Int(1)]).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::RowShape { ref table, expected: 2, actual: 1 } if table == "items"
        ));
    }

    #[tokio::test]
    async fn test_empty_stream_executes_nothing() {
        let db = Recorder::default();
        let stats = insert_all(&db, "items", &["id", "name"], BatchOptions::default(), Vec::new())
            .await
            .unwrap();
        assert_eq!(stats.rows, 0);
        assert_eq!(stats.batches, 0);
        assert!(db.statements.lock().unwrap().is_empty());
    }
}
