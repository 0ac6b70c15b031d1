//! Weighted random query dispatch with timing and failure isolation.
//!
//! Every dispatch call returns a [`QueryResult`]: handler errors and panics
//! are captured into `QueryResult::error`, so a driver looping over many
//! calls never needs per-call error handling.

use crate::database::Database;
use crate::error::{ConfigError, DbError, QueryError};
use crate::types::{QueryDefinition, QueryResult};
use async_trait::async_trait;
use futures::FutureExt;
use rand::Rng;
use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tokio::sync::OnceCell;

/// Query name reported when lazy bound initialization fails.
pub const INIT_QUERY_NAME: &str = "initialize";

/// Categorical sampler over a static weight table.
#[derive(Debug, Clone)]
pub struct WeightedSelector {
    definitions: Vec<QueryDefinition>,
    /// Running sum of weights, aligned with `definitions`
    cumulative: Vec<u64>,
    total: u64,
}

impl WeightedSelector {
    pub fn new(definitions: &[QueryDefinition]) -> Result<Self, ConfigError> {
        if definitions.is_empty() {
            return Err(ConfigError::EmptyQueryCatalogue);
        }

        let mut seen = HashSet::new();
        let mut cumulative = Vec::with_capacity(definitions.len());
        let mut total = 0u64;
        for definition in definitions {
            if definition.weight == 0 {
                return Err(ConfigError::ZeroWeight(definition.name.to_string()));
            }
            if !seen.insert(definition.name) {
                return Err(ConfigError::DuplicateQuery(definition.name.to_string()));
            }
            total += u64::from(definition.weight);
            cumulative.push(total);
        }

        Ok(Self {
            definitions: definitions.to_vec(),
            cumulative,
            total,
        })
    }

    /// Draw `r` uniformly from `[0, total)` and return the first definition
    /// whose cumulative weight exceeds it.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> &QueryDefinition {
        let r = rng.gen_range(0..self.total);
        let index = self.cumulative.partition_point(|&c| c <= r);
        &self.definitions[index]
    }

    /// Expected selection probability of `name`.
    pub fn probability(&self, name: &str) -> Option<f64> {
        self.definitions
            .iter()
            .find(|d| d.name == name)
            .map(|d| f64::from(d.weight) / self.total as f64)
    }

    pub fn total_weight(&self) -> u64 {
        self.total
    }

    pub fn definitions(&self) -> &[QueryDefinition] {
        &self.definitions
    }
}

/// Per-workload query handlers, keyed by query name.
#[async_trait]
pub trait QueryHandlers: Send + Sync {
    /// Execute query `name` and return the number of rows read or written.
    async fn run(&self, name: &str, db: &dyn Database) -> Result<u64, QueryError>;
}

/// Selects one query per call and times its handler.
pub struct QueryDispatcher<H> {
    selector: WeightedSelector,
    handlers: H,
}

impl<H: QueryHandlers> QueryDispatcher<H> {
    pub fn new(definitions: &[QueryDefinition], handlers: H) -> Result<Self, ConfigError> {
        Ok(Self {
            selector: WeightedSelector::new(definitions)?,
            handlers,
        })
    }

    pub fn selector(&self) -> &WeightedSelector {
        &self.selector
    }

    pub fn handlers(&self) -> &H {
        &self.handlers
    }

    /// Pick a query name according to the weight table.
    pub fn select_query_type(&self) -> &'static str {
        self.selector.select(&mut rand::thread_rng()).name
    }

    /// Select, execute and time one query. Never fails.
    pub async fn execute_random_query(&self, db: &dyn Database) -> QueryResult {
        let name = self.select_query_type();
        self.execute(name, db).await
    }

    /// Execute and time a specific query. Never fails.
    pub async fn execute(&self, name: &str, db: &dyn Database) -> QueryResult {
        timed(name, self.handlers.run(name, db)).await
    }
}

/// Await `handler`, measuring wall time and capturing errors and panics.
pub async fn timed<F>(name: &str, handler: F) -> QueryResult
where
    F: Future<Output = Result<u64, QueryError>>,
{
    let start = Instant::now();
    let outcome = AssertUnwindSafe(handler).catch_unwind().await;
    let duration = start.elapsed();

    match outcome {
        Ok(Ok(rows)) => QueryResult::success(name, duration, rows),
        Ok(Err(err)) => QueryResult::failure(name, duration, err.to_string()),
        Err(panic) => QueryResult::failure(
            name,
            duration,
            format!("handler panicked: {}", panic_message(panic.as_ref())),
        ),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A dispatcher built on first use and shared by every later caller.
///
/// Concurrent first calls run the initializer once; the rest wait for it.
/// A failed initialization caches nothing and is retried on the next call.
pub struct LazyDispatcher<H> {
    cell: OnceCell<QueryDispatcher<H>>,
}

impl<H> Default for LazyDispatcher<H> {
    fn default() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }
}

impl<H: QueryHandlers> LazyDispatcher<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dispatcher, if it has been initialized.
    pub fn get(&self) -> Option<&QueryDispatcher<H>> {
        self.cell.get()
    }

    /// Initialize (at most once) and return the dispatcher.
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<&QueryDispatcher<H>, QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryDispatcher<H>, QueryError>>,
    {
        self.cell.get_or_try_init(init).await
    }

    /// Dispatch one random query, initializing the dispatcher first if needed.
    pub async fn execute_random_query<F, Fut>(&self, db: &dyn Database, init: F) -> QueryResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryDispatcher<H>, QueryError>>,
    {
        let start = Instant::now();
        match self.get_or_init(init).await {
            Ok(dispatcher) => dispatcher.execute_random_query(db).await,
            Err(err) => QueryResult::failure(
                INIT_QUERY_NAME,
                start.elapsed(),
                format!("failed to initialize query bounds: {err}"),
            ),
        }
    }
}

/// Current row count of `table`, clamped to at least 1 so random ids
/// drawn from `[1, count]` stay in range on an empty table.
pub async fn count_rows(db: &dyn Database, table: &str) -> Result<u64, DbError> {
    let row = db
        .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), &[])
        .await?;
    Ok(row.get_i64(0)?.max(1) as u64)
}
