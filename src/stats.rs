//! Per-query aggregation of run results and report formatting.

use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Color, Table};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;
use workload_core::QueryResult;

/// Latency samples kept per query name. Percentiles are exact up to this
/// many calls and estimated from a uniform sample beyond it.
pub const LATENCY_SAMPLE_CAPACITY: usize = 100_000;

/// Latency and outcome accumulator for one query name.
#[derive(Debug, Default)]
struct QueryAccumulator {
    count: u64,
    errors: u64,
    rows: u64,
    /// Microseconds
    total_micros: u128,
    min_micros: Option<u64>,
    max_micros: u64,
    /// Uniform reservoir sample of latencies in microseconds
    samples: Vec<u64>,
}

impl QueryAccumulator {
    fn add_latency<R: Rng + ?Sized>(&mut self, micros: u64, capacity: usize, rng: &mut R) {
        self.total_micros += u128::from(micros);
        self.min_micros = Some(self.min_micros.map_or(micros, |min| min.min(micros)));
        self.max_micros = self.max_micros.max(micros);

        // Algorithm R: the n-th value replaces a random slot with probability capacity/n
        if self.samples.len() < capacity {
            self.samples.push(micros);
        } else {
            let slot = rng.gen_range(0..self.count) as usize;
            if slot < capacity {
                self.samples[slot] = micros;
            }
        }
    }
}

/// Streaming collector for the results of a run.
#[derive(Debug)]
pub struct RunStats {
    workload: String,
    workers: usize,
    started_at: DateTime<Utc>,
    sample_capacity: usize,
    queries: BTreeMap<String, QueryAccumulator>,
}

impl RunStats {
    pub fn new(workload: impl Into<String>, workers: usize) -> Self {
        Self {
            workload: workload.into(),
            workers,
            started_at: Utc::now(),
            sample_capacity: LATENCY_SAMPLE_CAPACITY,
            queries: BTreeMap::new(),
        }
    }

    /// Keep at most `capacity` latency samples per query name.
    pub fn with_sample_capacity(mut self, capacity: usize) -> Self {
        self.sample_capacity = capacity.max(1);
        self
    }

    /// Add one result. The first failure of each query name is logged.
    pub fn record(&mut self, result: QueryResult) {
        let entry = self.queries.entry(result.query_name.clone()).or_default();
        entry.count += 1;
        entry.rows += result.rows_affected;
        let micros = result.duration.as_micros().min(u64::MAX as u128) as u64;
        entry.add_latency(micros, self.sample_capacity, &mut rand::thread_rng());

        if let Some(error) = &result.error {
            if entry.errors == 0 {
                warn!("Query '{}' failed: {}", result.query_name, error);
            }
            entry.errors += 1;
        }
    }

    pub fn total_queries(&self) -> u64 {
        self.queries.values().map(|q| q.count).sum()
    }

    /// Summarize everything recorded so far over `elapsed` wall time.
    pub fn report(&self, elapsed: Duration) -> RunReport {
        let secs = elapsed.as_secs_f64();
        let queries: Vec<QueryStats> = self
            .queries
            .iter()
            .map(|(name, acc)| QueryStats::from_accumulator(name, acc, secs))
            .collect();

        let total_queries = self.total_queries();
        RunReport {
            workload: self.workload.clone(),
            workers: self.workers,
            started_at: self.started_at,
            elapsed_secs: secs,
            total_queries,
            total_errors: queries.iter().map(|q| q.errors).sum(),
            throughput_qps: rate(total_queries, secs),
            queries,
        }
    }
}

fn rate(count: u64, secs: f64) -> f64 {
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

/// Nearest-rank percentile of sorted samples; 0 when empty.
pub fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (p * sorted.len() as f64 / 100.0).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Summary of one query name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryStats {
    pub name: String,
    pub count: u64,
    pub errors: u64,
    pub rows: u64,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
    pub qps: f64,
}

impl QueryStats {
    fn from_accumulator(name: &str, acc: &QueryAccumulator, secs: f64) -> Self {
        let mut sorted = acc.samples.clone();
        sorted.sort_unstable();
        let ms = |micros: u64| micros as f64 / 1000.0;
        let mean = if acc.count == 0 {
            0.0
        } else {
            acc.total_micros as f64 / acc.count as f64 / 1000.0
        };

        Self {
            name: name.to_string(),
            count: acc.count,
            errors: acc.errors,
            rows: acc.rows,
            min_ms: ms(acc.min_micros.unwrap_or(0)),
            mean_ms: mean,
            p50_ms: ms(percentile(&sorted, 50.0)),
            p95_ms: ms(percentile(&sorted, 95.0)),
            p99_ms: ms(percentile(&sorted, 99.0)),
            max_ms: ms(acc.max_micros),
            qps: rate(acc.count, secs),
        }
    }
}

/// Final report of a run, printable and serializable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub workload: String,
    pub workers: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub total_queries: u64,
    pub total_errors: u64,
    pub throughput_qps: f64,
    pub queries: Vec<QueryStats>,
}

impl RunReport {
    /// Render the report as a table.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            "Query", "Count", "Errors", "Rows", "Min ms", "Mean ms", "p50 ms", "p95 ms",
            "p99 ms", "Max ms", "QPS",
        ]);

        for query in &self.queries {
            let errors = if query.errors > 0 {
                Cell::new(format_number(query.errors)).fg(Color::Red)
            } else {
                Cell::new("0")
            };
            table.add_row(vec![
                Cell::new(&query.name),
                Cell::new(format_number(query.count)).set_alignment(CellAlignment::Right),
                errors.set_alignment(CellAlignment::Right),
                Cell::new(format_number(query.rows)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.2}", query.min_ms)),
                Cell::new(format!("{:.2}", query.mean_ms)),
                Cell::new(format!("{:.2}", query.p50_ms)),
                Cell::new(format!("{:.2}", query.p95_ms)),
                Cell::new(format!("{:.2}", query.p99_ms)),
                Cell::new(format!("{:.2}", query.max_ms)),
                Cell::new(format!("{:.1}", query.qps)),
            ]);
        }

        table.add_row(vec![
            Cell::new("TOTAL").fg(Color::Cyan),
            Cell::new(format_number(self.total_queries)).set_alignment(CellAlignment::Right),
            Cell::new(format_number(self.total_errors)).set_alignment(CellAlignment::Right),
            Cell::new(format_number(self.queries.iter().map(|q| q.rows).sum()))
                .set_alignment(CellAlignment::Right),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(format!("{:.1}", self.throughput_qps)),
        ]);

        format!(
            "Workload '{}': {} workers, {}\n{}",
            self.workload,
            self.workers,
            format_duration(self.elapsed_secs),
            table
        )
    }

    /// Write the report as pretty JSON.
    pub async fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

/// Format seconds as "5.5s", "1m 05s" or "1h 01m".
fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{secs:.1}s")
    } else if secs < 3600.0 {
        let total = secs as u64;
        format!("{}m {:02}s", total / 60, total % 60)
    } else {
        let total = secs as u64;
        format!("{}h {:02}m", total / 3600, (total % 3600) / 60)
    }
}

/// Format a number with thousands separators.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(name: &str, millis: u64, rows: u64) -> QueryResult {
        QueryResult::success(name, Duration::from_millis(millis), rows)
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let samples: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile(&samples, 50.0), 50);
        assert_eq!(percentile(&samples, 95.0), 95);
        assert_eq!(percentile(&samples, 99.0), 99);
        assert_eq!(percentile(&samples, 100.0), 100);
        assert_eq!(percentile(&[7], 99.0), 7);
        assert_eq!(percentile(&[], 50.0), 0);
    }

    #[test]
    fn test_report_aggregates_per_query() {
        let mut stats = RunStats::new("ecommerce", 4);
        for millis in 1..=10 {
            stats.record(ok("similar_products", millis, 10));
        }
        stats.record(ok("checkout", 20, 3));
        stats.record(QueryResult::failure(
            "checkout",
            Duration::from_millis(40),
            "deadlock detected",
        ));

        let report = stats.report(Duration::from_secs(2));
        assert_eq!(report.total_queries, 12);
        assert_eq!(report.total_errors, 1);
        assert!((report.throughput_qps - 6.0).abs() < 1e-9);

        // BTreeMap keeps names sorted
        assert_eq!(report.queries[0].name, "checkout");
        let checkout = &report.queries[0];
        assert_eq!((checkout.count, checkout.errors, checkout.rows), (2, 1, 3));
        assert_eq!(checkout.max_ms, 40.0);

        let similar = &report.queries[1];
        assert_eq!(similar.min_ms, 1.0);
        assert_eq!(similar.p50_ms, 5.0);
        assert_eq!(similar.max_ms, 10.0);
        assert!((similar.mean_ms - 5.5).abs() < 1e-9);
        assert!((similar.qps - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_latency_samples_are_bounded() {
        let mut stats = RunStats::new("ecommerce", 1).with_sample_capacity(1_000);
        for micros in 1..=50_000u64 {
            stats.record(QueryResult::success(
                "product_detail",
                Duration::from_micros(micros),
                1,
            ));
        }
        assert_eq!(stats.queries["product_detail"].samples.len(), 1_000);

        let report = stats.report(Duration::from_secs(1));
        let detail = &report.queries[0];
        // Count, extremes and mean stay exact
        assert_eq!(detail.count, 50_000);
        assert_eq!(detail.min_ms, 0.001);
        assert_eq!(detail.max_ms, 50.0);
        assert!((detail.mean_ms - 25.0005).abs() < 1e-9);
        // Percentiles come from a uniform sample of 1..=50ms
        assert!((detail.p50_ms - 25.0).abs() < 5.0, "p50 {}", detail.p50_ms);
        assert!(detail.p99_ms > 45.0, "p99 {}", detail.p99_ms);
    }

    #[test]
    fn test_table_lists_every_query() {
        let mut stats = RunStats::new("knowledge_base", 2);
        stats.record(ok("semantic_search", 3, 5));
        stats.record(ok("add_comment", 1, 1));
        let rendered = stats.report(Duration::from_secs(1)).format_table();
        assert!(rendered.contains("semantic_search"));
        assert!(rendered.contains("add_comment"));
        assert!(rendered.contains("TOTAL"));
        assert!(rendered.starts_with("Workload 'knowledge_base': 2 workers"));
    }

    #[test]
    fn test_empty_report() {
        let report = RunStats::new("ecommerce", 1).report(Duration::ZERO);
        assert_eq!(report.total_queries, 0);
        assert_eq!(report.throughput_qps, 0.0);
        assert!(report.queries.is_empty());
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_duration(5.5), "5.5s");
        assert_eq!(format_duration(65.0), "1m 05s");
        assert_eq!(format_duration(3661.0), "1h 01m");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(100), "100");
    }
}
