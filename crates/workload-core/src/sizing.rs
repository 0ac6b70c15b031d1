//! Conversion of a target storage budget into per-table row counts.
//!
//! One "scale unit" is a workload's base proportions (e.g. 20 categories,
//! 500 products, 1000 customers). The calculator solves for how many scale
//! units fit the target:
//!
//! ```text
//! unit_cost    = Σ base_row_size × index_factor × scale_ratio
//! scale_factor = max(1, round(target / unit_cost))
//! rows[t]      = max(1, scale_factor × scale_ratio[t])
//! ```

use crate::types::{TableSizeInfo, DEFAULT_EMBEDDING_DIMENSIONS};
use serde::Serialize;

/// Bytes per single-precision vector element.
const BYTES_PER_DIMENSION: u64 = 4;

/// Computed row count per table, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RowCountPlan {
    tables: Vec<(String, u64)>,
}

impl RowCountPlan {
    pub fn get(&self, table: &str) -> Option<u64> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, rows)| *rows)
    }

    /// Row count for `table`, or 1 for tables the plan does not know.
    pub fn rows(&self, table: &str) -> u64 {
        self.get(table).unwrap_or(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.tables.iter().map(|(name, rows)| (name.as_str(), *rows))
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|(_, rows)| rows).sum()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Size calculator for one workload's tables.
#[derive(Debug, Clone)]
pub struct SizeCalculator {
    tables: Vec<TableSizeInfo>,
}

impl SizeCalculator {
    pub fn new(tables: Vec<TableSizeInfo>) -> Self {
        Self { tables }
    }

    /// Inflate vector-bearing tables when the embedding dimensionality
    /// differs from [`DEFAULT_EMBEDDING_DIMENSIONS`].
    ///
    /// Each embedding column adds `dimensions × 4` bytes to the row size.
    pub fn with_embedding_dimensions(mut self, dimensions: usize) -> Self {
        if dimensions == DEFAULT_EMBEDDING_DIMENSIONS {
            return self;
        }
        for table in &mut self.tables {
            if table.vector_columns > 0 {
                table.base_row_size += u64::from(table.vector_columns)
                    * dimensions as u64
                    * BYTES_PER_DIMENSION;
            }
        }
        self
    }

    pub fn tables(&self) -> &[TableSizeInfo] {
        &self.tables
    }

    /// Storage cost of one scale unit across all tables.
    pub fn unit_cost(&self) -> f64 {
        self.tables.iter().map(TableSizeInfo::unit_cost).sum()
    }

    /// Number of scale units that fit `target_size` bytes, never below 1.
    pub fn scale_factor(&self, target_size: i64) -> u64 {
        let unit_cost = self.unit_cost();
        if unit_cost <= 0.0 || target_size <= 0 {
            return 1;
        }
        let units = (target_size as f64 / unit_cost).round();
        if units < 1.0 {
            1
        } else {
            units as u64
        }
    }

    /// Row counts for every table. Each count is at least 1, whatever the target.
    pub fn calculate_row_counts(&self, target_size: i64) -> RowCountPlan {
        let scale_factor = self.scale_factor(target_size);
        let tables = self
            .tables
            .iter()
            .map(|table| {
                let rows = (scale_factor as f64 * table.scale_ratio) as u64;
                (table.name.clone(), rows.max(1))
            })
            .collect();
        RowCountPlan { tables }
    }

    /// Inverse of [`Self::calculate_row_counts`]: estimated bytes on disk.
    pub fn estimated_size(&self, plan: &RowCountPlan) -> u64 {
        self.tables
            .iter()
            .filter_map(|table| plan.get(&table.name).map(|rows| table.bytes_for(rows)))
            .sum::<f64>()
            .round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ecommerce_like() -> SizeCalculator {
        SizeCalculator::new(vec![
            TableSizeInfo::new("categories", 200, 20.0, 1.2),
            TableSizeInfo::new("brands", 150, 50.0, 1.2),
            TableSizeInfo::new("products", 2_400, 500.0, 1.8).with_vector_columns(1),
            TableSizeInfo::new("customers", 300, 1_000.0, 1.3),
            TableSizeInfo::new("orders", 120, 2_000.0, 1.4),
        ])
    }

    #[test]
    fn test_article_scenario() {
        let calculator = SizeCalculator::new(vec![TableSizeInfo::new("article", 3000, 500.0, 1.5)]);

        assert_eq!(calculator.unit_cost(), 2_250_000.0);
        assert_eq!(calculator.scale_factor(10_000_000), 4);

        let plan = calculator.calculate_row_counts(10_000_000);
        assert_eq!(plan.get("article"), Some(2000));
    }

    #[test]
    fn test_row_count_floor() {
        let calculator = ecommerce_like();
        for target in [0_i64, 1, 1_000_000_000, 1_000_000_000_000, -5] {
            let plan = calculator.calculate_row_counts(target);
            assert_eq!(plan.len(), 5);
            for (table, rows) in plan.iter() {
                assert!(rows >= 1, "{table} has {rows} rows for target {target}");
            }
        }
    }

    #[test]
    fn test_fractional_ratio_still_floors_to_one() {
        let calculator = SizeCalculator::new(vec![
            TableSizeInfo::new("settings", 100, 0.01, 1.0),
            TableSizeInfo::new("events", 100, 100.0, 1.0),
        ]);
        let plan = calculator.calculate_row_counts(0);
        assert_eq!(plan.get("settings"), Some(1));
        assert_eq!(plan.get("events"), Some(100));
    }

    #[test]
    fn test_round_trip_estimate_within_twenty_percent() {
        let calculator = ecommerce_like();
        let unit_cost = calculator.unit_cost() as i64;

        // Rounding the scale factor bounds the error by 0.5 / (units + 0.5),
        // so exact multiples are checked from one unit and offsets from three.
        let mut targets: Vec<i64> = [1_i64, 2, 3, 7, 50, 1234]
            .iter()
            .map(|m| unit_cost * m)
            .collect();
        for multiple in [3_i64, 7, 50, 1234] {
            for offset in [unit_cost / 3, unit_cost / 2 - 1] {
                targets.push(unit_cost * multiple + offset);
            }
        }

        for target in targets {
            let estimate = calculator.estimated_size(&calculator.calculate_row_counts(target));
            let error = (estimate as f64 - target as f64).abs() / target as f64;
            assert!(
                error <= 0.20,
                "target {target} estimated {estimate} (error {error:.3})"
            );
        }
    }

    #[test]
    fn test_embedding_dimensions_inflate_vector_tables_only() {
        let base = ecommerce_like();
        let inflated = ecommerce_like().with_embedding_dimensions(1536);

        let products = |c: &SizeCalculator| {
            c.tables()
                .iter()
                .find(|t| t.name == "products")
                .map(|t| t.base_row_size)
        };
        let customers = |c: &SizeCalculator| {
            c.tables()
                .iter()
                .find(|t| t.name == "customers")
                .map(|t| t.base_row_size)
        };

        assert_eq!(products(&inflated), Some(2_400 + 1536 * 4));
        assert_eq!(customers(&inflated), customers(&base));
    }

    #[test]
    fn test_default_dimensions_leave_sizes_untouched() {
        let calculator = ecommerce_like().with_embedding_dimensions(DEFAULT_EMBEDDING_DIMENSIONS);
        assert_eq!(calculator.unit_cost(), ecommerce_like().unit_cost());
    }

    #[test]
    fn test_plan_preserves_declaration_order() {
        let plan = ecommerce_like().calculate_row_counts(50_000_000);
        let names: Vec<&str> = plan.iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec!["categories", "brands", "products", "customers", "orders"]
        );
        assert_eq!(plan.rows("unknown"), 1);
    }
}
