//! Row-count plans rendered without touching a database.

use crate::config::format_size;
use crate::stats::format_number;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Color, Table};
use serde::Serialize;
use workload_core::Workload;

/// One table of a computed plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePlan {
    pub table: String,
    pub rows: u64,
    pub estimated_bytes: u64,
}

/// Row counts and size estimate for a workload at a target size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizePlan {
    pub workload: String,
    pub target_size: i64,
    pub dimensions: usize,
    pub scale_factor: u64,
    pub tables: Vec<TablePlan>,
    pub estimated_size: u64,
}

impl SizePlan {
    pub fn compute(workload: &dyn Workload, target_size: i64, dimensions: usize) -> Self {
        let calculator = workload.size_calculator(dimensions);
        let plan = calculator.calculate_row_counts(target_size);
        let tables = calculator
            .tables()
            .iter()
            .map(|info| {
                let rows = plan.rows(&info.name);
                TablePlan {
                    table: info.name.clone(),
                    rows,
                    estimated_bytes: info.bytes_for(rows).round() as u64,
                }
            })
            .collect();

        Self {
            workload: workload.name().to_string(),
            target_size,
            dimensions,
            scale_factor: calculator.scale_factor(target_size),
            tables,
            estimated_size: calculator.estimated_size(&plan),
        }
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }

    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Table", "Rows", "Estimated size"]);

        for entry in &self.tables {
            table.add_row(vec![
                Cell::new(&entry.table),
                Cell::new(format_number(entry.rows)).set_alignment(CellAlignment::Right),
                Cell::new(format_size(entry.estimated_bytes)).set_alignment(CellAlignment::Right),
            ]);
        }
        table.add_row(vec![
            Cell::new("TOTAL").fg(Color::Cyan),
            Cell::new(format_number(self.total_rows())).set_alignment(CellAlignment::Right),
            Cell::new(format_size(self.estimated_size)).set_alignment(CellAlignment::Right),
        ]);

        format!(
            "Workload '{}': target {}, {} dimensions, scale factor {}\n{}",
            self.workload,
            format_size(self.target_size.max(0) as u64),
            self.dimensions,
            self.scale_factor,
            table
        )
    }
}
