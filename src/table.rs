//
// table.rs
// Dicom-Tag-Census
//
// Builds the exported table for one modality: derives the column order and merges rows from a prior export.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::models::Row;

/// Column-ordered rows ready for export.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Columns follow first appearance: row order, then each row's key order.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for tag in row.keys() {
                if !columns.contains(tag) {
                    columns.push(tag.clone());
                }
            }
        }
        Self { columns, rows }
    }

    /// Append prior rows that are not already present and prior columns that are missing.
    /// Returns how many prior rows were appended.
    pub fn merge(&mut self, prior: PriorExport) -> usize {
        let mut appended = 0;
        for row in prior.rows {
            if !self.rows.contains(&row) {
                self.rows.push(row);
                appended += 1;
            }
        }
        for header in prior.headers {
            if !self.columns.contains(&header) {
                self.columns.push(header);
            }
        }
        appended
    }
}

/// A previously exported table read back from disk.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PriorExport {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl PriorExport {
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open prior export {:?}", path))?;
        let headers: Vec<String> = reader
            .headers()
            .with_context(|| format!("Failed to read header row of {:?}", path))?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.is_empty() {
            bail!("Prior export {:?} has no header row", path);
        }

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record =
                record.with_context(|| format!("Malformed record {} in {:?}", idx + 1, path))?;
            let row: Row = headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }
}

/// Table for fresh rows, merged with the prior export at `prior` when given.
pub fn build_table(rows: Vec<Row>, prior: Option<&Path>) -> Result<Table> {
    let mut table = Table::from_rows(rows);
    if let Some(path) = prior {
        let prior = PriorExport::read(path)?;
        let prior_rows = prior.rows.len();
        let appended = table.merge(prior);
        info!(
            "Merged {:?}: {} of {} prior rows appended",
            path, appended, prior_rows
        );
    }
    Ok(table)
}
