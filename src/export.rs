//
// export.rs
// Dicom-Tag-Census
//
// Writes a table to CSV with a header row and fields in column order.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

use crate::table::Table;

/// Overwrite `path` with the table. Missing fields are written empty.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    // Nothing was found and nothing was merged: leave an empty file rather than a blank header.
    if table.columns.is_empty() {
        return Ok(());
    }

    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(&table.columns)
        .with_context(|| format!("Failed to write header to {:?}", path))?;
    for row in &table.rows {
        let record = table
            .columns
            .iter()
            .map(|column| row.get(column).map(String::as_str).unwrap_or(""));
        writer
            .write_record(record)
            .with_context(|| format!("Failed to write row to {:?}", path))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {:?}", path))?;
    Ok(())
}
