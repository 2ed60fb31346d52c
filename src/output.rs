//
// output.rs
// Dicom-Tag-Census
//
// Per-run output layout: one dated directory holding the run log and both CSV tables.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::models::Modality;

#[derive(Debug, Clone)]
pub struct RunLayout {
    dir: PathBuf,
    stamp: String,
}

impl RunLayout {
    /// Create `<root>/<YYYY_MM_DD>` (and `root` itself) if missing.
    pub fn create(root: &Path, date: NaiveDate) -> Result<Self> {
        let stamp = date.format("%Y_%m_%d").to_string();
        let dir = root.join(&stamp);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
        Ok(Self { dir, stamp })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(format!("{}_log.txt", self.stamp))
    }

    pub fn export_path(&self, modality: Modality) -> PathBuf {
        self.dir
            .join(format!("{}_tags_{}.csv", modality.file_prefix(), self.stamp))
    }
}
