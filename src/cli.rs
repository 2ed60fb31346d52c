//
// cli.rs
// Dicom-Tag-Census
//
// Defines the CLI surface with Clap and drives a run: scan, build both tables, merge prior exports and write CSVs.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::export::write_table;
use crate::logging;
use crate::metadata::DicomReader;
use crate::models::{Modality, ScanRows};
use crate::mount::{Platform, SystemMounter};
use crate::output::RunLayout;
use crate::table::build_table;
use crate::walker::Walker;

/// Command-line interface: one root to scan plus optional prior exports to build on.
#[derive(Parser, Debug)]
#[command(name = "dicom-tag-census", version)]
#[command(
    about = "Collect DICOM tags into PET and MRI CSV tables",
    long_about = None
)]
pub struct Cli {
    /// File, directory or .iso volume image to scan
    pub dicom_path: PathBuf,

    /// Update from pre-existing pet file
    #[arg(short, long, value_name = "FILE")]
    pub pet: Option<PathBuf>,

    /// Update from pre-existing mri file
    #[arg(short, long, value_name = "FILE")]
    pub mri: Option<PathBuf>,

    /// Root of the dated output directories
    #[arg(long, default_value = "data_out")]
    pub output_dir: PathBuf,

    /// Transient directory volume images are mounted under
    #[arg(long, default_value = "mount")]
    pub mount_dir: PathBuf,
}

impl Cli {
    fn prior_for(&self, modality: Modality) -> Option<&Path> {
        match modality {
            Modality::Pet => self.pet.as_deref(),
            Modality::Mri => self.mri.as_deref(),
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    run_with(&cli)
}

pub fn run_with(cli: &Cli) -> Result<()> {
    // Mounting only works on macOS and Linux; refuse before touching anything.
    let platform = Platform::current()?;

    let today = chrono::Local::now().date_naive();
    let layout = RunLayout::create(&cli.output_dir, today)?;
    logging::init(&layout.log_path())?;
    info!("Scanning {:?} into {:?}", cli.dicom_path, layout.dir());

    let mounter = SystemMounter::new(platform, &cli.mount_dir);
    let (mut rows, stats) = Walker::new(&DicomReader, &mounter).scan(&cli.dicom_path);
    info!(
        "Visited {} files: {} images read, {} outside PET/MRI, {} skipped, {} failed, {} volumes mounted",
        stats.files_visited,
        stats.images_read,
        stats.images_dropped,
        stats.skipped,
        stats.failures,
        stats.volumes_mounted
    );

    for modality in [Modality::Pet, Modality::Mri] {
        let written = export_modality(cli, &layout, &mut rows, modality)?;
        println!("{} tags: {} rows -> {:?}", modality, written, layout.export_path(modality));
    }

    Ok(())
}

fn export_modality(
    cli: &Cli,
    layout: &RunLayout,
    rows: &mut ScanRows,
    modality: Modality,
) -> Result<usize> {
    let table = build_table(rows.take(modality), cli.prior_for(modality))
        .with_context(|| format!("Failed to build {} table", modality))?;
    let path = layout.export_path(modality);
    write_table(&path, &table)?;
    info!(
        "Wrote {} table: {} rows, {} columns -> {:?}",
        modality,
        table.rows.len(),
        table.columns.len(),
        path
    );
    Ok(table.rows.len())
}
