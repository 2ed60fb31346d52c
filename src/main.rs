//
// main.rs
// Dicom-Tag-Census
//
// Entry point that hands off execution to the CLI layer.
//
// Thales Matheus Mendonça Santos - November 2025

use dicom_tag_census::cli;

fn main() -> anyhow::Result<()> {
    cli::run()
}
