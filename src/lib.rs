//
// lib.rs
// Dicom-Tag-Census
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - November 2025

// Pipeline order: walker -> table -> export, with metadata and mount as the walker's collaborators.
pub mod cli;
pub mod error;
pub mod export;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod mount;
pub mod output;
pub mod table;
pub mod walker;

pub use cli::{run as run_cli, Cli};
pub use error::{MountError, ReadError};
