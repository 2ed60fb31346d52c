//
// error.rs
// Dicom-Tag-Census
//
// Error types for reading single images and for mounting volume images.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use thiserror::Error;

/// Failures from the image reader. `NotDicom` is routine and never logged by the walker.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("{0:?} is not a DICOM file")]
    NotDicom(PathBuf),

    #[error("Failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse DICOM file {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: dicom::object::ReadError,
    },

    #[error("{path:?} has no {attribute} attribute")]
    MissingAttribute {
        path: PathBuf,
        attribute: &'static str,
    },
}

impl ReadError {
    pub fn is_not_dicom(&self) -> bool {
        matches!(self, ReadError::NotDicom(_))
    }
}

/// Failures from the platform mount layer.
#[derive(Error, Debug)]
pub enum MountError {
    #[error("Error: This program must be run on MacOS or Linux (detected {0})")]
    UnsupportedPlatform(String),

    #[error("Failed to prepare mount point {path:?}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run {program}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status} while mounting {image:?}: {stderr}")]
    Command {
        program: &'static str,
        image: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Failed to remove mount point {path:?}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
