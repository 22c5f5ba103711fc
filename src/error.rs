//! Error types for splitting and printing.
//!
//! Parameter and load errors abort an operation before anything is written.
//! The remaining variants describe a single output file and are collected
//! into split and print results instead of being returned.

use std::path::PathBuf;

use thiserror::Error;

use crate::partition::UnitRange;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad pages-per-part value, malformed range or option string.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The input document could not be opened or has no pages.
    #[error("Failed to load {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    /// The pages of one range could not be copied into a new document.
    #[error("Failed to extract pages {range}: {reason}")]
    Extract { range: UnitRange, reason: String },

    /// An output file could not be written.
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The print system rejected a job or could not be reached.
    #[error("Print failed for {}: {reason}", .path.display())]
    Print { path: PathBuf, reason: String },

    /// Printers could not be listed or queried.
    #[error("Printer query failed: {0}")]
    PrinterQuery(String),

    /// This print backend cannot run here, e.g. its command is not installed.
    #[error("Print backend unavailable: {0}")]
    PrintUnavailable(String),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Only PDF files are supported for printing: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Work was not started because the operation was cancelled.
    #[error("Cancelled before processing")]
    Cancelled,

    /// Internal contract breach; always a bug in the caller.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
