//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, raster, HTTP, archive and JSON errors, and provides semantic
//! variants for argument validation, external commands and processing failures.
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Raster error: {0}")]
    Raster(#[from] crate::io::RasterError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("Directory '{}' does not exist", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("`{program}` failed ({status}): {stderr}")]
    ExternalCommand {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Lock file {} is held by another run", path.display())]
    LockHeld { path: PathBuf },

    #[error("Processing error: {0}")]
    Processing(String),
}
