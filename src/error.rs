// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown repository type: {0:?}")]
    UnsupportedKind(String),

    #[error("Could not fetch {location}: {reason}")]
    Fetch { location: String, reason: String },

    #[error("No commit authors found in the history of package {package:?}")]
    EmptyHistory { package: String },

    #[error("No node named {0:?} in the graph")]
    NotFound(String),

    #[error("Value {value} is outside the allowed range [{min}, {max}]")]
    Range { value: f64, min: f64, max: f64 },

    #[error("Invalid input row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("Could not download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub fn fetch(location: impl Into<String>, reason: impl ToString) -> Self {
        Error::Fetch { location: location.into(), reason: reason.to_string() }
    }
}
