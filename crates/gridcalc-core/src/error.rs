//! Error types for Gridcalc core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, saving or editing a document.
///
/// Formula failures are not errors at this level: they resolve to fallback
/// values during recompute and are reported as diagnostics.
#[derive(Error, Debug)]
pub enum GridcalcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid grid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid cell reference: {0}")]
    InvalidCellRef(String),

    #[error("Cell {cell} is beyond the sheet limits ({max_rows} rows, {max_cols} columns)")]
    CellOutOfBounds {
        cell: String,
        max_rows: usize,
        max_cols: usize,
    },

    #[error("max_depth must be between 1 and {max}, got {value}")]
    InvalidMaxDepth { value: usize, max: usize },

    #[error("Refusing to read {path}: file too large ({size} bytes, max {max})")]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("No file path set")]
    NoFilePath,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

pub type Result<T> = std::result::Result<T, GridcalcError>;
