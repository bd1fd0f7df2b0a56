//! gridcalc-core - UI-agnostic document model, grid storage and configuration.

pub mod config;
pub mod document;
pub mod error;

pub use config::Config;
pub use document::Document;
pub use error::{GridcalcError, Result};

pub use gridcalc_engine::engine::CellRef;
