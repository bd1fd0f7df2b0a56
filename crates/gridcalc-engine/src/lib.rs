//! gridcalc_engine - Spreadsheet formula evaluation engine.

pub mod engine;
