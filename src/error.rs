//! Error types for the RFM engine

use polars::prelude::PolarsError;
use thiserror::Error;

/// Run-level failures. Per-row parse problems never surface here; they are
/// absorbed and counted in [`crate::data::ParseStats`].
#[derive(Error, Debug)]
pub enum RfmError {
    #[error("invalid column selection: {0}")]
    InvalidColumnSelection(String),

    #[error("no valid dates in input column '{column}'")]
    NoValidDates { column: String },

    #[error("table error: {0}")]
    Table(#[from] PolarsError),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RfmResult<T> = std::result::Result<T, RfmError>;
