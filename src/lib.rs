//! rfmforge: A Rust CLI application for RFM customer segmentation
//!
//! This library aggregates order records into per-customer Recency,
//! Frequency and Monetary metrics, scores each metric 1-5 by quantile
//! binning, and maps the composite score onto a named segment.

pub mod binning;
pub mod cli;
pub mod data;
pub mod error;
pub mod export;
pub mod generate;
pub mod model;
pub mod report;
pub mod spreadsheet;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{
    ColumnSelection, CustomerKey, CustomerMetrics, OrderRecord, ParseStats, RawOrder, RfmData,
};
pub use error::{RfmError, RfmResult};
pub use generate::GeneratorConfig;
pub use model::{score_customers, BinningFallback, Metric, ScoredCustomer, ScoredTable, Segment};
pub use report::{analyze_file, analyze_table, run_rfm, RfmReport, RfmSummary};

/// Common result type used by the application layer
pub type Result<T> = anyhow::Result<T>;
