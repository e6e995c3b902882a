//! End-to-end RFM run: aggregate, score, summarise

use crate::data::{self, ColumnSelection, RawOrder, RfmData};
use crate::error::RfmResult;
use crate::model::{score_customers, ScoredTable};
use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use std::path::Path;

/// Complete output of one run
#[derive(Debug, Clone)]
pub struct RfmReport {
    pub data: RfmData,
    pub scored: ScoredTable,
}

/// Headline figures for a run
#[derive(Debug, Clone, PartialEq)]
pub struct RfmSummary {
    pub customers: usize,
    pub avg_recency: f64,
    pub avg_monetary: f64,
    pub first_order: NaiveDateTime,
    pub last_order: NaiveDateTime,
    pub reference_date: NaiveDateTime,
    pub days_span: i64,
}

impl RfmReport {
    pub fn summary(&self) -> RfmSummary {
        let customers = &self.data.customers;
        let n = customers.len().max(1) as f64;

        RfmSummary {
            customers: customers.len(),
            avg_recency: customers.iter().map(|c| c.recency_days as f64).sum::<f64>() / n,
            avg_monetary: customers.iter().map(|c| c.monetary).sum::<f64>() / n,
            first_order: self.data.first_order,
            last_order: self.data.last_order,
            reference_date: self.data.reference_date,
            days_span: self.data.days_span(),
        }
    }
}

/// Run the full pipeline on rows already projected to the selected columns
pub fn run_rfm(rows: &[RawOrder], selection: &ColumnSelection) -> RfmResult<RfmReport> {
    let data = data::compute_rfm_features(rows, selection)?;
    let scored = score_customers(&data.customers);
    Ok(RfmReport { data, scored })
}

/// Run the full pipeline on an in-memory table
pub fn analyze_table(df: &DataFrame, selection: &ColumnSelection) -> RfmResult<RfmReport> {
    let rows = data::select_columns(df, selection)?;
    run_rfm(&rows, selection)
}

/// Run the full pipeline on a CSV file or workbook
pub fn analyze_file(
    file_path: impl AsRef<Path>,
    selection: &ColumnSelection,
) -> RfmResult<RfmReport> {
    let df = data::read_table(file_path)?;
    analyze_table(&df, selection)
}
