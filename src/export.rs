//! CSV export of the scored table

use crate::error::RfmResult;
use crate::model::ScoredTable;
use polars::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Header of the exported file, in column order
pub const EXPORT_COLUMNS: [&str; 9] = [
    "Customer",
    "Recency",
    "Frequency",
    "Monetary",
    "R",
    "F",
    "M",
    "RFM_Score",
    "Segment",
];

/// Build a flat table of scalar columns from the scored customers
pub fn scored_frame(table: &ScoredTable) -> RfmResult<DataFrame> {
    let rows = &table.customers;

    let customer: Vec<String> = rows.iter().map(|c| c.metrics.customer.to_string()).collect();
    let recency: Vec<i64> = rows.iter().map(|c| c.metrics.recency_days).collect();
    let frequency: Vec<i64> = rows.iter().map(|c| c.metrics.frequency as i64).collect();
    let monetary: Vec<f64> = rows.iter().map(|c| c.metrics.monetary).collect();
    let r: Vec<i32> = rows.iter().map(|c| i32::from(c.r_score)).collect();
    let f: Vec<i32> = rows.iter().map(|c| i32::from(c.f_score)).collect();
    let m: Vec<i32> = rows.iter().map(|c| i32::from(c.m_score)).collect();
    let composite: Vec<i32> = rows.iter().map(|c| i32::from(c.composite_score)).collect();
    let segment: Vec<String> = rows.iter().map(|c| c.segment.to_string()).collect();

    let df = df!(
        "Customer" => customer,
        "Recency" => recency,
        "Frequency" => frequency,
        "Monetary" => monetary,
        "R" => r,
        "F" => f,
        "M" => m,
        "RFM_Score" => composite,
        "Segment" => segment
    )?;
    Ok(df)
}

/// Write the scored table as UTF-8 CSV with a header row
pub fn write_scored_csv<W: Write>(table: &ScoredTable, writer: W) -> RfmResult<()> {
    let mut df = scored_frame(table)?;
    CsvWriter::new(writer)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

/// Write the scored table to a CSV file
pub fn export_scored_csv(table: &ScoredTable, output_path: impl AsRef<Path>) -> RfmResult<()> {
    let file = File::create(output_path.as_ref())?;
    write_scored_csv(table, file)?;
    tracing::info!(path = %output_path.as_ref().display(), rows = table.len(), "exported scored table");
    Ok(())
}
