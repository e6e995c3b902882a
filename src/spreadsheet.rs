//! Workbook input: the first worksheet becomes an all-text table

use crate::error::{RfmError, RfmResult};
use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::{Column, DataFrame};
use std::collections::HashSet;
use std::path::Path;

/// File extensions read through the workbook reader instead of the CSV reader
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Layout used for date cells so they match the text date parser
const CELL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// True when the path has a workbook extension (case-insensitive)
pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Read the first worksheet of a workbook
///
/// # Arguments
/// * `file_path` - Path to an `.xlsx`, `.xlsm`, `.xlsb`, `.xls` or `.ods` file
///
/// # Returns
/// * `DataFrame` of string columns named after the header row; empty and
///   error cells are null
pub fn read_workbook(file_path: &Path) -> RfmResult<DataFrame> {
    let mut workbook = open_workbook_auto(file_path)?;
    let range = workbook.worksheet_range_at(0).ok_or_else(|| {
        RfmError::InvalidColumnSelection(format!(
            "workbook '{}' has no worksheets",
            file_path.display()
        ))
    })??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(RfmError::InvalidColumnSelection(
            "worksheet is empty".to_string(),
        ));
    };
    let names = header_names(header);

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (j, column) in values.iter_mut().enumerate() {
            column.push(row.get(j).and_then(cell_text));
        }
    }

    let columns: Vec<Column> = names
        .into_iter()
        .zip(values)
        .map(|(name, column)| Column::new(name.into(), column))
        .collect();

    let df = DataFrame::new(columns)?;
    tracing::debug!(
        path = %file_path.display(),
        rows = df.height(),
        columns = df.width(),
        "read worksheet"
    );
    Ok(df)
}

/// Header cells as column names; blank headers become `column_<n>` and
/// repeated names get a `.<n>` suffix
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let base = cell_text(cell)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("column_{}", i));

            let mut name = base.clone();
            let mut n = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(text) => Some(text.clone()),
        Data::Int(value) => Some(value.to_string()),
        // Whole floats print without a fraction, so 17850.0 reads as "17850"
        Data::Float(value) => Some(value.to_string()),
        Data::Bool(value) => Some(value.to_string()),
        Data::DateTime(value) => value
            .as_datetime()
            .map(|dt| dt.format(CELL_DATETIME_FORMAT).to_string()),
        other => Some(other.to_string()),
    }
}
