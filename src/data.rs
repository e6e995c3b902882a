//! Data loading and RFM metric aggregation using Polars

use crate::error::{RfmError, RfmResult};
use crate::spreadsheet;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

/// Timestamp layouts tried in order after RFC 3339
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Date-only layouts; month-first for slashed dates
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%Y%m%d",
    "%d-%b-%Y",
    "%d %b %Y",
];

const CUSTOMER_COL: &str = "customer";
const TIMESTAMP_COL: &str = "order_ts";
const AMOUNT_COL: &str = "amount";
const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Names of the three input columns that drive the analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub date: String,
    pub customer: String,
    pub amount: String,
}

impl ColumnSelection {
    pub fn new(
        date: impl Into<String>,
        customer: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            customer: customer.into(),
            amount: amount.into(),
        }
    }
}

/// One input row projected to the selected columns, before any coercion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOrder {
    pub date: Option<String>,
    pub customer: Option<String>,
    pub amount: Option<String>,
}

impl RawOrder {
    pub fn new(date: &str, customer: &str, amount: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            customer: Some(customer.to_string()),
            amount: Some(amount.to_string()),
        }
    }
}

/// Customer identifier. A run keys every customer the same way, so integer
/// columns sort numerically and text columns sort lexically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CustomerKey {
    Id(i64),
    Name(String),
}

impl CustomerKey {
    /// Key every value of one customer column
    ///
    /// Surrounding whitespace is trimmed and blank values give `None`. The
    /// column is keyed by integer only when every remaining value is the
    /// canonical text of an `i64`, such as "17850" or "-3". Otherwise every
    /// value keeps its trimmed text, so "007", "7" and "+7" stay distinct.
    pub fn parse_column<'a, I>(values: I) -> Vec<Option<CustomerKey>>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let trimmed: Vec<Option<&str>> = values
            .into_iter()
            .map(|value| value.map(str::trim).filter(|text| !text.is_empty()))
            .collect();
        let integral = trimmed
            .iter()
            .flatten()
            .all(|text| canonical_id(text).is_some());

        trimmed
            .into_iter()
            .map(|value| {
                value.map(|text| match canonical_id(text) {
                    Some(id) if integral => CustomerKey::Id(id),
                    _ => CustomerKey::Name(text.to_string()),
                })
            })
            .collect()
    }
}

fn canonical_id(text: &str) -> Option<i64> {
    text.parse::<i64>()
        .ok()
        .filter(|id| id.to_string() == text)
}

impl fmt::Display for CustomerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerKey::Id(id) => write!(f, "{}", id),
            CustomerKey::Name(name) => f.write_str(name),
        }
    }
}

/// A transaction that survived date and customer filtering
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_date: NaiveDateTime,
    pub customer: CustomerKey,
    pub amount: f64,
}

/// Per-row outcomes of coercing the raw input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub rows_read: usize,
    /// Rows dropped because the date was missing or unparseable
    pub invalid_dates: usize,
    /// Rows dropped because the customer key was missing
    pub missing_customers: usize,
    /// Rows kept with their amount coerced to zero
    pub coerced_amounts: usize,
}

impl ParseStats {
    pub fn rows_kept(&self) -> usize {
        self.rows_read - self.invalid_dates - self.missing_customers
    }
}

/// Recency, frequency and monetary value for a single customer
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerMetrics {
    pub customer: CustomerKey,
    /// Whole days between the reference date and the latest order
    pub recency_days: i64,
    /// Number of orders
    pub frequency: usize,
    /// Total spend
    pub monetary: f64,
}

/// Aggregated RFM metrics for one run
#[derive(Debug, Clone)]
pub struct RfmData {
    /// One row per customer, ordered by customer key
    pub customers: Vec<CustomerMetrics>,
    /// Latest order date plus one day
    pub reference_date: NaiveDateTime,
    pub first_order: NaiveDateTime,
    pub last_order: NaiveDateTime,
    pub stats: ParseStats,
}

impl RfmData {
    /// Whole days between the earliest and latest valid order
    pub fn days_span(&self) -> i64 {
        (self.last_order - self.first_order).num_days()
    }
}

/// Read a CSV file or workbook with every column kept as text
///
/// # Arguments
/// * `file_path` - Path to a CSV file with a header row, or a workbook
///   (`.xlsx`, `.xls`, `.ods`, ...) whose first sheet has one
///
/// # Returns
/// * `DataFrame` of string columns; empty fields are null
pub fn read_table(file_path: impl AsRef<Path>) -> RfmResult<DataFrame> {
    let path = file_path.as_ref();
    if spreadsheet::is_spreadsheet(path) {
        return spreadsheet::read_workbook(path);
    }

    let df = text_csv_options()
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Read CSV content held in memory with every column kept as text
pub fn read_table_from_str(csv: &str) -> RfmResult<DataFrame> {
    let cursor = Cursor::new(csv.as_bytes().to_vec());
    let df = text_csv_options()
        .into_reader_with_file_handle(cursor)
        .finish()?;
    Ok(df)
}

fn text_csv_options() -> CsvReadOptions {
    // Zero-length schema inference reads every column as String
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
}

/// Project a table to the three selected columns
///
/// # Arguments
/// * `df` - Input table; columns of any dtype are cast to text
/// * `selection` - Names of the date, customer and amount columns
///
/// # Returns
/// * One `RawOrder` per table row, in row order
pub fn select_columns(df: &DataFrame, selection: &ColumnSelection) -> RfmResult<Vec<RawOrder>> {
    if df.height() == 0 {
        return Err(RfmError::InvalidColumnSelection(
            "input table has no rows".to_string(),
        ));
    }

    let dates = text_column(df, &selection.date)?;
    let customers = text_column(df, &selection.customer)?;
    let amounts = text_column(df, &selection.amount)?;

    let rows = dates
        .into_iter()
        .zip(customers)
        .zip(amounts)
        .map(|((date, customer), amount)| RawOrder {
            date,
            customer,
            amount,
        })
        .collect();

    Ok(rows)
}

fn text_column(df: &DataFrame, name: &str) -> RfmResult<Vec<Option<String>>> {
    if df.get_column_index(name).is_none() {
        return Err(RfmError::InvalidColumnSelection(format!(
            "column '{}' not found in input table",
            name
        )));
    }

    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_owned))
        .collect();
    Ok(values)
}

/// Parse an order timestamp, returning `None` for anything unrecognised
pub fn parse_order_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Parse an order amount; non-numeric and non-finite values give `None`
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Coerce raw rows into typed orders
///
/// Rows with an unparseable date or a missing customer are dropped.
/// Unparseable amounts become zero and the row is kept.
pub fn parse_orders(rows: &[RawOrder]) -> (Vec<OrderRecord>, ParseStats) {
    let mut stats = ParseStats {
        rows_read: rows.len(),
        ..ParseStats::default()
    };
    let mut orders = Vec::with_capacity(rows.len());
    let keys = CustomerKey::parse_column(rows.iter().map(|row| row.customer.as_deref()));

    for (row, key) in rows.iter().zip(keys) {
        let Some(order_date) = row.date.as_deref().and_then(parse_order_date) else {
            stats.invalid_dates += 1;
            continue;
        };
        let Some(customer) = key else {
            stats.missing_customers += 1;
            continue;
        };
        let amount = match row.amount.as_deref().and_then(parse_amount) {
            Some(amount) => amount,
            None => {
                stats.coerced_amounts += 1;
                0.0
            }
        };

        orders.push(OrderRecord {
            order_date,
            customer,
            amount,
        });
    }

    (orders, stats)
}

/// Compute RFM metrics from rows already projected to the selected columns
pub fn compute_rfm_features(rows: &[RawOrder], selection: &ColumnSelection) -> RfmResult<RfmData> {
    if rows.is_empty() {
        return Err(RfmError::InvalidColumnSelection(
            "input table has no rows".to_string(),
        ));
    }

    let (orders, stats) = parse_orders(rows);

    tracing::debug!(
        rows_read = stats.rows_read,
        invalid_dates = stats.invalid_dates,
        missing_customers = stats.missing_customers,
        coerced_amounts = stats.coerced_amounts,
        "parsed order rows"
    );

    if stats.invalid_dates == stats.rows_read {
        return Err(RfmError::NoValidDates {
            column: selection.date.clone(),
        });
    }

    aggregate_orders(&orders, stats)
}

/// Group orders by customer and derive recency, frequency and monetary value
///
/// # Returns
/// * `RfmData` with one metrics row per customer, sorted by key, and the
///   reference date one day past the latest order
pub fn aggregate_orders(orders: &[OrderRecord], stats: ParseStats) -> RfmResult<RfmData> {
    let (Some(first_order), Some(last_order)) = (
        orders.iter().map(|o| o.order_date).min(),
        orders.iter().map(|o| o.order_date).max(),
    ) else {
        return Err(RfmError::InvalidColumnSelection(
            "no usable rows: every dated row is missing a customer key".to_string(),
        ));
    };

    // Anchor one day past the latest order so recency is never zero
    let reference_date = last_order + Duration::days(1);
    let reference_micros = reference_date.and_utc().timestamp_micros();

    let rfm_df = orders_frame(orders)?
        .lazy()
        .group_by([col(CUSTOMER_COL)])
        .agg([
            // Recency: latest order per customer
            col(TIMESTAMP_COL).max().alias("last_order"),
            // Frequency: number of order rows
            col(TIMESTAMP_COL).count().alias("frequency"),
            // Monetary: total spending
            col(AMOUNT_COL).sum().alias("monetary"),
        ])
        .with_columns([
            // Whole days, truncated
            (lit(reference_micros) - col("last_order"))
                .floor_div(lit(MICROS_PER_DAY))
                .alias("recency"),
        ])
        .sort([CUSTOMER_COL], SortMultipleOptions::default())
        .collect()?;

    let customers = extract_metrics(&rfm_df)?;

    tracing::debug!(
        customers = customers.len(),
        reference_date = %reference_date,
        "aggregated customer metrics"
    );

    Ok(RfmData {
        customers,
        reference_date,
        first_order,
        last_order,
        stats,
    })
}

/// Orders as a frame of customer key, epoch microseconds and amount
fn orders_frame(orders: &[OrderRecord]) -> PolarsResult<DataFrame> {
    let ids: Option<Vec<i64>> = orders
        .iter()
        .map(|order| match order.customer {
            CustomerKey::Id(id) => Some(id),
            CustomerKey::Name(_) => None,
        })
        .collect();
    let customer = match ids {
        Some(ids) => Column::new(CUSTOMER_COL.into(), ids),
        None => {
            let names: Vec<String> = orders.iter().map(|o| o.customer.to_string()).collect();
            Column::new(CUSTOMER_COL.into(), names)
        }
    };

    let timestamps: Vec<i64> = orders
        .iter()
        .map(|o| o.order_date.and_utc().timestamp_micros())
        .collect();
    let amounts: Vec<f64> = orders.iter().map(|o| o.amount).collect();

    DataFrame::new(vec![
        customer,
        Column::new(TIMESTAMP_COL.into(), timestamps),
        Column::new(AMOUNT_COL.into(), amounts),
    ])
}

/// Pull the aggregated columns back out as typed rows
fn extract_metrics(df: &DataFrame) -> RfmResult<Vec<CustomerMetrics>> {
    let customer = df.column(CUSTOMER_COL)?;
    let customers: Vec<CustomerKey> = if customer.dtype() == &DataType::Int64 {
        customer
            .i64()?
            .into_no_null_iter()
            .map(CustomerKey::Id)
            .collect()
    } else {
        customer
            .str()?
            .into_no_null_iter()
            .map(|name| CustomerKey::Name(name.to_string()))
            .collect()
    };

    let recency: Vec<i64> = df
        .column("recency")?
        .cast(&DataType::Int64)?
        .i64()?
        .into_no_null_iter()
        .collect();

    let frequency: Vec<i64> = df
        .column("frequency")?
        .cast(&DataType::Int64)?
        .i64()?
        .into_no_null_iter()
        .collect();

    let monetary: Vec<f64> = df
        .column("monetary")?
        .f64()?
        .into_no_null_iter()
        .collect();

    let metrics = customers
        .into_iter()
        .zip(recency)
        .zip(frequency)
        .zip(monetary)
        .map(|(((customer, recency_days), frequency), monetary)| CustomerMetrics {
            customer,
            recency_days,
            frequency: frequency as usize,
            monetary,
        })
        .collect();

    Ok(metrics)
}
