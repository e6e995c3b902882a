//! Synthetic order data for demos and fixtures

use crate::spreadsheet;
use chrono::{Datelike, Duration, NaiveDate};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::fs::File;
use std::path::Path;

const ORDER_COLUMNS: [&str; 3] = ["customer_name", "total_amount", "order_date"];

/// Parameters for [`generate_orders`]
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub customers: usize,
    pub orders: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub min_amount: f64,
    pub max_amount: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            customers: 220,
            orders: 1500,
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default(),
            min_amount: 500.0,
            max_amount: 50_000.0,
            seed: 42,
        }
    }
}

/// One generated sale
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticOrder {
    pub customer_name: String,
    pub total_amount: f64,
    pub order_date: NaiveDate,
}

/// Generate random orders sorted by date
///
/// # Arguments
/// * `config` - Customer pool size, order count, date window, amount range and seed
///
/// # Returns
/// * Orders for customers named `Customer_<n>`, amounts rounded to cents
pub fn generate_orders(config: &GeneratorConfig) -> crate::Result<Vec<SyntheticOrder>> {
    if config.customers == 0 {
        anyhow::bail!("Customer pool must not be empty");
    }
    if config.end < config.start {
        anyhow::bail!(
            "End date {} is before start date {}",
            config.end,
            config.start
        );
    }
    if !(config.min_amount <= config.max_amount) {
        anyhow::bail!(
            "Invalid amount range {}..{}",
            config.min_amount,
            config.max_amount
        );
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let span_days = (config.end - config.start).num_days();

    let mut orders: Vec<SyntheticOrder> = (0..config.orders)
        .map(|_| {
            let customer = rng.gen_range(1..=config.customers);
            let amount = rng.gen_range(config.min_amount..=config.max_amount);
            let offset = rng.gen_range(0..=span_days);
            SyntheticOrder {
                customer_name: format!("Customer_{}", customer),
                total_amount: (amount * 100.0).round() / 100.0,
                order_date: config.start + Duration::days(offset),
            }
        })
        .collect();

    orders.sort_by_key(|order| order.order_date);
    Ok(orders)
}

/// Table with columns `customer_name`, `total_amount`, `order_date`
pub fn orders_frame(orders: &[SyntheticOrder]) -> PolarsResult<DataFrame> {
    let names: Vec<String> = orders.iter().map(|o| o.customer_name.clone()).collect();
    let amounts: Vec<f64> = orders.iter().map(|o| o.total_amount).collect();
    let dates: Vec<String> = orders
        .iter()
        .map(|o| o.order_date.format("%Y-%m-%d").to_string())
        .collect();

    df!(
        ORDER_COLUMNS[0] => names,
        ORDER_COLUMNS[1] => amounts,
        ORDER_COLUMNS[2] => dates
    )
}

/// Write generated orders as `.xlsx` or CSV, chosen by the path's extension
pub fn write_orders(orders: &[SyntheticOrder], output_path: &str) -> crate::Result<()> {
    let path = Path::new(output_path);
    let is_xlsx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));

    if is_xlsx {
        write_orders_xlsx(orders, output_path)
    } else if spreadsheet::is_spreadsheet(path) {
        anyhow::bail!("Only .xlsx workbooks can be generated, got {}", output_path)
    } else {
        write_orders_csv(orders, output_path)
    }
}

/// Write generated orders to a CSV file
pub fn write_orders_csv(orders: &[SyntheticOrder], output_path: &str) -> crate::Result<()> {
    let mut df = orders_frame(orders)?;
    let file = File::create(Path::new(output_path))?;
    CsvWriter::new(file).include_header(true).finish(&mut df)?;
    Ok(())
}

/// Write generated orders to a single-sheet `.xlsx` workbook with real date cells
pub fn write_orders_xlsx(orders: &[SyntheticOrder], output_path: &str) -> crate::Result<()> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let worksheet = workbook.add_worksheet();

    for (col, name) in ORDER_COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *name)?;
    }

    for (i, order) in orders.iter().enumerate() {
        let row = (i + 1) as u32;
        let date = ExcelDateTime::from_ymd(
            order.order_date.year() as u16,
            order.order_date.month() as u8,
            order.order_date.day() as u8,
        )?;
        worksheet.write_string(row, 0, &order.customer_name)?;
        worksheet.write_number(row, 1, order.total_amount)?;
        worksheet.write_datetime_with_format(row, 2, &date, &date_format)?;
    }

    workbook.save(output_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_config() -> GeneratorConfig {
        GeneratorConfig {
            customers: 5,
            orders: 50,
            seed: 7,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_generate_orders_respects_config() {
        let config = small_config();
        let orders = generate_orders(&config).unwrap();

        assert_eq!(orders.len(), 50);
        for order in &orders {
            assert!(order.order_date >= config.start && order.order_date <= config.end);
            assert!(order.total_amount >= 500.0 && order.total_amount <= 50_000.0);
            let id: usize = order.customer_name["Customer_".len()..].parse().unwrap();
            assert!((1..=5).contains(&id));
        }
        assert!(orders.windows(2).all(|w| w[0].order_date <= w[1].order_date));
    }

    #[test]
    fn test_generate_orders_is_seeded() {
        let a = generate_orders(&small_config()).unwrap();
        let b = generate_orders(&small_config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = small_config();
        config.customers = 0;
        assert!(generate_orders(&config).is_err());

        let mut config = small_config();
        config.end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(generate_orders(&config).is_err());
    }

    #[test]
    fn test_write_orders_csv() {
        let orders = generate_orders(&small_config()).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        let path_str = path.to_str().unwrap();

        write_orders_csv(&orders, path_str).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("customer_name,total_amount,order_date"));
        assert_eq!(text.lines().count(), 51);
    }

    #[test]
    fn test_write_orders_xlsx_reads_back() {
        let orders = generate_orders(&small_config()).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.xlsx");

        write_orders(&orders, path.to_str().unwrap()).unwrap();

        let df = crate::data::read_table(&path).unwrap();
        assert_eq!(df.height(), 50);
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(names, ORDER_COLUMNS.to_vec());

        let first_date = df.column("order_date").unwrap().str().unwrap().get(0);
        let expected = format!("{} 00:00:00", orders[0].order_date.format("%Y-%m-%d"));
        assert_eq!(first_date, Some(expected.as_str()));
    }
}
