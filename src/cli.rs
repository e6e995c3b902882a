//! Command-line interface definitions and argument parsing

use crate::data::ColumnSelection;
use crate::generate::GeneratorConfig;
use clap::Parser;

/// Customer segmentation CLI using RFM quantile scoring on order data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file or workbook (.xlsx, .xls, .ods)
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// Column holding the order date
    #[arg(long, default_value = "order_date")]
    pub date_col: String,

    /// Column holding the customer id or name
    #[arg(long, default_value = "customer_name")]
    pub customer_col: String,

    /// Column holding the order amount
    #[arg(long, default_value = "total_amount")]
    pub amount_col: String,

    /// Write the scored table to this CSV file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Write segment and score charts; the score chart gets a `_scores` suffix
    #[arg(long)]
    pub chart: Option<String>,

    /// Number of top customers to print
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Generation mode: write synthetic orders to this path (.csv or .xlsx) and exit
    #[arg(long)]
    pub generate: Option<String>,

    /// Number of distinct customers to generate
    #[arg(long, default_value = "220")]
    pub customers: usize,

    /// Number of orders to generate
    #[arg(long, default_value = "1500")]
    pub orders: usize,

    /// Random seed for generation
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn column_selection(&self) -> ColumnSelection {
        ColumnSelection::new(&self.date_col, &self.customer_col, &self.amount_col)
    }

    /// Generator settings; `None` unless `--generate` was given
    pub fn generator_config(&self) -> crate::Result<Option<GeneratorConfig>> {
        if self.generate.is_none() {
            return Ok(None);
        }
        if self.orders == 0 {
            anyhow::bail!("--orders must be at least 1");
        }
        if self.customers == 0 {
            anyhow::bail!("--customers must be at least 1");
        }

        Ok(Some(GeneratorConfig {
            customers: self.customers,
            orders: self.orders,
            seed: self.seed,
            ..GeneratorConfig::default()
        }))
    }

    /// Tracing filter used when `RUST_LOG` is unset
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "rfmforge=debug"
        } else {
            "rfmforge=info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_generated_columns() {
        let args = Args::parse_from(["rfmforge"]);
        assert_eq!(
            args.column_selection(),
            ColumnSelection::new("order_date", "customer_name", "total_amount")
        );
        assert_eq!(args.top, 10);
        assert_eq!(args.default_log_filter(), "rfmforge=info");
    }

    #[test]
    fn test_custom_columns() {
        let args = Args::parse_from([
            "rfmforge",
            "--input",
            "orders.csv",
            "--date-col",
            "InvoiceDate",
            "--customer-col",
            "CustomerID",
            "--amount-col",
            "Total",
            "-v",
        ]);
        assert_eq!(args.input, "orders.csv");
        assert_eq!(
            args.column_selection(),
            ColumnSelection::new("InvoiceDate", "CustomerID", "Total")
        );
        assert_eq!(args.default_log_filter(), "rfmforge=debug");
    }

    #[test]
    fn test_generator_config() {
        let mut args = Args::parse_from(["rfmforge", "--customers", "5", "--orders", "20"]);
        assert_eq!(args.generator_config().unwrap(), None);

        args.generate = Some("out.csv".to_string());
        let config = args.generator_config().unwrap().unwrap();
        assert_eq!(config.customers, 5);
        assert_eq!(config.orders, 20);
        assert_eq!(config.seed, 42);

        args.orders = 0;
        assert!(args.generator_config().is_err());
    }
}
