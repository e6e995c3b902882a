//! rfmforge: Customer segmentation CLI using RFM quantile scoring
//!
//! This is the main entrypoint that orchestrates data loading, scoring,
//! export, visualization, and synthetic data generation.

use anyhow::{Context, Result};
use clap::Parser;
use rfmforge::{analyze_file, export, generate, viz, Args, GeneratorConfig};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(&args);

    if args.verbose {
        println!("rfmforge - Customer Segmentation using RFM Scores");
        println!("=================================================\n");
    }

    // Check if in generation mode
    if let Some(config) = args.generator_config()? {
        run_generation_mode(&args, &config)?;
    } else {
        run_full_pipeline(&args)?;
    }

    Ok(())
}

fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Write synthetic order data and exit
fn run_generation_mode(args: &Args, config: &GeneratorConfig) -> Result<()> {
    println!("=== Generation Mode ===");

    let output = args.generate.as_deref().unwrap_or("sales_data.csv");
    let orders = generate::generate_orders(config)?;
    generate::write_orders(&orders, output)
        .with_context(|| format!("Failed to write generated orders to {}", output))?;

    println!(
        "✓ Generated {} orders for up to {} customers",
        orders.len(),
        config.customers
    );
    println!("  Saved to: {}", output);

    Ok(())
}

/// Run the full RFM pipeline
fn run_full_pipeline(args: &Args) -> Result<()> {
    println!("=== RFM Analysis Pipeline ===\n");

    let start_time = Instant::now();
    let selection = args.column_selection();

    if args.verbose {
        println!("Step 1: Loading and scoring data");
        println!("  Input file: {}", args.input);
        println!(
            "  Columns: date={}, customer={}, amount={}",
            selection.date, selection.customer, selection.amount
        );
    }

    let report = analyze_file(&args.input, &selection)
        .with_context(|| format!("RFM analysis failed for {}", args.input))?;
    let summary = report.summary();
    let stats = report.data.stats;

    println!("✓ Data loaded: {} customers", summary.customers);
    if args.verbose {
        println!("  Rows read: {}", stats.rows_read);
        println!("  Rows kept: {}", stats.rows_kept());
        println!("  Dropped (invalid date): {}", stats.invalid_dates);
        println!("  Dropped (missing customer): {}", stats.missing_customers);
        println!("  Amounts coerced to zero: {}", stats.coerced_amounts);
    }

    for fallback in &report.scored.fallbacks {
        println!("⚠ {}", fallback);
    }

    println!("\n=== Date Range ===");
    println!("Min date in data: {}", summary.first_order);
    println!("Max date in data: {}", summary.last_order);
    println!(
        "Analysis covers {} days (reference date {})",
        summary.days_span,
        summary.reference_date.date()
    );

    println!("\n=== Summary ===");
    println!("Customers: {}", summary.customers);
    println!("Avg Recency: {:.1} days", summary.avg_recency);
    println!("Avg Monetary: {:.2}", summary.avg_monetary);

    println!("\n=== Top {} Customers ===", args.top.min(summary.customers));
    println!(
        "  {:<20} | {:>7} | {:>9} | {:>12} | R | F | M | Score | Segment",
        "Customer", "Recency", "Frequency", "Monetary"
    );
    for customer in report.scored.ranked().into_iter().take(args.top) {
        println!(
            "  {:<20} | {:>7} | {:>9} | {:>12.2} | {} | {} | {} | {:>5} | {}",
            customer.metrics.customer.to_string(),
            customer.metrics.recency_days,
            customer.metrics.frequency,
            customer.metrics.monetary,
            customer.r_score,
            customer.f_score,
            customer.m_score,
            customer.composite_score,
            customer.segment
        );
    }

    if let Some(output) = &args.output {
        export::export_scored_csv(&report.scored, output)
            .with_context(|| format!("Failed to export results to {}", output))?;
        println!("\n✓ Results exported to: {}", output);
    }

    if let Some(chart) = &args.chart {
        if args.verbose {
            println!("\nStep 2: Generating visualizations");
        }
        viz::generate_visualization_report(&report, chart)?;
    } else {
        viz::print_segment_statistics(&report);
    }

    let total_time = start_time.elapsed();
    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", total_time.as_secs_f64());

    Ok(())
}
