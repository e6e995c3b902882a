//! Visualization functions using Plotters for segment analysis

use crate::model::{Segment, ScoredTable};
use crate::report::RfmReport;
use plotters::prelude::*;

/// Bar colors, cycled by bar index
const BAR_COLORS: [RGBColor; 5] = [RED, BLUE, GREEN, MAGENTA, CYAN];

/// Short axis labels for the segment chart
fn segment_label(segment: Segment) -> &'static str {
    match segment {
        Segment::Champions => "Champ",
        Segment::LoyalCustomers => "Loyal",
        Segment::PotentialLoyalists => "PotLoyal",
        Segment::RecentCustomers => "Recent",
        Segment::Promising => "Promising",
        Segment::CustomersNeedingAttention => "NeedAttn",
        Segment::AboutToSleep => "Sleepy",
        Segment::AtRisk => "AtRisk",
        Segment::CantLoseThem => "CantLose",
        Segment::Hibernating => "Hibern",
        Segment::Lost => "Lost",
    }
}

/// Path of the composite score chart that accompanies `base_output_path`
pub fn score_chart_path(base_output_path: &str) -> String {
    match base_output_path.strip_suffix(".png") {
        Some(stem) => format!("{}_scores.png", stem),
        None => format!("{}_scores.png", base_output_path),
    }
}

/// Create a bar chart of customers per segment
///
/// # Arguments
/// * `table` - Scored customers
/// * `output_path` - Path to save the PNG chart
///
/// # Returns
/// * Result indicating success or failure
pub fn create_segment_chart(table: &ScoredTable, output_path: &str) -> crate::Result<()> {
    let counts = table.segment_counts();
    let max_count = counts.iter().map(|(_, n)| *n).max().unwrap_or(1).max(1) as f64;

    let root = BitMapBackend::new(output_path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Customers per Segment", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(counts.len() as f64 - 0.5), 0f64..(max_count * 1.1))?;

    let label_for = |x: &f64| {
        let idx = x.round();
        if idx < 0.0 || (x - idx).abs() > 1e-6 {
            return String::new();
        }
        Segment::ALL
            .get(idx as usize)
            .map(|segment| segment_label(*segment).to_string())
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .x_labels(counts.len())
        .x_label_formatter(&label_for)
        .x_desc("Segment")
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (idx, (_, count)) in counts.iter().enumerate() {
        let color = &BAR_COLORS[idx % BAR_COLORS.len()];
        chart.draw_series(std::iter::once(Rectangle::new(
            [(idx as f64 - 0.4, 0.0), (idx as f64 + 0.4, *count as f64)],
            color.filled(),
        )))?;
    }

    root.present()?;
    println!("Segment chart saved to: {}", output_path);

    Ok(())
}

/// Create a histogram of composite RFM scores
pub fn create_score_distribution_chart(table: &ScoredTable, output_path: &str) -> crate::Result<()> {
    let distribution = table.composite_distribution();
    let max_count = distribution.iter().map(|(_, n)| *n).max().unwrap_or(1).max(1) as f64;
    let (low, high) = match (distribution.first(), distribution.last()) {
        (Some((low, _)), Some((high, _))) => (*low as f64, *high as f64),
        _ => (0.0, 1.0),
    };

    let root = BitMapBackend::new(output_path, (700, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("RFM Score Distribution", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((low - 0.5)..(high + 0.5), 0f64..(max_count * 1.1))?;

    chart
        .configure_mesh()
        .x_desc("RFM Score")
        .y_desc("Number of Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(distribution.iter().map(|(score, count)| {
        let x = *score as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *count as f64)], BLUE.filled())
    }))?;

    root.present()?;
    println!("Score distribution chart saved to: {}", output_path);

    Ok(())
}

/// Print run statistics to console
pub fn print_segment_statistics(report: &RfmReport) {
    let summary = report.summary();
    let total = summary.customers.max(1) as f64;

    println!("\n=== Segment Statistics ===");
    for (segment, count) in report.scored.segment_counts() {
        if count == 0 {
            continue;
        }
        let percentage = (count as f64 / total) * 100.0;
        println!("  {:<28} {:>6} customers ({:.1}%)", segment, count, percentage);
    }

    println!("\nRFM code distribution:");
    for (code, count) in report.scored.code_distribution() {
        println!("  {}: {}", code, count);
    }
}

/// Generate both charts and print statistics
pub fn generate_visualization_report(report: &RfmReport, base_output_path: &str) -> crate::Result<()> {
    create_segment_chart(&report.scored, base_output_path)?;

    let score_path = score_chart_path(base_output_path);
    create_score_distribution_chart(&report.scored, &score_path)?;

    print_segment_statistics(report);

    Ok(())
}
