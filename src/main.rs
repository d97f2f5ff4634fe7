//! delivery-kpi: delivery channel KPI report from a margin workbook

use anyhow::{Context, Result};
use clap::Parser;
use delivery_kpi::report::format_currency;
use delivery_kpi::report::ChartSeries;
use delivery_kpi::Layout;
use delivery_kpi::Summary;
use delivery_kpi::Workbook;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "delivery-kpi")]
#[command(
    author,
    version,
    about = "Compare delivery channel KPIs from the CALCOLO sheet of a margin workbook"
)]
struct Cli {
    /// Input workbook (xlsx)
    input: PathBuf,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Log workbook structure and extraction details
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut workbook =
        Workbook::open(&cli.input).with_context(|| format!("Failed to open '{}'", cli.input.display()))?;
    let summary = delivery_kpi::analyze_workbook(Layout::default(), &mut workbook)
        .with_context(|| format!("Failed to analyze '{}'", cli.input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("{}", summary.display_table);
    println!("{}", summary.headline());
    println!();
    print_chart(&summary.chart);
}

fn print_chart(chart: &ChartSeries) {
    println!("{}", chart.title);
    let width = chart
        .categories
        .iter()
        .map(|category| category.chars().count())
        .max()
        .unwrap_or(0);
    for (index, category) in chart.categories.iter().enumerate() {
        let values: Vec<String> = chart
            .series
            .iter()
            .map(|series| {
                let value = series.values.get(index).copied().flatten();
                format!("{}: {}", series.name, format_currency(value))
            })
            .collect();
        println!("  {category:<width$}  {}", values.join("  "));
    }
}
