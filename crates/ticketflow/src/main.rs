use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use serde_json::{json, Map, Value};
use ticketflow_core::{
    ClassifiedDataset, Dataset, Record, TicketPipeline, TicketflowConfig, TimelineSection,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Service ticket classification and timeline tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print ticket and product counts
    Stats(StatsArgs),
    /// Print per-product counts and resolution times
    Products(InputArgs),
    /// Print the timeline sections of one product
    Sections(SectionsArgs),
    /// Write the classified table as .parquet or .csv
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Tab- or comma-delimited ticket export
    file: PathBuf,
    /// TOML configuration (falls back to TICKETFLOW_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Emit JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct SectionsArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Product label, e.g. "Broadband"
    #[arg(long)]
    product: String,
    /// Emit JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Destination path; the extension selects the format
    #[arg(long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Stats(args) => handle_stats(args),
        Command::Products(args) => handle_products(args),
        Command::Sections(args) => handle_sections(args),
        Command::Export(args) => handle_export(args),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<TicketflowConfig> {
    dotenvy::dotenv().ok();

    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => env::var_os("TICKETFLOW_CONFIG").map(PathBuf::from),
    };

    match path {
        Some(path) => TicketflowConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(TicketflowConfig::default()),
    }
}

fn classify(input: &InputArgs) -> Result<ClassifiedDataset> {
    let config = load_config(input.config.as_deref())?;
    let content = fs::read_to_string(&input.file)
        .with_context(|| format!("failed to read {}", input.file.display()))?;

    let pipeline = TicketPipeline::new(config);
    pipeline
        .run_text(&content)
        .with_context(|| format!("failed to classify {}", input.file.display()))
}

fn handle_stats(args: StatsArgs) -> Result<()> {
    let stats = classify(&args.input)?.stats();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let products: Vec<&str> = stats.products.iter().map(|p| p.as_str()).collect();
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Total tickets".to_string(), stats.total_count.to_string()]);
    table.add_row(vec![
        "Unique products".to_string(),
        stats.unique_product_count.to_string(),
    ]);
    table.add_row(vec!["Products".to_string(), products.join(", ")]);
    println!("{table}");
    Ok(())
}

fn handle_products(args: InputArgs) -> Result<()> {
    let classified = classify(&args)?;
    let summaries = classified.resolution_summary();

    let mut table = Table::new();
    table.set_header(vec![
        "Product",
        "Tickets",
        "Resolved",
        "Mean h",
        "Median h",
        "Min h",
        "Max h",
    ]);

    for product in classified.products() {
        let tickets = classified.product_records(product.as_str()).len();
        let mut row = vec![product.to_string(), tickets.to_string()];
        match summaries.iter().find(|summary| summary.product == product) {
            Some(summary) => row.extend([
                summary.count.to_string(),
                format!("{:.2}", summary.mean_hours),
                format!("{:.2}", summary.median_hours),
                format!("{:.2}", summary.min_hours),
                format!("{:.2}", summary.max_hours),
            ]),
            None => row.extend(["0", "-", "-", "-", "-"].map(String::from)),
        }
        table.add_row(row);
    }

    println!("{table}");
    Ok(())
}

fn handle_sections(args: SectionsArgs) -> Result<()> {
    let classified = classify(&args.input)?;
    if !classified.products().iter().any(|p| p.as_str() == args.product) {
        bail!("no tickets for product '{}'", args.product);
    }

    let sections = classified.sections_for(&args.product);
    let columns = display_columns(&classified);
    info!(
        product = %args.product,
        sections = sections.len(),
        excluded = sections.excluded.len(),
        "segmented product timeline"
    );

    if args.json {
        let payload = json!({
            "product": args.product,
            "strategy": sections.strategy,
            "date_range_days": sections.date_range_days,
            "excluded": sections.excluded.len(),
            "sections": sections
                .iter()
                .map(|section| section_json(classified.dataset(), section, &columns))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if let Some(strategy) = sections.strategy {
        println!(
            "{} tickets over {} days ({strategy})",
            sections.record_count(),
            sections.date_range_days.unwrap_or_default()
        );
    }
    for section in sections.iter() {
        println!("\n{} ({} tickets)", section.label, section.len());
        let mut table = Table::new();
        table.set_header(columns.iter().map(|(name, _)| name.as_str()));
        for record in &section.records {
            table.add_row(
                columns
                    .iter()
                    .map(|(_, idx)| display_value(classified.dataset(), record, *idx)),
            );
        }
        println!("{table}");
    }
    if !sections.excluded.is_empty() {
        println!(
            "\n{} tickets without a valid acceptance time were left out",
            sections.excluded.len()
        );
    }
    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<()> {
    let classified = classify(&args.input)?;
    let mut df = classified.to_dataframe()?;
    ticketflow_core::frames::write_table(&mut df, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(
        rows = df.height(),
        columns = df.width(),
        output = %args.output.display(),
        "exported classified tickets"
    );
    Ok(())
}

/// Configured display columns that exist in the export, with their index.
fn display_columns(classified: &ClassifiedDataset) -> Vec<(String, usize)> {
    let schema = classified.dataset().schema();
    classified
        .display_columns()
        .iter()
        .filter_map(|name| {
            let idx = schema.column_index(name)?;
            Some((schema.headers[idx].clone(), idx))
        })
        .collect()
}

fn display_value(dataset: &Dataset, record: &Record, idx: usize) -> String {
    let schema = dataset.schema();
    let parsed = if schema.acceptance_time == Some(idx) {
        record.acceptance_time.get()
    } else if schema.completion_time == Some(idx) {
        record.completion_time.get()
    } else {
        None
    };

    match parsed {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => record.cell(idx).unwrap_or_default().to_string(),
    }
}

fn section_json(dataset: &Dataset, section: &TimelineSection, columns: &[(String, usize)]) -> Value {
    let tickets: Vec<Value> = section
        .records
        .iter()
        .map(|record| {
            let row: Map<String, Value> = columns
                .iter()
                .map(|(name, idx)| (name.clone(), Value::String(display_value(dataset, record, *idx))))
                .collect();
            Value::Object(row)
        })
        .collect();

    json!({
        "label": section.label.as_str(),
        "count": section.len(),
        "tickets": tickets,
    })
}
