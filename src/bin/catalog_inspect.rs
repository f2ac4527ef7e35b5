use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use graolar_sales::catalog::load_catalog;
use graolar_sales::config;
use graolar_sales::model::COLUMNS;
use graolar_sales::sheets::{SheetStore, SheetsClient};

#[derive(Parser, Debug)]
#[command(about = "Print the product catalog and the entries sheet size")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let client = SheetsClient::from_config(&cfg)?;

    let catalog = load_catalog(
        &client,
        &cfg.sheets.products_sheet,
        &cfg.sheets.catalog_column,
    )
    .await?;
    println!(
        "Catalog ({} / {}): {} products",
        cfg.sheets.products_sheet,
        cfg.sheets.catalog_column,
        catalog.len()
    );
    for product in &catalog {
        println!("  {}", product);
    }

    let rows = client.read_all_values(&cfg.sheets.entries_sheet).await?;
    println!("Entries sheet: {}", cfg.sheets.entries_sheet);
    println!("  rows (header included): {}", rows.len());
    println!("  next single-mode row: {}", rows.len() + 1);
    if let Some(header) = rows.first() {
        let found: Vec<String> = header
            .iter()
            .map(|h| h.as_str().unwrap_or("").to_string())
            .collect();
        if found.iter().map(String::as_str).ne(COLUMNS.iter().copied()) {
            println!("  warning: header {:?} differs from expected {:?}", found, COLUMNS);
        }
    }
    Ok(())
}
