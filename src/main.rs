use anyhow::Result;
use clap::Parser;
use graolar_sales::config;
use graolar_sales::handlers;
use graolar_sales::oracle::GeminiClient;
use graolar_sales::pipeline::{PipelineSettings, SalesPipeline};
use graolar_sales::sheets::SheetsClient;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(author, version, about = "Telegram bot that records café sales in Google Sheets")]
struct Args {
    /// Path to YAML config file
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
    let cfg = Arc::new(config::load(Some(&args.config))?);

    let store = Arc::new(SheetsClient::from_config(&cfg)?);
    let oracle = Arc::new(GeminiClient::from_config(&cfg)?);
    let pipeline = Arc::new(SalesPipeline::new(
        store,
        oracle,
        PipelineSettings::from_config(&cfg),
    ));

    let catalog = pipeline.catalog().await;
    info!(products = catalog.len(), mode = ?cfg.app.mode, "catalog warmed up");

    let bot = Bot::new(cfg.telegram.bot_token.clone());

    info!("starting telegram bot");
    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let pipeline = pipeline.clone();
        let cfg = cfg.clone();
        async move {
            let allowed = |id: i64| cfg.is_allowed(id);
            if let Err(err) = handlers::handle_update(&bot, &pipeline, allowed, &msg).await {
                error!(?err, "failed to handle update");
            }
            respond(())
        }
    })
    .await;

    Ok(())
}
