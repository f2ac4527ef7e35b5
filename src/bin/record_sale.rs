use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

use graolar_sales::config;
use graolar_sales::handlers::parse_manual_entry;
use graolar_sales::oracle::GeminiClient;
use graolar_sales::pipeline::{PipelineSettings, SalesPipeline};
use graolar_sales::sheets::SheetsClient;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Record one sale from the command line and exit"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Treat the text as `data;tipo;quantidade;valor;comprador;vendedor;pago`
    /// and append it without consulting the oracle
    #[arg(long)]
    manual: bool,

    /// Sale description, e.g. "vendi 2 cafés especiais para Ana por 30 reais"
    #[arg(required = true)]
    text: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let pipeline = SalesPipeline::new(
        Arc::new(SheetsClient::from_config(&cfg)?),
        Arc::new(GeminiClient::from_config(&cfg)?),
        PipelineSettings::from_config(&cfg),
    );

    let text = args.text.join(" ");
    let result = if args.manual {
        match parse_manual_entry(&text) {
            Ok(entry) => pipeline.submit_manual(&entry).await,
            Err(err) => {
                eprintln!("❌ {err}");
                return Ok(ExitCode::FAILURE);
            }
        }
    } else {
        pipeline.submit(&text).await
    };

    match result {
        Ok(submission) => {
            println!("{}", submission.confirmation());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(%err, "submission failed");
            eprintln!("{}", err.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}
