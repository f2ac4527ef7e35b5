use anyhow::Result;
use chrono::NaiveDate;
use teloxide::prelude::*;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::model::ManualEntry;
use crate::pipeline::SalesPipeline;

pub const GREETING: &str = "Como posso ajudar a registrar uma venda hoje?";

pub const HELP: &str = "Envie uma mensagem descrevendo a venda, por exemplo:\n\
\"vendi 2 cafés especiais para Ana por 30 reais, já pago\"\n\n\
Comandos:\n\
/produtos - lista de produtos disponíveis\n\
/manual data;tipo;quantidade;valor;comprador;vendedor;pago - registro sem IA\n\
/ajuda - esta mensagem";

const MANUAL_FIELDS: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Products,
    Manual(String),
    Unknown(String),
    /// Not a command: a sale description for the oracle.
    Sale(String),
}

/// Classify an incoming text. Commands may carry a `@botname` suffix.
pub fn parse_command(text: &str) -> Command {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Sale(trimmed.to_string());
    };
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((h, a)) => (h, a.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    match name.as_str() {
        "start" => Command::Start,
        "ajuda" | "help" => Command::Help,
        "produtos" => Command::Products,
        "manual" => Command::Manual(args.to_string()),
        _ => Command::Unknown(name),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManualEntryError {
    #[error("use até 7 campos separados por ';' (recebi {0})")]
    WrongFieldCount(usize),
    #[error("data inválida: {0}")]
    InvalidDate(String),
    #[error("quantidade inválida: {0}")]
    InvalidQuantity(String),
    #[error("valor inválido: {0}")]
    InvalidAmount(String),
    #[error("informe o tipo de café")]
    MissingProduct,
}

/// Parse `data;tipo;quantidade;valor;comprador;vendedor;pago`. Trailing fields
/// may be omitted and empty fields are left blank.
pub fn parse_manual_entry(args: &str) -> Result<ManualEntry, ManualEntryError> {
    let fields: Vec<&str> = args.split(';').map(str::trim).collect();
    if fields.len() > MANUAL_FIELDS {
        return Err(ManualEntryError::WrongFieldCount(fields.len()));
    }
    let field = |i: usize| fields.get(i).copied().filter(|s| !s.is_empty());

    let date = field(0).map(parse_date).transpose()?;
    let product_type = field(1)
        .map(str::to_string)
        .ok_or(ManualEntryError::MissingProduct)?;
    let quantity = field(2)
        .map(|q| {
            q.parse::<i64>()
                .map_err(|_| ManualEntryError::InvalidQuantity(q.to_string()))
        })
        .transpose()?;
    let amount = field(3).map(parse_amount).transpose()?;

    Ok(ManualEntry {
        date,
        product_type: Some(product_type),
        quantity,
        amount,
        buyer: field(4).map(str::to_string),
        seller: field(5).map(str::to_string),
        paid: field(6).map(str::to_string),
    })
}

fn parse_date(s: &str) -> Result<String, ManualEntryError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| ManualEntryError::InvalidDate(s.to_string()))
}

/// Accepts `30`, `30.5`, `30,50` and an optional `R$` prefix.
fn parse_amount(s: &str) -> Result<f64, ManualEntryError> {
    let cleaned = s.trim_start_matches("R$").trim().replace(',', ".");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite())
        .ok_or_else(|| ManualEntryError::InvalidAmount(s.to_string()))
}

fn format_catalog(catalog: &[String]) -> String {
    if catalog.is_empty() {
        return "Nenhum produto encontrado na planilha.".to_string();
    }
    let mut out = String::from("Produtos disponíveis:");
    for product in catalog {
        out.push_str("\n- ");
        out.push_str(product);
    }
    out
}

/// Reply text for one message. Never fails: pipeline errors become replies.
pub async fn reply_for(pipeline: &SalesPipeline, text: &str) -> String {
    match parse_command(text) {
        Command::Start => format!("{GREETING}\n\n{HELP}"),
        Command::Help => HELP.to_string(),
        Command::Products => format_catalog(&pipeline.catalog().await),
        Command::Unknown(name) => format!("Comando desconhecido: /{name}\n\n{HELP}"),
        Command::Manual(args) => match parse_manual_entry(&args) {
            Ok(entry) => match pipeline.submit_manual(&entry).await {
                Ok(submission) => submission.confirmation(),
                Err(err) => {
                    warn!(%err, "manual entry failed");
                    err.user_message()
                }
            },
            Err(err) => format!("❌ {err}\n\n{HELP}"),
        },
        Command::Sale(text) if text.is_empty() => GREETING.to_string(),
        Command::Sale(text) => match pipeline.submit(&text).await {
            Ok(submission) => submission.confirmation(),
            Err(err) => {
                warn!(%err, "submission failed");
                err.user_message()
            }
        },
    }
}

#[instrument(skip_all)]
pub async fn handle_update(
    bot: &Bot,
    pipeline: &SalesPipeline,
    allowed: impl Fn(i64) -> bool,
    msg: &Message,
) -> Result<()> {
    let user = match msg.from() {
        Some(u) => u,
        None => return Ok(()),
    };
    let tg_user_id = user.id.0 as i64;
    if !allowed(tg_user_id) {
        info!(tg_user_id, "ignoring message from user not in allowed_users");
        return Ok(());
    }

    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Envie a venda como texto, por favor.")
            .await?;
        return Ok(());
    };

    let reply = reply_for(pipeline, text).await;
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
