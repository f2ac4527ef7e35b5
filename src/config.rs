//! Configuration loader and validator for the sales bot.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::extract::ExtractMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub telegram: Telegram,
    pub gemini: Gemini,
    pub sheets: Sheets,
}

/// How a free-text submission is turned into rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmitMode {
    /// One JSON object per message, written at `row count + 1`.
    #[default]
    Single,
    /// A JSON array per message, written with one batch update.
    Batch,
}

impl SubmitMode {
    pub fn extract_mode(self) -> ExtractMode {
        match self {
            SubmitMode::Single => ExtractMode::Object,
            SubmitMode::Batch => ExtractMode::Array,
        }
    }
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    #[serde(default)]
    pub mode: SubmitMode,
    #[serde(default = "default_catalog_ttl")]
    pub catalog_ttl_seconds: u64,
    /// Seller written when the message does not name one.
    #[serde(default)]
    pub default_seller: Option<String>,
    /// Reject records that fail validation instead of only logging them.
    #[serde(default)]
    pub strict_validation: bool,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Telegram {
    pub bot_token: String,
    /// Empty means everyone may record sales.
    #[serde(default)]
    pub allowed_users: Vec<i64>,
}

/// Gemini text-completion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Gemini {
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

/// Google Sheets settings and sheet/column names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sheets {
    pub access_token: String,
    pub spreadsheet_id: String,
    #[serde(default = "default_entries_sheet")]
    pub entries_sheet: String,
    #[serde(default = "default_products_sheet")]
    pub products_sheet: String,
    #[serde(default = "default_catalog_column")]
    pub catalog_column: String,
    #[serde(default = "default_sheets_base_url")]
    pub base_url: String,
}

fn default_catalog_ttl() -> u64 {
    600
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".into()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/".into()
}

fn default_entries_sheet() -> String {
    "ENTRADAS".into()
}

fn default_products_sheet() -> String {
    "Produtos".into()
}

fn default_catalog_column() -> String {
    "TIPO".into()
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com/".into()
}

impl Config {
    /// Replace secrets with values from the environment when present.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("GEMINI_API_KEY") {
            self.gemini.api_key = v;
        }
        if let Some(v) = get("SHEETS_ACCESS_TOKEN") {
            self.sheets.access_token = v;
        }
        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
    }

    /// Whether a Telegram user may submit sales.
    pub fn is_allowed(&self, tg_user_id: i64) -> bool {
        self.telegram.allowed_users.is_empty() || self.telegram.allowed_users.contains(&tg_user_id)
    }
}

/// Load configuration from a YAML file, apply env overrides and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env_overrides();
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.catalog_ttl_seconds == 0 {
        return Err(ConfigError::Invalid("app.catalog_ttl_seconds must be > 0"));
    }

    if cfg.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::Invalid("telegram.bot_token must be non-empty"));
    }

    if cfg.gemini.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("gemini.api_key must be non-empty"));
    }
    if cfg.gemini.model.trim().is_empty() {
        return Err(ConfigError::Invalid("gemini.model must be non-empty"));
    }
    if reqwest::Url::parse(&cfg.gemini.base_url).is_err() {
        return Err(ConfigError::Invalid("gemini.base_url must be a valid URL"));
    }

    let sh = &cfg.sheets;
    if sh.access_token.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.access_token must be non-empty"));
    }
    if sh.spreadsheet_id.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.spreadsheet_id must be non-empty"));
    }
    if sh.entries_sheet.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.entries_sheet must be non-empty"));
    }
    if sh.products_sheet.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.products_sheet must be non-empty"));
    }
    if sh.catalog_column.trim().is_empty() {
        return Err(ConfigError::Invalid("sheets.catalog_column must be non-empty"));
    }
    if reqwest::Url::parse(&sh.base_url).is_err() {
        return Err(ConfigError::Invalid("sheets.base_url must be a valid URL"));
    }

    Ok(())
}

/// Returns the example YAML shipped with the bot.
pub fn example() -> &'static str {
    r#"app:
  mode: single
  catalog_ttl_seconds: 600
  default_seller: null
  strict_validation: false

telegram:
  bot_token: "YOUR_TELEGRAM_BOT_TOKEN"
  allowed_users:
    - 123456789

gemini:
  api_key: "YOUR_GEMINI_API_KEY"
  model: "gemini-2.5-flash"

sheets:
  access_token: "YOUR_GOOGLE_OAUTH_ACCESS_TOKEN"
  spreadsheet_id: "YOUR_SPREADSHEET_ID"
  entries_sheet: "ENTRADAS"
  products_sheet: "Produtos"
  catalog_column: "TIPO"
"#
}
