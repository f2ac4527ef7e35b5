//! One submission, start to finish: catalog, prompt, oracle, extraction,
//! normalization, validation and the sheet write.
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::catalog::{Catalog, CatalogCache};
use crate::config::{Config, SubmitMode};
use crate::extract::{extract_json, ExtractError};
use crate::model::{display_cell, ManualEntry, SaleRecord};
use crate::normalize::{normalize, NormalizeError};
use crate::oracle::CompletionOracle;
use crate::prompt::build_prompt;
use crate::sheets::SheetStore;
use crate::validate::{validate, RecordIssue};
use crate::writer::RowWriter;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("falha ao consultar a IA: {0:#}")]
    OracleCallFailed(anyhow::Error),
    #[error("resposta da IA não é um JSON válido: {0}")]
    MalformedJson(serde_json::Error),
    #[error("nenhum JSON encontrado na resposta da IA")]
    NoJsonFound,
    #[error(transparent)]
    UnexpectedShape(#[from] NormalizeError),
    #[error("nenhuma venda encontrada na mensagem")]
    NoSales,
    #[error("registro inválido: {}", join_issues(.0))]
    InvalidRecord(Vec<RecordIssue>),
    #[error("falha ao gravar na planilha: {0:#}")]
    WriteFailed(anyhow::Error),
}

impl From<ExtractError> for PipelineError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::MalformedJson(e) => PipelineError::MalformedJson(e),
            ExtractError::NoJsonFound => PipelineError::NoJsonFound,
        }
    }
}

impl PipelineError {
    /// Reply shown to the person who sent the submission.
    pub fn user_message(&self) -> String {
        format!("❌ Ocorreu um erro: {self}. Por favor, tente novamente.")
    }
}

fn join_issues(issues: &[RecordIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// What was written by a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub records: Vec<SaleRecord>,
    pub rows: Vec<Option<u32>>,
}

impl Submission {
    /// Confirmation reply summarizing the written record(s).
    pub fn confirmation(&self) -> String {
        match (self.records.as_slice(), self.rows.as_slice()) {
            ([record], [row]) => {
                let head = match row {
                    Some(row) => format!("✅ Venda registrada com sucesso na linha {row} da planilha!"),
                    None => "✅ Venda registrada com sucesso na planilha!".to_string(),
                };
                format!(
                    "{head}\n- Produto: {}\n- Comprador: {}\n- Valor: R$ {}",
                    display_cell(&record.product_type),
                    display_cell(&record.buyer),
                    display_cell(&record.amount),
                )
            }
            (records, rows) => {
                let mut out = format!("✅ {} vendas registradas com sucesso!", records.len());
                for (record, row) in records.iter().zip(rows) {
                    let at = row.map(|r| format!("linha {r}")).unwrap_or_else(|| "-".into());
                    out.push_str(&format!(
                        "\n- {at}: {} x{}, R$ {} ({})",
                        display_cell(&record.product_type),
                        display_cell(&record.quantity),
                        display_cell(&record.amount),
                        display_cell(&record.buyer),
                    ));
                }
                out
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub mode: SubmitMode,
    pub default_seller: Option<String>,
    pub strict_validation: bool,
    pub entries_sheet: String,
    pub products_sheet: String,
    pub catalog_column: String,
    pub catalog_ttl: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            mode: SubmitMode::Single,
            default_seller: None,
            strict_validation: false,
            entries_sheet: "ENTRADAS".into(),
            products_sheet: "Produtos".into(),
            catalog_column: "TIPO".into(),
            catalog_ttl: Duration::from_secs(600),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            mode: cfg.app.mode,
            default_seller: cfg.app.default_seller.clone(),
            strict_validation: cfg.app.strict_validation,
            entries_sheet: cfg.sheets.entries_sheet.clone(),
            products_sheet: cfg.sheets.products_sheet.clone(),
            catalog_column: cfg.sheets.catalog_column.clone(),
            catalog_ttl: Duration::from_secs(cfg.app.catalog_ttl_seconds),
        }
    }
}

/// Owns the store and oracle handles for the lifetime of the process.
pub struct SalesPipeline {
    store: Arc<dyn SheetStore>,
    oracle: Arc<dyn CompletionOracle>,
    catalog: CatalogCache,
    writer: RowWriter,
    settings: PipelineSettings,
}

impl SalesPipeline {
    pub fn new(
        store: Arc<dyn SheetStore>,
        oracle: Arc<dyn CompletionOracle>,
        settings: PipelineSettings,
    ) -> Self {
        let catalog = CatalogCache::new(
            settings.products_sheet.clone(),
            settings.catalog_column.clone(),
            settings.catalog_ttl,
        );
        let writer = RowWriter::new(settings.entries_sheet.clone());
        Self {
            store,
            oracle,
            catalog,
            writer,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub async fn catalog(&self) -> Catalog {
        self.catalog.get(self.store.as_ref()).await
    }

    pub async fn submit(&self, utterance: &str) -> Result<Submission, PipelineError> {
        self.submit_on(utterance, Local::now().date_naive()).await
    }

    /// Free-text submission with an explicit "today".
    #[instrument(skip_all, fields(mode = ?self.settings.mode))]
    pub async fn submit_on(
        &self,
        utterance: &str,
        today: NaiveDate,
    ) -> Result<Submission, PipelineError> {
        let catalog = self.catalog().await;
        let mode = self.settings.mode.extract_mode();
        let prompt = build_prompt(today, &catalog, utterance, mode);

        let raw = self
            .oracle
            .complete(&prompt)
            .await
            .map_err(PipelineError::OracleCallFailed)?;
        let parsed = extract_json(&raw, mode)?;
        let records = normalize(&parsed, today, self.settings.default_seller.as_deref())?;
        if records.is_empty() {
            return Err(PipelineError::NoSales);
        }
        self.check(&records, &catalog)?;

        let store = self.store.as_ref();
        let written = match (self.settings.mode, records.as_slice()) {
            (SubmitMode::Single, [record]) => self.writer.write_single(store, record).await,
            _ => self.writer.write_batch(store, &records).await,
        }
        .map_err(PipelineError::WriteFailed)?;

        info!(count = records.len(), rows = ?written.rows, "submission recorded");
        Ok(Submission {
            records,
            rows: written.rows,
        })
    }

    pub async fn submit_manual(&self, entry: &ManualEntry) -> Result<Submission, PipelineError> {
        self.submit_manual_on(entry, Local::now().date_naive()).await
    }

    /// Structured form submission; the oracle is not consulted.
    #[instrument(skip_all)]
    pub async fn submit_manual_on(
        &self,
        entry: &ManualEntry,
        today: NaiveDate,
    ) -> Result<Submission, PipelineError> {
        let parsed = serde_json::to_value(entry).map_err(PipelineError::MalformedJson)?;
        let records = normalize(&parsed, today, self.settings.default_seller.as_deref())?;
        let catalog = self.catalog().await;
        self.check(&records, &catalog)?;

        let mut rows = Vec::with_capacity(records.len());
        for record in &records {
            let written = self
                .writer
                .append(self.store.as_ref(), record)
                .await
                .map_err(PipelineError::WriteFailed)?;
            rows.extend(written.rows);
        }
        Ok(Submission { records, rows })
    }

    fn check(&self, records: &[SaleRecord], catalog: &[String]) -> Result<(), PipelineError> {
        let issues: Vec<RecordIssue> = records
            .iter()
            .flat_map(|r| validate(r, catalog))
            .collect();
        if issues.is_empty() {
            return Ok(());
        }
        if self.settings.strict_validation {
            return Err(PipelineError::InvalidRecord(issues));
        }
        warn!(issues = %join_issues(&issues), "writing record with validation issues");
        Ok(())
    }
}
