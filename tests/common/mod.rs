#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use graolar_sales::oracle::CompletionOracle;
use graolar_sales::sheets::{row_from_a1, RangeWrite, SheetStore};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum SheetCall {
    Read(String),
    Update { range: String, rows: Vec<Vec<Value>> },
    Append { sheet: String, row: Vec<Value> },
    Batch(Vec<RangeWrite>),
}

/// In-memory spreadsheet that records every call.
#[derive(Clone, Default)]
pub struct MemorySheets {
    sheets: Arc<Mutex<HashMap<String, Vec<Vec<Value>>>>>,
    calls: Arc<Mutex<Vec<SheetCall>>>,
    failing_reads: Arc<Mutex<HashSet<String>>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_sheet(self, name: &str, rows: Vec<Vec<Value>>) -> Self {
        self.sheets.lock().await.insert(name.to_string(), rows);
        self
    }

    /// Products sheet with a `TIPO` header.
    pub async fn with_catalog(self, products: &[&str]) -> Self {
        let mut rows = vec![vec![json!("TIPO"), json!("PREÇO")]];
        rows.extend(products.iter().map(|p| vec![json!(p), json!("10")]));
        self.with_sheet("Produtos", rows).await
    }

    /// Entries sheet with a header and `data_rows` filler rows.
    pub async fn with_entries(self, data_rows: usize) -> Self {
        let mut rows = vec![graolar_sales::model::COLUMNS
            .iter()
            .map(|c| json!(c))
            .collect::<Vec<_>>()];
        for i in 0..data_rows {
            rows.push(vec![json!(format!("old-{i}"))]);
        }
        self.with_sheet("ENTRADAS", rows).await
    }

    pub async fn fail_reads_of(&self, sheet: &str) {
        self.failing_reads.lock().await.insert(sheet.to_string());
    }

    pub async fn heal_reads(&self) {
        self.failing_reads.lock().await.clear();
    }

    pub async fn fail_writes(&self) {
        *self.fail_writes.lock().await = true;
    }

    pub async fn calls(&self) -> Vec<SheetCall> {
        self.calls.lock().await.clone()
    }

    pub async fn write_calls(&self) -> Vec<SheetCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|c| !matches!(c, SheetCall::Read(_)))
            .collect()
    }

    pub async fn reads_of(&self, sheet: &str) -> usize {
        self.calls()
            .await
            .iter()
            .filter(|c| matches!(c, SheetCall::Read(s) if s == sheet))
            .count()
    }

    pub async fn rows(&self, sheet: &str) -> Vec<Vec<Value>> {
        self.sheets.lock().await.get(sheet).cloned().unwrap_or_default()
    }

    async fn check_writable(&self) -> Result<()> {
        if *self.fail_writes.lock().await {
            return Err(anyhow!("sheets error 429: quota exceeded"));
        }
        Ok(())
    }

    async fn put(&self, range: &str, rows: Vec<Vec<Value>>) -> Result<()> {
        let (sheet, _) = range
            .split_once('!')
            .ok_or_else(|| anyhow!("range without sheet: {range}"))?;
        let sheet = sheet.trim_matches('\'').to_string();
        let start = row_from_a1(range).ok_or_else(|| anyhow!("bad range: {range}"))? as usize;
        let mut sheets = self.sheets.lock().await;
        let data = sheets.entry(sheet).or_default();
        for (i, row) in rows.into_iter().enumerate() {
            let idx = start - 1 + i;
            if data.len() <= idx {
                data.resize(idx + 1, Vec::new());
            }
            data[idx] = row;
        }
        Ok(())
    }
}

#[async_trait]
impl SheetStore for MemorySheets {
    async fn read_all_values(&self, sheet: &str) -> Result<Vec<Vec<Value>>> {
        self.calls.lock().await.push(SheetCall::Read(sheet.to_string()));
        if self.failing_reads.lock().await.contains(sheet) {
            return Err(anyhow!("sheets error 503: unavailable"));
        }
        let rows = self.rows(sheet).await;
        // Let other submissions run between the read and the write.
        tokio::task::yield_now().await;
        Ok(rows)
    }

    async fn update_range(&self, range: &str, rows: Vec<Vec<Value>>) -> Result<()> {
        self.calls.lock().await.push(SheetCall::Update {
            range: range.to_string(),
            rows: rows.clone(),
        });
        self.check_writable().await?;
        self.put(range, rows).await
    }

    async fn append_row(&self, sheet: &str, row: Vec<Value>) -> Result<Option<u32>> {
        self.calls.lock().await.push(SheetCall::Append {
            sheet: sheet.to_string(),
            row: row.clone(),
        });
        self.check_writable().await?;
        let mut sheets = self.sheets.lock().await;
        let data = sheets.entry(sheet.to_string()).or_default();
        data.push(row);
        Ok(Some(data.len() as u32))
    }

    async fn batch_update(&self, writes: Vec<RangeWrite>) -> Result<()> {
        self.calls.lock().await.push(SheetCall::Batch(writes.clone()));
        self.check_writable().await?;
        for w in writes {
            self.put(&w.range, w.values).await?;
        }
        Ok(())
    }
}

/// Oracle that replays canned replies and keeps the prompts it was given.
#[derive(Clone, Default)]
pub struct ScriptedOracle {
    replies: Arc<Mutex<VecDeque<Result<String>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedOracle {
    pub fn with_replies(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            ..Default::default()
        }
    }

    pub fn replying(reply: &str) -> Self {
        Self::with_replies(vec![Ok(reply.to_string())])
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl CompletionOracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().await.push(prompt.to_string());
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no scripted reply left")))
    }
}
