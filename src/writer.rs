//! Writes normalized records to the entries sheet.
use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::model::SaleRecord;
use crate::sheets::{a1_row_range, RangeWrite, SheetStore};

/// Rows written by one call, 1-based, in record order. `None` when the store
/// did not report where an append landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub rows: Vec<Option<u32>>,
}

/// Row ranges for a batch: `base + index + 2` for each record.
pub fn batch_ranges(sheet: &str, base: u32, count: usize) -> Vec<(u32, String)> {
    (0..count as u32)
        .map(|i| {
            let row = base + i + 2;
            (row, a1_row_range(sheet, row))
        })
        .collect()
}

/// Single writer for the entries sheet.
///
/// Every write holds `lock`; index-computing writes hold it from the row
/// count read to the write, so submissions handled by this process never
/// target the same row.
pub struct RowWriter {
    sheet: String,
    lock: Mutex<()>,
}

impl RowWriter {
    pub fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    async fn row_count(&self, store: &dyn SheetStore) -> Result<u32> {
        let values = store
            .read_all_values(&self.sheet)
            .await
            .context("failed to read entries sheet")?;
        Ok(values.len() as u32)
    }

    /// One record at `row count + 1`.
    #[instrument(skip_all, fields(sheet = %self.sheet))]
    pub async fn write_single(
        &self,
        store: &dyn SheetStore,
        record: &SaleRecord,
    ) -> Result<WriteResult> {
        let _guard = self.lock.lock().await;
        let row = self.row_count(store).await? + 1;
        let range = a1_row_range(&self.sheet, row);
        store
            .update_range(&range, vec![record.to_row()])
            .await
            .with_context(|| format!("failed to write {range}"))?;
        info!(row, "sale written");
        Ok(WriteResult {
            rows: vec![Some(row)],
        })
    }

    /// All records in one batch update, in input order.
    #[instrument(skip_all, fields(sheet = %self.sheet, count = records.len()))]
    pub async fn write_batch(
        &self,
        store: &dyn SheetStore,
        records: &[SaleRecord],
    ) -> Result<WriteResult> {
        if records.is_empty() {
            return Ok(WriteResult { rows: Vec::new() });
        }
        let _guard = self.lock.lock().await;
        let base = self.row_count(store).await?;
        let ranges = batch_ranges(&self.sheet, base, records.len());
        let writes: Vec<RangeWrite> = ranges
            .iter()
            .zip(records)
            .map(|((_, range), record)| RangeWrite {
                range: range.clone(),
                values: vec![record.to_row()],
            })
            .collect();
        store
            .batch_update(writes)
            .await
            .context("batch write failed")?;
        info!(base, "sales batch written");
        Ok(WriteResult {
            rows: ranges.into_iter().map(|(row, _)| Some(row)).collect(),
        })
    }

    /// Manual entries go through the store's append primitive.
    #[instrument(skip_all, fields(sheet = %self.sheet))]
    pub async fn append(&self, store: &dyn SheetStore, record: &SaleRecord) -> Result<WriteResult> {
        let _guard = self.lock.lock().await;
        let row = store
            .append_row(&self.sheet, record.to_row())
            .await
            .context("append failed")?;
        info!(?row, "sale appended");
        Ok(WriteResult { rows: vec![row] })
    }
}
