//! Product catalog read from the products sheet, with a time-bounded cache.
use anyhow::Result;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::sheets::SheetStore;

/// Ordered product names, as they appear in the sheet.
pub type Catalog = Vec<String>;

/// Non-empty values of `column`, in source row order.
#[instrument(skip(store))]
pub async fn load_catalog(store: &dyn SheetStore, sheet: &str, column: &str) -> Result<Catalog> {
    let records = store.read_records(sheet).await?;
    let catalog: Catalog = records
        .iter()
        .filter_map(|r| r.get(column))
        .filter_map(cell_text)
        .collect();
    debug!(count = catalog.len(), "catalog loaded");
    Ok(catalog)
}

fn cell_text(cell: &Value) -> Option<String> {
    let text = match cell {
        Value::String(s) => s.trim().to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

struct Cached {
    loaded_at: Instant,
    catalog: Catalog,
}

/// Catalog kept in memory for `ttl`, then reloaded in full.
pub struct CatalogCache {
    sheet: String,
    column: String,
    ttl: Duration,
    state: Mutex<Option<Cached>>,
}

impl CatalogCache {
    pub fn new(sheet: impl Into<String>, column: impl Into<String>, ttl: Duration) -> Self {
        Self {
            sheet: sheet.into(),
            column: column.into(),
            ttl,
            state: Mutex::new(None),
        }
    }

    /// Current catalog. A failed reload yields an empty catalog and leaves
    /// the cache empty so the next call tries again.
    pub async fn get(&self, store: &dyn SheetStore) -> Catalog {
        let mut state = self.state.lock().await;
        if let Some(cached) = state.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return cached.catalog.clone();
            }
        }

        match load_catalog(store, &self.sheet, &self.column).await {
            Ok(catalog) => {
                info!(count = catalog.len(), "catalog refreshed");
                *state = Some(Cached {
                    loaded_at: Instant::now(),
                    catalog: catalog.clone(),
                });
                catalog
            }
            Err(err) => {
                warn!(?err, sheet = %self.sheet, "catalog unavailable; continuing with empty list");
                *state = None;
                Vec::new()
            }
        }
    }

    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }
}
