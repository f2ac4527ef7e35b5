use serde_json::Value;
use thiserror::Error;

use crate::model::{SaleRecord, PAID_NO, PAID_YES};

/// Something about a record that the sheet owner would likely want fixed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordIssue {
    #[error("quantidade inválida: {0}")]
    QuantityNotPositiveInteger(Value),
    #[error("valor inválido: {0}")]
    AmountNotNonNegativeNumber(Value),
    #[error("produto fora da lista: {0}")]
    UnknownProduct(Value),
    #[error("campo pago deve ser \"Sim\" ou \"Não\": {0}")]
    PaidNotRecognized(Value),
}

/// Check a normalized record against the catalog and the column types.
///
/// An empty catalog means the product list could not be loaded, so catalog
/// membership is not checked in that case.
pub fn validate(record: &SaleRecord, catalog: &[String]) -> Vec<RecordIssue> {
    let mut issues = Vec::new();

    if !record.quantity.as_u64().is_some_and(|q| q > 0) {
        issues.push(RecordIssue::QuantityNotPositiveInteger(record.quantity.clone()));
    }
    if !record.amount.as_f64().is_some_and(|a| a >= 0.0) {
        issues.push(RecordIssue::AmountNotNonNegativeNumber(record.amount.clone()));
    }
    if !catalog.is_empty() {
        let known = record
            .product_type
            .as_str()
            .is_some_and(|p| catalog.iter().any(|c| c == p));
        if !known {
            issues.push(RecordIssue::UnknownProduct(record.product_type.clone()));
        }
    }
    if !matches!(record.paid.as_str(), Some(PAID_YES) | Some(PAID_NO)) {
        issues.push(RecordIssue::PaidNotRecognized(record.paid.clone()));
    }

    issues
}
