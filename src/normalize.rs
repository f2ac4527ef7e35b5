//! Map parsed oracle output onto the fixed seven-column record.
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::model::SaleRecord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("esperava um objeto JSON na posição {index}")]
    NotAnObject { index: usize },
    #[error("esperava um objeto ou uma lista de objetos JSON")]
    UnexpectedShape,
}

/// Turn an object (one sale) or an array of objects (several sales) into
/// records, in input order.
pub fn normalize(
    parsed: &Value,
    fallback_date: NaiveDate,
    default_seller: Option<&str>,
) -> Result<Vec<SaleRecord>, NormalizeError> {
    match parsed {
        Value::Object(obj) => Ok(vec![normalize_object(obj, fallback_date, default_seller)]),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_object()
                    .map(|obj| normalize_object(obj, fallback_date, default_seller))
                    .ok_or(NormalizeError::NotAnObject { index })
            })
            .collect(),
        _ => Err(NormalizeError::UnexpectedShape),
    }
}

fn normalize_object(
    obj: &Map<String, Value>,
    fallback_date: NaiveDate,
    default_seller: Option<&str>,
) -> SaleRecord {
    let field = |key: &str| obj.get(key).cloned().unwrap_or(Value::Null);
    let present = |key: &str| obj.get(key).filter(|v| !v.is_null()).cloned();

    let date = present("data")
        .filter(|v| v.as_str().map_or(true, |s| !s.trim().is_empty()))
        .unwrap_or_else(|| json!(fallback_date.format("%Y-%m-%d").to_string()));
    let seller = present("vendedor")
        .or_else(|| default_seller.map(|s| json!(s)))
        .unwrap_or(Value::Null);

    SaleRecord {
        date,
        product_type: field("tipo_de_cafe"),
        quantity: present("quantidade").unwrap_or_else(|| json!(1)),
        amount: field("valor"),
        buyer: field("comprador"),
        seller,
        paid: field("pago"),
    }
}
