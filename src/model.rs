use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column headers of the entries sheet, in write order.
pub const COLUMNS: [&str; 7] = [
    "Data",
    "Tipo de Café",
    "Quantidade",
    "Valor",
    "Comprador",
    "Vendedor",
    "Pago",
];

/// Values of the `Pago` column.
pub const PAID_YES: &str = "Sim";
pub const PAID_NO: &str = "Não";

/// One sale as written to the entries sheet.
///
/// Cells keep whatever JSON type the oracle produced; nothing is coerced here
/// so a malformed value surfaces when the store rejects or displays it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleRecord {
    pub date: Value,
    pub product_type: Value,
    pub quantity: Value,
    pub amount: Value,
    pub buyer: Value,
    pub seller: Value,
    pub paid: Value,
}

impl SaleRecord {
    /// Positional row matching [`COLUMNS`].
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            self.date.clone(),
            self.product_type.clone(),
            self.quantity.clone(),
            self.amount.clone(),
            self.buyer.clone(),
            self.seller.clone(),
            self.paid.clone(),
        ]
    }
}

/// Structured form submitted without going through the oracle.
///
/// Keys follow the schema the oracle is asked to emit, so both paths share
/// the normalizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ManualEntry {
    #[serde(rename = "data", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "tipo_de_cafe")]
    pub product_type: Option<String>,
    #[serde(rename = "quantidade", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(rename = "valor")]
    pub amount: Option<f64>,
    #[serde(rename = "comprador")]
    pub buyer: Option<String>,
    #[serde(rename = "vendedor", skip_serializing_if = "Option::is_none")]
    pub seller: Option<String>,
    #[serde(rename = "pago")]
    pub paid: Option<String>,
}

/// Display a cell the way a person would read it in the sheet.
pub fn display_cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) if s.is_empty() => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_follows_column_order() {
        let record = SaleRecord {
            date: json!("2024-03-01"),
            product_type: json!("Especial"),
            quantity: json!(2),
            amount: json!(30.0),
            buyer: json!("Ana"),
            seller: Value::Null,
            paid: json!("Sim"),
        };
        let row = record.to_row();
        assert_eq!(row.len(), COLUMNS.len());
        assert_eq!(
            row,
            vec![
                json!("2024-03-01"),
                json!("Especial"),
                json!(2),
                json!(30.0),
                json!("Ana"),
                Value::Null,
                json!("Sim"),
            ]
        );
    }

    #[test]
    fn manual_entry_serializes_with_schema_keys() {
        let entry = ManualEntry {
            product_type: Some("Tradicional".into()),
            amount: Some(15.5),
            ..Default::default()
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["tipo_de_cafe"], "Tradicional");
        assert_eq!(value["valor"], 15.5);
        assert!(value.get("data").is_none());
        assert!(value.get("quantidade").is_none());
        assert!(value["comprador"].is_null());
    }

    #[test]
    fn display_cell_renders_null_as_dash() {
        assert_eq!(display_cell(&Value::Null), "-");
        assert_eq!(display_cell(&json!("")), "-");
        assert_eq!(display_cell(&json!("Ana")), "Ana");
        assert_eq!(display_cell(&json!(30.5)), "30.5");
    }
}
