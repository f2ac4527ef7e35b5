use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `{range, values}` unit of a batch write.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RangeWrite {
    pub range: String,
    pub values: Vec<Vec<Value>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    pub range: String,
    #[serde(default)]
    pub major_dimension: Option<String>,
    /// Omitted by the API when the range is empty.
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: Option<u32>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AppendValuesResponse {
    #[serde(default)]
    pub table_range: Option<String>,
    pub updates: UpdateValuesResponse,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateValuesResponse {
    #[serde(default)]
    pub total_updated_rows: Option<u32>,
}
