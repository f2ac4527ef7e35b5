//! Prompt sent to the completion oracle.
//!
//! The wording is Portuguese because the shop owner writes in Portuguese and
//! the sheet columns use Portuguese names.

use chrono::NaiveDate;

use crate::extract::ExtractMode;
use crate::model::{PAID_NO, PAID_YES};

const CONTEXT: &str = "Você é um assistente de IA especialista em processar pedidos para a loja de cafés \"Grão Lar\". \
Sua tarefa é ler a mensagem do usuário e extrair os dados da venda.";

const RULES: &str = "- \"data\": use a Data Atual se a mensagem não mencionar outra data, no formato YYYY-MM-DD.
- \"tipo_de_cafe\": escolha o item mais próximo da Lista de Produtos Válidos.
- \"quantidade\": número inteiro; use 1 se não for mencionada.
- \"valor\": valor total da venda em reais, como número.
- \"comprador\" e \"vendedor\": nomes citados na mensagem, ou null se não forem citados.";

const OBJECT_SCHEMA: &str = r#"{
  "data": "YYYY-MM-DD", "tipo_de_cafe": "string", "quantidade": "integer",
  "valor": "float", "comprador": "string | null", "vendedor": "string | null", "pago": "string"
}"#;

const ARRAY_SCHEMA: &str = r#"[
  {
    "data": "YYYY-MM-DD", "tipo_de_cafe": "string", "quantidade": "integer",
    "valor": "float", "comprador": "string | null", "vendedor": "string | null", "pago": "string"
  }
]"#;

pub fn build_prompt(
    today: NaiveDate,
    catalog: &[String],
    utterance: &str,
    mode: ExtractMode,
) -> String {
    let products = serde_json::to_string(catalog).unwrap_or_else(|_| "[]".to_string());
    let (shape, schema) = match mode {
        ExtractMode::Object => ("APENAS um objeto JSON", OBJECT_SCHEMA),
        ExtractMode::Array => (
            "APENAS uma lista JSON com um objeto para cada venda mencionada",
            ARRAY_SCHEMA,
        ),
    };

    format!(
        "### CONTEXTO ###\n{CONTEXT}\n\n\
         ### DADOS DE ENTRADA ###\n\
         - Data Atual: \"{date}\"\n\
         - Lista de Produtos Válidos: {products}\n\
         - Mensagem do Usuário: \"{utterance}\"\n\n\
         ### REGRAS ###\n{RULES}\n\
         - \"pago\": \"{PAID_YES}\" se a mensagem disser que já foi pago, caso contrário \"{PAID_NO}\".\n\n\
         ### ESTRUTURA DE SAÍDA (OBRIGATÓRIO) ###\n\
         Responda com {shape}, sem texto adicional:\n{schema}\n",
        date = today.format("%Y-%m-%d"),
    )
}
