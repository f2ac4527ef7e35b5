mod common;

use common::{MemorySheets, ScriptedOracle};
use graolar_sales::handlers::{reply_for, GREETING};
use graolar_sales::pipeline::{PipelineSettings, SalesPipeline};
use std::sync::Arc;

async fn setup(oracle: ScriptedOracle) -> (MemorySheets, SalesPipeline) {
    let store = MemorySheets::new()
        .with_catalog(&["Especial", "Tradicional"])
        .await
        .with_entries(2)
        .await;
    let pipeline = SalesPipeline::new(
        Arc::new(store.clone()),
        Arc::new(oracle),
        PipelineSettings::default(),
    );
    (store, pipeline)
}

#[tokio::test]
async fn start_greets() {
    let (_, p) = setup(ScriptedOracle::default()).await;
    assert!(reply_for(&p, "/start").await.starts_with(GREETING));
}

#[tokio::test]
async fn products_lists_catalog() {
    let (_, p) = setup(ScriptedOracle::default()).await;
    let reply = reply_for(&p, "/produtos").await;
    assert_eq!(reply, "Produtos disponíveis:\n- Especial\n- Tradicional");
}

#[tokio::test]
async fn products_listing_uses_cached_catalog() {
    let (store, p) = setup(ScriptedOracle::default()).await;
    reply_for(&p, "/produtos").await;
    reply_for(&p, "/produtos").await;
    assert_eq!(store.reads_of("Produtos").await, 1);
}

#[tokio::test]
async fn sale_is_confirmed_with_row() {
    let oracle = ScriptedOracle::replying(
        r#"{"data": null, "tipo_de_cafe": "Tradicional", "quantidade": 1, "valor": 12.5, "comprador": "Rui", "vendedor": null, "pago": "Sim"}"#,
    );
    let (store, p) = setup(oracle).await;

    let reply = reply_for(&p, "um tradicional pro Rui, 12,50, pago").await;
    assert!(reply.starts_with("✅ Venda registrada com sucesso na linha 4 da planilha!"), "{reply}");
    assert!(reply.contains("Comprador: Rui"));
    assert_eq!(store.rows("ENTRADAS").await.len(), 4);
}

#[tokio::test]
async fn failures_become_error_replies() {
    let (store, p) = setup(ScriptedOracle::replying("desculpe, não consegui")).await;

    let reply = reply_for(&p, "vendi algo").await;
    assert!(reply.starts_with("❌ Ocorreu um erro:"), "{reply}");
    assert!(reply.ends_with("Por favor, tente novamente."));
    assert!(store.write_calls().await.is_empty());
}

#[tokio::test]
async fn bad_manual_entry_shows_usage() {
    let (store, p) = setup(ScriptedOracle::default()).await;

    let reply = reply_for(&p, "/manual 2024-03-01;;2").await;
    assert!(reply.starts_with("❌ informe o tipo de café"), "{reply}");
    assert!(store.write_calls().await.is_empty());

    let reply = reply_for(&p, "/manual ;Especial;2;30;Ana;;Sim").await;
    assert!(reply.contains("linha 4"), "{reply}");
}
