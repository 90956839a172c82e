//! Headless walkthrough of the editor: builds a small workflow with pointer
//! gestures and API calls, exercises undo/redo, and auto-saves every change.
//!
//! Runs against an in-memory store by default. Pass `--remote` to save to the
//! backend configured through `STUDIO_API_URL` / `STUDIO_API_TOKEN`. With
//! `--remote --ask "<prompt>"` it also streams one builder reply; Ctrl-C
//! cancels it.

use glam::Vec2;
use std::sync::Arc;
use studio_canvas::input::{Key, KeyEvent, Modifiers, PointerEvent};
use studio_canvas::{DocumentMeta, Editor, Endpoint, NodeCatalog, NodeDefinition};
use studio_client::{
    ApiClient, AutoSaver, ClientConfig, ClientError, Conversation, InMemoryWorkflowStore,
    WorkflowStore, run_turn,
};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn demo_catalog() -> anyhow::Result<NodeCatalog> {
    let definitions: Vec<NodeDefinition> = serde_json::from_value(serde_json::json!([
        {
            "node_type": "http_request",
            "name": "HTTP Request",
            "category": "network",
            "outputs": [{ "name": "response", "data_type": "json" }],
            "default_config": { "method": "GET" }
        },
        {
            "node_type": "json_transform",
            "name": "Transform",
            "category": "data",
            "inputs": [{ "name": "input", "data_type": "json" }],
            "outputs": [{ "name": "output", "data_type": "json" }]
        }
    ]))?;
    Ok(NodeCatalog::from_definitions(definitions))
}

/// Queues a save whenever the editor revision moved.
fn track(editor: &Editor, meta: &DocumentMeta, saver: &AutoSaver, seen: &mut u64) {
    if editor.revision() != *seen {
        *seen = editor.revision();
        saver.notify(editor.document(meta));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Configuration and store
    let config = ClientConfig::from_env()?;
    let args: Vec<String> = std::env::args().collect();
    let remote = args.iter().any(|a| a == "--remote");
    let prompt = args
        .iter()
        .position(|a| a == "--ask")
        .and_then(|i| args.get(i + 1))
        .cloned();

    let client = if remote {
        Some(Arc::new(ApiClient::new(&config)?))
    } else {
        None
    };
    let store: Arc<dyn WorkflowStore> = match &client {
        Some(client) => {
            info!(base_url = %config.base_url, "Saving to backend");
            client.clone() as Arc<dyn WorkflowStore>
        }
        None => {
            info!("Saving to in-memory store");
            Arc::new(InMemoryWorkflowStore::new())
        }
    };
    let saver = AutoSaver::spawn(store, &config, None);

    // 2. Build a two-node flow from the palette
    let catalog = demo_catalog()?;
    let mut editor = Editor::default();
    let meta = DocumentMeta::new("Playground flow");
    let mut seen = editor.revision();

    let fetch_def = catalog
        .get("http_request")
        .ok_or_else(|| anyhow::anyhow!("catalog is missing http_request"))?;
    let transform_def = catalog
        .get("json_transform")
        .ok_or_else(|| anyhow::anyhow!("catalog is missing json_transform"))?;

    let fetch = editor.add_node_from_definition(fetch_def, Vec2::new(100.0, 100.0))?;
    let transform = editor.add_node_from_definition(transform_def, Vec2::new(400.0, 100.0))?;
    track(&editor, &meta, &saver, &mut seen);

    let source_port = editor
        .state()
        .node(&fetch)
        .and_then(|n| n.outputs.first())
        .map(|p| p.id.clone())
        .ok_or_else(|| anyhow::anyhow!("fetch node has no output"))?;
    let target_port = editor
        .state()
        .node(&transform)
        .and_then(|n| n.inputs.first())
        .map(|p| p.id.clone())
        .ok_or_else(|| anyhow::anyhow!("transform node has no input"))?;
    editor.connect(
        Endpoint::new(fetch.clone(), source_port),
        Endpoint::new(transform.clone(), target_port),
    )?;
    track(&editor, &meta, &saver, &mut seen);

    // 3. Drag the transform node 120px down. One history entry for the gesture.
    let grab = Vec2::new(490.0, 136.0);
    editor.handle_pointer(&PointerEvent::down(grab));
    for step in 1..=4 {
        editor.handle_pointer(&PointerEvent::moved(grab + Vec2::new(0.0, 30.0 * step as f32)));
    }
    editor.handle_pointer(&PointerEvent::up(grab + Vec2::new(0.0, 120.0)));
    track(&editor, &meta, &saver, &mut seen);
    info!(history = editor.history_len(), revision = editor.revision(), "Dragged node");

    // 4. Undo the drag, then redo it
    let ctrl = Modifiers {
        ctrl: true,
        ..Modifiers::default()
    };
    editor.handle_key(&KeyEvent::new(Key::Z, ctrl));
    track(&editor, &meta, &saver, &mut seen);
    editor.handle_key(&KeyEvent::new(Key::Y, ctrl));
    track(&editor, &meta, &saver, &mut seen);

    // 5. Flush pending work and report
    saver.flush().await;
    let status = saver.status();
    info!(
        workflow_id = ?status.workflow_id,
        saves = status.saves_completed,
        error = ?status.last_error,
        "Auto-save settled"
    );
    saver.shutdown().await;

    let document = editor.document(&meta);
    println!("{}", serde_json::to_string_pretty(&document)?);

    // 6. Optional builder turn
    if let (Some(client), Some(prompt)) = (client, prompt) {
        ask_builder(&client, &config, &prompt).await?;
    }
    Ok(())
}

async fn ask_builder(
    client: &ApiClient,
    config: &ClientConfig,
    prompt: &str,
) -> anyhow::Result<()> {
    let mut conversation = Conversation::from_config(config);
    let (cancel_tx, cancel_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(()).await;
        }
    });

    match run_turn(client, &mut conversation, prompt, Vec::new(), cancel_rx).await {
        Ok(()) | Err(ClientError::Cancelled) => {}
        Err(e) => return Err(e.into()),
    }
    if let Some(reply) = conversation.messages().last() {
        println!("{}", reply.content);
    }
    if let Some(error) = conversation.last_error() {
        info!(error, "Builder reported an error");
    }
    Ok(())
}
