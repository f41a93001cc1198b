use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use render_gateway::{CameraIntrinsics, HttpRenderer, KeyboardRig, ModelCatalog, ModelManager};
use session_core::{EventDispatcher, Outbox};
use shared::{
    domain::{ConnectionId, ModelId},
    protocol::{ClientEvent, ServerEvent},
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_catalog_dir};

const MAX_FRAME_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let catalog_dir = prepare_catalog_dir(&settings.catalog_dir)?;
    let renderer = HttpRenderer::new(
        &settings.renderer_url,
        Duration::from_secs(settings.render_timeout_seconds),
    )?;
    info!(render_url = %renderer.render_url(), "using external renderer");

    let catalog = ModelCatalog::load(
        &catalog_dir,
        Arc::new(renderer),
        CameraIntrinsics::default(),
    )
    .map_err(|error| {
        error!(
            catalog_dir = %catalog_dir.display(),
            error = ?error,
            "failed to load model catalog; check every model.toml and its json files"
        );
        error
    })?;
    if catalog.is_empty() {
        warn!(catalog_dir = %catalog_dir.display(), "model catalog is empty");
    }

    let rig = KeyboardRig::new(settings.translate_per_step, settings.rotate_deg_per_step);
    let dispatcher = EventDispatcher::new(Arc::new(catalog), Arc::new(rig))
        .with_nearest_count(settings.nearest_count);

    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        max_send_queue: settings.max_send_queue.max(1),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/models", get(list_models))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_models(State(state): State<Arc<AppState>>) -> Json<Vec<ModelId>> {
    Json(state.dispatcher.gateway().list_models().await)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| ws_connection(state, socket))
}

/// Runs one client connection. Inbound events are handled in arrival order by a
/// dedicated worker; outbound events are written by a separate task.
async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    let conn = ConnectionId::new();
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerEvent>(state.max_send_queue);
    let outbox = Outbox::new(conn, outbound_tx);

    let send_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(error) => {
                    warn!(%conn, %error, "failed to encode outbound event");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let dispatcher = Arc::clone(&state.dispatcher);
    if let Err(error) = dispatcher.connect(&outbox).await {
        warn!(%conn, %error, "refusing connection");
        send_task.abort();
        return;
    }

    let (inbound_tx, mut inbound_rx) = mpsc::channel::<ClientEvent>(state.max_send_queue);
    let worker = {
        let dispatcher = Arc::clone(&dispatcher);
        let outbox = outbox.clone();
        tokio::spawn(async move {
            while let Some(event) = inbound_rx.recv().await {
                dispatcher.dispatch(&outbox, event).await;
            }
        })
    };

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    if inbound_tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(error) => dispatcher.reject_frame(&outbox, error.to_string()).await,
            },
            Message::Binary(_) => debug!(%conn, "ignoring binary frame"),
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    dispatcher.disconnect(conn);
    drop(inbound_tx);
    drop(outbox);
    if let Err(error) = worker.await {
        warn!(%conn, %error, "connection worker ended abnormally");
    }
    send_task.abort();
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
