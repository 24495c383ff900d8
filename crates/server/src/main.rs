use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{ChannelFrame, FetchResult},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;

use config::load_settings;

const NAMESPACE_BUFFER: usize = 256;
const MAX_NAME_BYTES: usize = 64;

#[derive(Clone)]
struct AppState {
    data: Arc<Value>,
    namespaces: Arc<Mutex<HashMap<String, broadcast::Sender<ChannelFrame>>>>,
}

impl AppState {
    fn new(data: Value) -> Self {
        Self {
            data: Arc::new(data),
            namespaces: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn namespace(&self, name: &str) -> broadcast::Sender<ChannelFrame> {
        self.namespaces
            .lock()
            .await
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(NAMESPACE_BUFFER).0)
            .clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let app = build_router(AppState::new(settings.data));

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/hello/:name", get(hello))
        .route("/data", get(data))
        .route("/io/:namespace", get(ws_handler))
        .fallback(not_found)
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn not_found() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(ErrorCode::NotFound, "no such route")),
    )
}

async fn hello(
    Path(name): Path<String>,
) -> Result<Json<FetchResult>, (StatusCode, Json<ApiError>)> {
    let name = validated_name(&name, "name")?;
    Ok(Json(FetchResult::new(format!("hello {name}"))))
}

async fn data(State(state): State<AppState>) -> Json<FetchResult> {
    Json(FetchResult::new(state.data.as_ref().clone()))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let namespace = validated_name(&namespace, "namespace")?.to_string();
    Ok(ws.on_upgrade(move |socket| ws_connection(state, socket, namespace)))
}

/// Relays every frame received on one socket to all sockets of the same
/// namespace, the sender included.
async fn ws_connection(state: AppState, socket: WebSocket, namespace: String) {
    use futures::{SinkExt, StreamExt};

    let connection_id = Uuid::new_v4();
    let relay = state.namespace(&namespace).await;
    let mut frames_rx = relay.subscribe();
    let (mut sender, mut receiver) = socket.split();
    info!(%namespace, %connection_id, "socket connected");

    let send_task = tokio::spawn(async move {
        loop {
            let frame = match frames_rx.recv().await {
                Ok(frame) => frame,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%connection_id, skipped, "socket lagging; frames dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let text = match serde_json::to_string(&frame) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ChannelFrame>(&text) {
                Ok(frame) => {
                    debug!(%namespace, %connection_id, event = %frame.event, "relaying frame");
                    let _ = relay.send(frame);
                }
                Err(err) => warn!(%namespace, %connection_id, %err, "dropping invalid frame"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    info!(%namespace, %connection_id, "socket disconnected");
}

fn validated_name<'a>(raw: &'a str, what: &str) -> Result<&'a str, (StatusCode, Json<ApiError>)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_NAME_BYTES {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::Validation,
                format!("{what} must be 1..={MAX_NAME_BYTES} bytes"),
            )),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
