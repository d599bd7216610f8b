//! WebSocket and HTTP front end.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::problem;
use crate::{ChannelGateway, DuelService, ErrorReply, Outbound};

/// Problem length used by `/problem` when `num` is absent.
const DEFAULT_PROBLEM_LENGTH: usize = 3;

/// Shared state for request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    service: Arc<DuelService>,
    gateway: Arc<ChannelGateway>,
}

impl AppState {
    /// Creates handler state. `gateway` must be the one the service pushes through.
    pub fn new(service: Arc<DuelService>, gateway: Arc<ChannelGateway>) -> Self {
        Self { service, gateway }
    }
}

/// Builds the router: `GET /ws` for duels and `GET /problem` for one-off puzzles.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/problem", get(problem_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[instrument(skip_all, fields(connection_id))]
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    tracing::Span::current().record("connection_id", connection_id.as_str());

    let (mut sink, mut stream) = socket.split();
    let mut outbound = state.gateway.register(&connection_id).await;

    match state.service.on_connect(&connection_id).await {
        Ok(room_id) => info!(room_id = %room_id, "Connection placed"),
        Err(e) => {
            warn!(error = %e, "Join failed, closing");
            state.gateway.unregister(&connection_id).await;
            let reply = ErrorReply::from(&e).to_json();
            let _ = sink.send(Message::Text(reply.into())).await;
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    }

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(Outbound::Push(notification)) => {
                    if sink.send(Message::Text(notification.to_json().into())).await.is_err() {
                        debug!("Socket send failed");
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    info!("Connection closed by server");
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = state.service.on_message(&connection_id, text.as_str()).await {
                        warn!(error = %e, "Message failed");
                        let reply = ErrorReply::from(&e).to_json();
                        if sink.send(Message::Text(reply.into())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Connection closed by client");
                    break;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Socket error");
                    break;
                }
                Some(Ok(_)) => continue,
            },
        }
    }

    state.gateway.unregister(&connection_id).await;
    let _ = sink.send(Message::Close(None)).await;

    if let Err(e) = state.service.on_disconnect(&connection_id).await {
        warn!(error = %e, "Disconnect handling failed");
    }
}

/// Query for `GET /problem`.
#[derive(Debug, Deserialize)]
pub struct ProblemQuery {
    num: Option<String>,
}

#[instrument]
async fn problem_handler(Query(query): Query<ProblemQuery>) -> Response {
    let length = match query.num.as_deref() {
        None => Some(DEFAULT_PROBLEM_LENGTH),
        Some(raw) => raw.parse::<usize>().ok(),
    };
    let generated = length.and_then(|length| problem::generate(length).ok());

    match generated {
        Some(puzzle) => (
            StatusCode::OK,
            Json(json!({ "problem": puzzle.terms() })),
        )
            .into_response(),
        None => {
            debug!(num = ?query.num, "Rejected problem length");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "invalid parameter!" })),
            )
                .into_response()
        }
    }
}

/// Serves `router` on `host:port` until the process is stopped.
///
/// # Errors
///
/// Returns an I/O error if the address cannot be bound.
#[instrument(skip(state))]
pub async fn serve(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    serve_listener(listener, state).await
}

/// Serves `router` on an already bound listener.
///
/// # Errors
///
/// Returns an I/O error if the server fails.
pub async fn serve_listener(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    info!("Server ready at ws://{}/ws", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}
