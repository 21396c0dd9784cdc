use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::Response;
use metrics::gauge;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::auth::decode_token;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// GET /ws
///
/// Anonymous clients get price updates only. A JWT in `?token=` or the
/// `Authorization` header also subscribes to that user's positions and alerts.
pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = query.token.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_owned)
    });

    let viewer = match token {
        Some(t) => Some(decode_token(&t, &state.config.jwt_secret)?.sub),
        None => None,
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, viewer)))
}

/// Forward broadcast messages the viewer may see to one client.
async fn handle_socket(mut socket: WebSocket, state: AppState, viewer: Option<Uuid>) {
    let mut rx = state.ws_tx.subscribe();
    gauge!("ws_clients").increment(1.0);
    tracing::info!(user_id = ?viewer, "Market WebSocket client connected");

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Ok(ws_msg) if !ws_msg.visible_to(viewer) => {}
                    Ok(ws_msg) => match serde_json::to_string(&ws_msg) {
                        Ok(json) => {
                            if socket.send(Message::Text(json)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => tracing::error!(error = %e, "Failed to serialize WsMessage"),
                    },
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Market WS client lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            client_msg = socket.recv() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    // text/binary from clients is ignored
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    gauge!("ws_clients").decrement(1.0);
    tracing::info!(user_id = ?viewer, "Market WebSocket client disconnected");
}
