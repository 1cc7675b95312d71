use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use sketchboard_shared::MAX_LINE_LEN;
use tracing::debug;

use crate::hub::Hub;
use crate::sessions::Session;
use crate::state::AppState;

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn sketch_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.hub.snapshot().await)
}

pub async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(MAX_LINE_LEN)
        .on_upgrade(move |socket| handle_socket(socket, state.hub, addr))
}

// Same protocol as the TCP transport; each text frame holds one or more lines.
async fn handle_socket(socket: WebSocket, hub: Arc<Hub>, addr: SocketAddr) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (mut session, mut outbound) = Session::open(hub, format!("ws://{addr}")).await;

    let send_task = tokio::spawn(async move {
        while let Some(line) = outbound.recv().await {
            if socket_sender
                .send(Message::Text(line.to_string()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            message = socket_receiver.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    for line in text.lines() {
                        session.handle_line(line).await;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    for line in String::from_utf8_lossy(&data).lines() {
                        session.handle_line(line).await;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    if let Some(frame) = &frame {
                        debug!(
                            session = %session.id(),
                            code = frame.code,
                            reason = %frame.reason,
                            "ws close frame"
                        );
                    }
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    debug!(session = %session.id(), %error, "ws receive failed");
                    break;
                }
                None => break,
            },
            _ = session.kicked() => break,
        }
    }

    session.close().await;
    send_task.abort();
}
