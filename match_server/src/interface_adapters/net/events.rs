use crate::interface_adapters::protocol::MatchEventDto;
use crate::interface_adapters::state::AppState;
use crate::use_cases::MatchEvent;

use axum::{
    extract::{
        State,
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::next_conn_id;

pub async fn event_serializer(
    mut events_rx: broadcast::Receiver<MatchEvent>,
    event_bytes_tx: broadcast::Sender<Utf8Bytes>,
) {
    // Serialize each lifecycle event once and broadcast the shared bytes.
    loop {
        match events_rx.recv().await {
            Ok(event) => {
                let txt = match serde_json::to_string(&MatchEventDto::from(&event)) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize match event");
                        continue;
                    }
                };
                let _ = event_bytes_tx.send(Utf8Bytes::from(txt));
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "event serializer lagged; events skipped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("match events channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn events_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // Subscribe before the upgrade completes so no event is missed.
    let event_rx = state.event_bytes_tx.subscribe();
    ws.on_upgrade(move |socket| {
        forward_events(socket, event_rx).instrument(info_span!("events", conn_id = next_conn_id()))
    })
}

async fn forward_events(mut socket: WebSocket, mut event_rx: broadcast::Receiver<Utf8Bytes>) {
    info!("event subscriber connected");

    let mut sent: u64 = 0;
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(error = %e, "event socket error");
                        break;
                    }
                    // Subscribers are read-only.
                    Some(Ok(_)) => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(bytes) => {
                        if socket.send(Message::Text(bytes)).await.is_err() {
                            break;
                        }
                        sent += 1;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "event subscriber lagged; events skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    info!(sent, "event subscriber disconnected");
}
