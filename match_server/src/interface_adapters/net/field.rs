use crate::domain::FieldFrame;
use crate::interface_adapters::protocol::{FieldCommandDto, FieldHostMessage};
use crate::interface_adapters::state::AppState;
use crate::use_cases::MatchCommand;

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{Instrument, debug, info, info_span, warn};

use super::next_conn_id;

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_MESSAGES: u32 = 10;

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    MatchTaskClosed,
    TooManyInvalidMessages,
}

/// Physics host socket: inbound frames drive ticks, outbound messages are
/// field commands.
pub async fn field_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    // Subscribe before the upgrade completes so no command is missed.
    let field_rx = state.field_tx.subscribe();
    let commands = state.commands.clone();
    ws.on_upgrade(move |socket| {
        run_field_host(socket, field_rx, commands)
            .instrument(info_span!("field_host", conn_id = next_conn_id()))
    })
}

async fn run_field_host(
    mut socket: WebSocket,
    field_rx: broadcast::Receiver<FieldCommandDto>,
    commands: mpsc::Sender<MatchCommand>,
) {
    info!("field host connected");
    let result = field_host_loop(&mut socket, field_rx, &commands).await;

    let close_frame = match &result {
        Err(NetError::TooManyInvalidMessages) => Some(CloseFrame {
            code: close_code::POLICY,
            reason: "too many invalid messages".into(),
        }),
        Err(NetError::MatchTaskClosed) => Some(CloseFrame {
            code: close_code::AWAY,
            reason: "match server shutting down".into(),
        }),
        _ => None,
    };
    if let Some(frame) = close_frame {
        let _ = socket.send(Message::Close(Some(frame))).await;
    }

    match result {
        Ok(frames) => info!(frames, "field host disconnected"),
        Err(e) => warn!(error = ?e, "field host loop exited with error"),
    }
}

async fn field_host_loop(
    socket: &mut WebSocket,
    mut field_rx: broadcast::Receiver<FieldCommandDto>,
    commands: &mpsc::Sender<MatchCommand>,
) -> Result<u64, NetError> {
    let mut frames: u64 = 0;
    let mut invalid: u32 = 0;
    let mut last_invalid_log = Instant::now() - LOG_THROTTLE;

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => return Ok(frames),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(NetError::Ws(e)),
                };

                match parse_frame(text.as_str()) {
                    Ok(frame) => {
                        commands
                            .send(MatchCommand::FieldFrame(frame))
                            .await
                            .map_err(|_| NetError::MatchTaskClosed)?;
                        frames += 1;
                    }
                    Err(reason) => {
                        invalid += 1;
                        if should_log(&mut last_invalid_log) {
                            warn!(invalid, %reason, "invalid field host message");
                        }
                        if invalid >= MAX_INVALID_MESSAGES {
                            return Err(NetError::TooManyInvalidMessages);
                        }
                    }
                }
            }
            command = field_rx.recv() => {
                match command {
                    Ok(command) => {
                        let txt = match serde_json::to_string(&command) {
                            Ok(txt) => txt,
                            Err(e) => {
                                warn!(error = %e, "failed to serialize field command");
                                continue;
                            }
                        };
                        socket
                            .send(Message::Text(txt.into()))
                            .await
                            .map_err(NetError::Ws)?;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "field host lagged; commands dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("field command channel closed");
                        return Err(NetError::MatchTaskClosed);
                    }
                }
            }
        }
    }
}

fn parse_frame(text: &str) -> Result<FieldFrame, String> {
    let FieldHostMessage::Frame(frame) =
        serde_json::from_str::<FieldHostMessage>(text).map_err(|e| e.to_string())?;
    FieldFrame::try_from(frame).map_err(|e| e.to_string())
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}
