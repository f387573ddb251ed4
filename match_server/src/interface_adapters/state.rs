use crate::interface_adapters::protocol::FieldCommandDto;
use crate::use_cases::MatchCommand;
use axum::extract::ws::Utf8Bytes;
use tokio::sync::{broadcast, mpsc};

#[derive(Clone)]
pub struct AppState {
    // Commands and field frames flowing into the match task.
    pub commands: mpsc::Sender<MatchCommand>,
    // Field commands fanned out to connected physics hosts.
    pub field_tx: broadcast::Sender<FieldCommandDto>,
    // Serialized lifecycle events, shared across all subscribers.
    pub event_bytes_tx: broadcast::Sender<Utf8Bytes>,
}
