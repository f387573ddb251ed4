// WebSocket RPC client for remote strategy processes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

use super::strategy_protocol::{
    FieldDto, RequestEnvelope, ResponseEnvelope, StrategyRequest, StrategyResponse,
};
use crate::domain::{
    Endpoint, PlacementInfo, SideInfo, Strategy, StrategyConnector, StrategyError, StrategyEvent,
    TeamInfo, WheelInfo,
};
use crate::interface_adapters::protocol::{team_from_dto, wheels_from_dto};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens strategy connections over `ws://host:port/`.
#[derive(Debug, Clone, Copy)]
pub struct WsConnector {
    pub connect_timeout: Duration,
    pub call_timeout: Duration,
}

#[async_trait]
impl StrategyConnector for WsConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Strategy>, StrategyError> {
        let url = format!("ws://{}/", endpoint.addr);
        let (stream, _response) = timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| StrategyError::ConnectTimeout(endpoint.to_string()))?
            .map_err(|e| StrategyError::Connect {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        debug!(%endpoint, "strategy socket open");
        Ok(Box::new(RpcStrategy::new(*endpoint, stream, self.call_timeout)))
    }
}

/// One strategy connection. Calls are serialized: a single request is in
/// flight at a time and each one is bounded by `call_timeout`.
pub struct RpcStrategy {
    endpoint: Endpoint,
    call_timeout: Duration,
    next_id: AtomicU64,
    // Cleared together with `stream`; readable without waiting on an in-flight call.
    open: AtomicBool,
    // None once closed.
    stream: Mutex<Option<WsStream>>,
}

impl RpcStrategy {
    fn new(endpoint: Endpoint, stream: WsStream, call_timeout: Duration) -> Self {
        Self {
            endpoint,
            call_timeout,
            next_id: AtomicU64::new(1),
            open: AtomicBool::new(true),
            stream: Mutex::new(Some(stream)),
        }
    }

    async fn call(&self, body: StrategyRequest) -> Result<StrategyResponse, StrategyError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(StrategyError::Closed)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let text = serde_json::to_string(&RequestEnvelope { id, body })
            .map_err(|e| StrategyError::Protocol(e.to_string()))?;

        match timeout(self.call_timeout, exchange(stream, id, text)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(StrategyError::Closed)) => {
                info!(endpoint = %self.endpoint, "strategy closed the connection");
                *guard = None;
                self.open.store(false, Ordering::Release);
                Err(StrategyError::Closed)
            }
            Ok(Err(e)) => Err(e),
            // A late reply carries this id and is skipped by the next call.
            Err(_) => Err(StrategyError::Timeout),
        }
    }
}

async fn exchange(
    stream: &mut WsStream,
    id: u64,
    text: String,
) -> Result<StrategyResponse, StrategyError> {
    stream
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| StrategyError::Transport(e.to_string()))?;

    loop {
        let Some(message) = stream.next().await else {
            return Err(StrategyError::Closed);
        };
        match message.map_err(|e| StrategyError::Transport(e.to_string()))? {
            Message::Text(text) => {
                let envelope: ResponseEnvelope = serde_json::from_str(&text)
                    .map_err(|e| StrategyError::Protocol(e.to_string()))?;
                if envelope.id != id {
                    debug!(expected = id, got = envelope.id, "skipping stale strategy response");
                    continue;
                }
                return Ok(envelope.body);
            }
            Message::Close(_) => return Err(StrategyError::Closed),
            _ => continue,
        }
    }
}

fn unexpected(expected: &str, response: StrategyResponse) -> StrategyError {
    match response {
        StrategyResponse::Error { message } => StrategyError::Rejected(message),
        other => StrategyError::Protocol(format!(
            "expected {expected} response, got {}",
            other.kind()
        )),
    }
}

#[async_trait]
impl Strategy for RpcStrategy {
    async fn team_info(&self) -> Result<TeamInfo, StrategyError> {
        match self.call(StrategyRequest::GetTeamInfo).await? {
            StrategyResponse::TeamInfo { team_name } => Ok(TeamInfo { name: team_name }),
            other => Err(unexpected("TeamInfo", other)),
        }
    }

    async fn on_event(&self, event: StrategyEvent) -> Result<(), StrategyError> {
        let request = StrategyRequest::OnEvent {
            event: event.into(),
        };
        match self.call(request).await? {
            StrategyResponse::EventAck => Ok(()),
            other => Err(unexpected("EventAck", other)),
        }
    }

    async fn instruction(&self, view: &SideInfo) -> Result<WheelInfo, StrategyError> {
        match self.call(StrategyRequest::GetInstruction(FieldDto::from(view))).await? {
            StrategyResponse::Instruction { wheels } => {
                wheels_from_dto(wheels).map_err(|e| StrategyError::Protocol(e.to_string()))
            }
            other => Err(unexpected("Instruction", other)),
        }
    }

    async fn placement(&self, view: &SideInfo) -> Result<PlacementInfo, StrategyError> {
        match self.call(StrategyRequest::GetPlacement(FieldDto::from(view))).await? {
            StrategyResponse::Placement { robots, ball } => Ok(PlacementInfo {
                robots: team_from_dto(robots).map_err(|e| StrategyError::Protocol(e.to_string()))?,
                ball: ball.into(),
                frame: view.frame,
            }),
            other => Err(unexpected("Placement", other)),
        }
    }

    async fn close(&self) -> Result<(), StrategyError> {
        let Some(mut stream) = self.stream.lock().await.take() else {
            return Ok(());
        };
        self.open.store(false, Ordering::Release);
        debug!(endpoint = %self.endpoint, "closing strategy socket");
        stream
            .close(None)
            .await
            .map_err(|e| StrategyError::Transport(e.to_string()))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}
