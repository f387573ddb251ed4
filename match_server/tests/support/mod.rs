// Shared helpers for integration tests: one server per test binary plus a fake strategy.
#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, OnceLock},
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use match_server::interface_adapters::clients::strategy_protocol::{
    RequestEnvelope, ResponseEnvelope, StrategyRequest, StrategyResponse,
};
use match_server::interface_adapters::protocol::WheelDto;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

// Base URL published once the background server is bound.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// Guards the one-time bootstrap.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return its base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // The server gets its own OS thread and runtime so it outlives each `#[tokio::test]`.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Ephemeral port avoids collisions with a locally running server.
                let listener = TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                match_server::run(listener).await.expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for URL publication, then for the socket to accept TCP connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

pub fn ws_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.replacen("http://", "ws://", 1), path)
}

/// Canned answer for every request: fixed wheels, placement echoes the view.
pub fn cooperative_reply(team_name: &str, request: &RequestEnvelope) -> StrategyResponse {
    match &request.body {
        StrategyRequest::GetTeamInfo => StrategyResponse::TeamInfo {
            team_name: team_name.to_string(),
        },
        StrategyRequest::OnEvent { .. } => StrategyResponse::EventAck,
        StrategyRequest::GetInstruction(_) => StrategyResponse::Instruction {
            wheels: vec![
                WheelDto {
                    left: 10.0,
                    right: 20.0,
                };
                5
            ],
        },
        StrategyRequest::GetPlacement(field) => StrategyResponse::Placement {
            robots: field.our_robots.clone(),
            ball: field.ball,
        },
    }
}

/// Serves a cooperative strategy on an ephemeral port, one task per connection.
pub async fn spawn_fake_strategy(team_name: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake strategy");
    let addr = listener.local_addr().expect("fake strategy addr");
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(tcp).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    let Message::Text(text) = message else {
                        continue;
                    };
                    let request: RequestEnvelope =
                        serde_json::from_str(&text).expect("valid strategy request");
                    let response = ResponseEnvelope {
                        id: request.id,
                        body: cooperative_reply(team_name, &request),
                    };
                    let text = serde_json::to_string(&response).expect("serialize response");
                    if ws.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    addr
}
