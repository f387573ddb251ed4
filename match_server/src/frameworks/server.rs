// Framework bootstrap for the match server runtime.

use crate::frameworks::config;
use crate::interface_adapters::clients::WsConnector;
use crate::interface_adapters::field_host::ChannelFieldHost;
use crate::interface_adapters::net::event_serializer;
use crate::interface_adapters::routes::app;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{
    DefaultPorts, MatchCommand, MatchController, MatchSettings, StrategyManager, match_task,
};

use std::future::Future;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves until the process exits.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    run_until(listener, std::future::pending()).await
}

/// Serves until `shutdown` resolves, then lets the match task emit
/// `PlatformExiting` and close both strategy connections.
pub async fn run_until(
    listener: tokio::net::TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let address = listener.local_addr()?;
    let (state, match_handle) = build_state();
    let commands = state.commands.clone();
    let app = app(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        });

    if commands.send(MatchCommand::Shutdown).await.is_ok() {
        if let Err(e) = match_handle.await {
            tracing::error!(error = %e, "match task failed");
        }
    }
    tracing::info!("match server stopped");
    served
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run_until(listener, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

fn build_state() -> (Arc<AppState>, JoinHandle<()>) {
    let strategy_timeout = config::strategy_timeout();
    let settings = MatchSettings {
        convert_yellow: config::convert_yellow_data(),
        placement_pause: config::placement_pause(),
    };
    let ports = DefaultPorts {
        blue: config::blue_strategy_port(),
        yellow: config::yellow_strategy_port(),
    };
    tracing::debug!(
        strategy_timeout_ms = strategy_timeout.as_millis(),
        blue_port = ports.blue,
        yellow_port = ports.yellow,
        convert_yellow = settings.convert_yellow,
        placement_pause_ms = settings.placement_pause.as_millis(),
        "match server configured"
    );

    // Setup Channels
    // commands: HTTP routes and the field host socket feed the single match task.
    let (commands, commands_rx) = mpsc::channel(config::COMMAND_CHANNEL_CAPACITY);
    // events: lifecycle events, serialized once for every subscriber.
    let (events_tx, events_rx) = broadcast::channel(config::EVENT_BROADCAST_CAPACITY);
    let (event_bytes_tx, _) = broadcast::channel(config::EVENT_BROADCAST_CAPACITY);
    // field_tx: commands for connected physics hosts.
    let (field_tx, _) = broadcast::channel(config::FIELD_COMMAND_CAPACITY);

    let connector = WsConnector {
        connect_timeout: strategy_timeout,
        call_timeout: strategy_timeout,
    };
    let controller = MatchController::new(
        ChannelFieldHost::new(field_tx.clone()),
        StrategyManager::new(Arc::new(connector), ports),
        events_tx,
        settings,
    );

    tokio::spawn(event_serializer(events_rx, event_bytes_tx.clone()));
    let match_handle = tokio::spawn(match_task(controller, commands_rx));

    let state = Arc::new(AppState {
        commands,
        field_tx,
        event_bytes_tx,
    });
    (state, match_handle)
}
