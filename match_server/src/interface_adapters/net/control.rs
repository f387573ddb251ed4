// HTTP control routes: strategy connections and match lifecycle.

use crate::domain::{MatchError, Side, StrategyCall, StrategyError};
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::protocol::{
    ConnectStrategyRequest, MatchViewDto, SideDto, TeamInfoResponse,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::MatchCommand;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::warn;

/// Sends one command to the match task and waits for its reply.
async fn request<T>(
    state: &AppState,
    build: impl FnOnce(oneshot::Sender<T>) -> MatchCommand,
) -> Result<T, Response> {
    let (reply, rx) = oneshot::channel();
    let unavailable =
        || error_response(StatusCode::SERVICE_UNAVAILABLE, "match task unavailable");
    state
        .commands
        .send(build(reply))
        .await
        .map_err(|_| unavailable())?;
    rx.await.map_err(|_| unavailable())
}

fn match_error_response(err: MatchError) -> Response {
    match err {
        MatchError::NotReady => error_response(StatusCode::CONFLICT, err.to_string()),
        MatchError::Strategy(fault) => {
            let status = match (&fault.call, &fault.source) {
                (_, StrategyError::InvalidEndpoint(_)) => StatusCode::BAD_REQUEST,
                (StrategyCall::Connect | StrategyCall::TeamInfo, _) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_response(status, fault.to_string())
        }
        MatchError::IllegalState(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

pub async fn connect_strategy_handler(
    State(state): State<Arc<AppState>>,
    Path(side): Path<SideDto>,
    Json(payload): Json<ConnectStrategyRequest>,
) -> Response {
    let side = Side::from(side);
    let endpoint = payload.endpoint.trim().to_string();
    if endpoint.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "endpoint is required");
    }

    let result = match request(&state, |reply| MatchCommand::ConnectStrategy {
        side,
        endpoint,
        reply,
    })
    .await
    {
        Ok(result) => result,
        Err(response) => return response,
    };

    match result {
        Ok(team) => Json(TeamInfoResponse {
            team_name: team.name,
        })
        .into_response(),
        Err(e) => {
            warn!(%side, error = %e, "strategy connect rejected");
            match_error_response(e)
        }
    }
}

pub async fn close_strategy_handler(
    State(state): State<Arc<AppState>>,
    Path(side): Path<SideDto>,
) -> Response {
    let side = Side::from(side);
    match request(&state, |reply| MatchCommand::CloseStrategy { side, reply }).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(response) => response,
    }
}

pub async fn start_handler(State(state): State<Arc<AppState>>) -> Response {
    match request(&state, |reply| MatchCommand::Start { reply }).await {
        Ok(Ok(())) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(e)) => match_error_response(e),
        Err(response) => response,
    }
}

pub async fn stop_handler(State(state): State<Arc<AppState>>) -> Response {
    let result = request(&state, |reply| MatchCommand::Stop {
        notify_strategies: true,
        reply,
    })
    .await;
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(response) => response,
    }
}

pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Response {
    match request(&state, |reply| MatchCommand::Pause { reply }).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(response) => response,
    }
}

pub async fn resume_handler(State(state): State<Arc<AppState>>) -> Response {
    match request(&state, |reply| MatchCommand::Resume { reply }).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(response) => response,
    }
}

pub async fn match_view_handler(State(state): State<Arc<AppState>>) -> Response {
    match request(&state, |reply| MatchCommand::Snapshot { reply }).await {
        Ok(snapshot) => Json(MatchViewDto::from(snapshot)).into_response(),
        Err(response) => response,
    }
}
