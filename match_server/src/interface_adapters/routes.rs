use crate::interface_adapters::net::{
    close_strategy_handler, connect_strategy_handler, events_ws_handler, field_ws_handler,
    match_view_handler, pause_handler, resume_handler, start_handler, stop_handler,
};
use crate::interface_adapters::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/strategies/{side}",
            post(connect_strategy_handler).delete(close_strategy_handler),
        )
        .route("/match", get(match_view_handler))
        .route("/match/start", post(start_handler))
        .route("/match/stop", post(stop_handler))
        .route("/match/pause", post(pause_handler))
        .route("/match/resume", post(resume_handler))
        .route("/field", get(field_ws_handler))
        .route("/events", get(events_ws_handler))
        .with_state(state)
}
