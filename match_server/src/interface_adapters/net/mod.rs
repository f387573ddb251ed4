// Network adapter modules: physics host socket, event stream and HTTP control routes.

pub mod control;
pub mod events;
pub mod field;

pub use control::{
    close_strategy_handler, connect_strategy_handler, match_view_handler, pause_handler,
    resume_handler, start_handler, stop_handler,
};
pub use events::{event_serializer, events_ws_handler};
pub use field::field_ws_handler;

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique id for correlating socket logs.
pub(crate) fn next_conn_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
