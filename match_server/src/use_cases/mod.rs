// Use cases layer: strategy connections, match orchestration and the match task.

pub mod match_task;
pub mod orchestrator;
pub mod strategy_manager;
pub mod timed_pause;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use match_task::match_task;
pub use orchestrator::{MatchController, MatchSettings};
pub use strategy_manager::{DefaultPorts, StrategyManager};
pub use types::{MatchCommand, MatchEvent, MatchSnapshot, MatchStatus};
