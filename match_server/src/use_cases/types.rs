// Use-case level inputs/outputs for the match task.

use tokio::sync::oneshot;

use crate::domain::{FieldFrame, MatchError, MatchInfo, Side, StrategyCall, TeamInfo};

/// Lifecycle events published to UI/telemetry subscribers.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    MatchStart(MatchInfo),
    MatchStop(MatchInfo),
    /// Emitted only when the match tick really advanced.
    MatchInfoUpdate(MatchInfo),
    AutoPlacement(MatchInfo),
    StrategyFault {
        side: Side,
        call: StrategyCall,
        message: String,
    },
    PlatformExiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    NotStarted,
    Running,
    Paused,
    Stopped,
}

impl MatchStatus {
    pub fn is_started(self) -> bool {
        matches!(self, MatchStatus::Running | MatchStatus::Paused)
    }
}

#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    pub status: MatchStatus,
    pub info: MatchInfo,
    pub blue_team: Option<String>,
    pub yellow_team: Option<String>,
}

pub type Reply<T> = oneshot::Sender<T>;

/// Commands accepted by the match task.
#[derive(Debug)]
pub enum MatchCommand {
    ConnectStrategy {
        side: Side,
        endpoint: String,
        reply: Reply<Result<TeamInfo, MatchError>>,
    },
    CloseStrategy {
        side: Side,
        reply: Reply<()>,
    },
    Start {
        reply: Reply<Result<(), MatchError>>,
    },
    Stop {
        notify_strategies: bool,
        reply: Reply<()>,
    },
    Pause {
        reply: Reply<()>,
    },
    Resume {
        reply: Reply<()>,
    },
    /// Physics step from the field host; drives one tick.
    FieldFrame(FieldFrame),
    Snapshot {
        reply: Reply<MatchSnapshot>,
    },
    Shutdown,
}
