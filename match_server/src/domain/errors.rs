// Domain-level errors for strategy calls and match control.

use super::field::Side;
use std::fmt;
use thiserror::Error;

/// Strategy operation that was in flight when a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyCall {
    Connect,
    TeamInfo,
    Instruction,
    Placement,
}

impl fmt::Display for StrategyCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyCall::Connect => "connect",
            StrategyCall::TeamInfo => "team_info",
            StrategyCall::Instruction => "instruction",
            StrategyCall::Placement => "placement",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("invalid strategy endpoint `{0}`")]
    InvalidEndpoint(String),
    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),
    #[error("failed to connect to {endpoint}: {message}")]
    Connect { endpoint: String, message: String },
    #[error("strategy call timed out")]
    Timeout,
    #[error("strategy transport error: {0}")]
    Transport(String),
    #[error("strategy protocol error: {0}")]
    Protocol(String),
    #[error("strategy rejected the request: {0}")]
    Rejected(String),
    #[error("strategy connection is closed")]
    Closed,
    #[error("no strategy connected")]
    NotConnected,
}

impl StrategyError {
    /// Slow strategy, as opposed to a broken connection or a bad reply.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StrategyError::Timeout | StrategyError::ConnectTimeout(_))
    }
}

/// A strategy failure attributed to one side and one call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{side} strategy failed during {call}: {source}")]
pub struct StrategyFault {
    pub side: Side,
    pub call: StrategyCall,
    #[source]
    pub source: StrategyError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("both strategies must be connected")]
    NotReady,
    #[error(transparent)]
    Strategy(#[from] StrategyFault),
    #[error("illegal referee state: {0}")]
    IllegalState(String),
}
