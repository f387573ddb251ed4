use async_trait::async_trait;

use super::endpoint::Endpoint;
use super::errors::StrategyError;
use super::field::{Ball, PlacementInfo, ROBOTS_PER_TEAM, Robot, SideInfo, TeamInfo, WheelInfo};

/// Lifecycle notifications delivered to strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyEvent {
    MatchStart,
    MatchStop,
    RoundStart,
    RoundStop,
}

// Port for one team's decision-making process.
#[async_trait]
pub trait Strategy: Send + Sync {
    async fn team_info(&self) -> Result<TeamInfo, StrategyError>;
    async fn on_event(&self, event: StrategyEvent) -> Result<(), StrategyError>;
    async fn instruction(&self, view: &SideInfo) -> Result<WheelInfo, StrategyError>;
    /// The returned placement carries the frame of `view`.
    async fn placement(&self, view: &SideInfo) -> Result<PlacementInfo, StrategyError>;
    async fn close(&self) -> Result<(), StrategyError>;
    /// False once the connection is gone, closed locally or by the remote side.
    fn is_open(&self) -> bool;
}

// Port for opening strategy connections; one implementation per transport.
#[async_trait]
pub trait StrategyConnector: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Strategy>, StrategyError>;
}

// Port for the physics host that owns the real robot and ball positions.
// Commands are fire-and-forget; implementations log their own delivery failures.
pub trait FieldHost: Send {
    fn pause(&self);
    fn resume(&self);
    fn set_to_default(&self);
    fn set_still(&self);
    fn set_blue_wheels(&self, wheels: &WheelInfo);
    fn set_yellow_wheels(&self, wheels: &WheelInfo);
    fn set_blue_placement(&self, robots: &[Robot; ROBOTS_PER_TEAM]);
    fn set_yellow_placement(&self, robots: &[Robot; ROBOTS_PER_TEAM]);
    fn set_ball_placement(&self, ball: &Ball);
}
