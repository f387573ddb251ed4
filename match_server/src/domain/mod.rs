// Domain layer: field model, match state, referee rules and ports.

pub mod endpoint;
pub mod errors;
pub mod field;
pub mod match_info;
pub mod ports;
pub mod referee;

pub use endpoint::Endpoint;
pub use errors::{MatchError, StrategyCall, StrategyError, StrategyFault};
pub use field::{
    Ball, FieldFrame, Frame, OpponentRobot, PlacementInfo, ROBOTS_PER_TEAM, Robot, Side, SideInfo,
    TeamInfo, Vector2, Wheel, WheelInfo,
};
pub use match_info::{MatchInfo, MatchPhase, MatchScore};
pub use ports::{FieldHost, Strategy, StrategyConnector, StrategyEvent};
pub use referee::{JudgeResult, Referee, ResultType};
