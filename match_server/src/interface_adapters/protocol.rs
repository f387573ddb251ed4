// Wire protocol DTOs and conversions for the public match server surface:
// field host socket, lifecycle event stream and HTTP control API.
// Strategy RPC envelopes live in `clients::strategy_protocol`.

use crate::domain::{
    Ball, FieldFrame, MatchInfo, ROBOTS_PER_TEAM, Robot, Side, Vector2, Wheel, WheelInfo,
};
use crate::use_cases::{MatchEvent, MatchSnapshot, MatchStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelDto {
    pub left: f32,
    pub right: f32,
}

impl From<Wheel> for WheelDto {
    fn from(wheel: Wheel) -> Self {
        Self {
            left: wheel.left,
            right: wheel.right,
        }
    }
}

impl From<WheelDto> for Wheel {
    fn from(wheel: WheelDto) -> Self {
        Self {
            left: wheel.left,
            right: wheel.right,
        }
    }
}

/// Robot pose in centimetres and degrees. Wheels are optional on input.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RobotDto {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    #[serde(default)]
    pub wheel: WheelDto,
}

impl From<&Robot> for RobotDto {
    fn from(robot: &Robot) -> Self {
        Self {
            x: robot.pos.x,
            y: robot.pos.y,
            rotation: robot.rotation,
            wheel: robot.wheel.into(),
        }
    }
}

impl From<RobotDto> for Robot {
    fn from(robot: RobotDto) -> Self {
        Self {
            pos: Vector2::new(robot.x, robot.y),
            rotation: robot.rotation,
            wheel: robot.wheel.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BallDto {
    pub x: f32,
    pub y: f32,
}

impl From<&Ball> for BallDto {
    fn from(ball: &Ball) -> Self {
        Self {
            x: ball.pos.x,
            y: ball.pos.y,
        }
    }
}

impl From<BallDto> for Ball {
    fn from(ball: BallDto) -> Self {
        Self {
            pos: Vector2::new(ball.x, ball.y),
        }
    }
}

pub fn robots_to_dto(robots: &[Robot; ROBOTS_PER_TEAM]) -> Vec<RobotDto> {
    robots.iter().map(RobotDto::from).collect()
}

/// Converts a wire team, rejecting anything but exactly one entry per robot.
pub fn team_from_dto(robots: Vec<RobotDto>) -> Result<[Robot; ROBOTS_PER_TEAM], WireCountError> {
    let found = robots.len();
    let robots: [RobotDto; ROBOTS_PER_TEAM] = robots
        .try_into()
        .map_err(|_| WireCountError { found })?;
    Ok(robots.map(Robot::from))
}

pub fn wheels_from_dto(wheels: Vec<WheelDto>) -> Result<WheelInfo, WireCountError> {
    let found = wheels.len();
    let wheels: [WheelDto; ROBOTS_PER_TEAM] = wheels
        .try_into()
        .map_err(|_| WireCountError { found })?;
    Ok(WheelInfo {
        wheels: wheels.map(Wheel::from),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected} entries, got {found}", expected = ROBOTS_PER_TEAM)]
pub struct WireCountError {
    pub found: usize,
}

/// Messages the physics host sends over the `/field` socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FieldHostMessage {
    // One physics step; drives one match tick.
    Frame(FieldFrameDto),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldFrameDto {
    pub ball: BallDto,
    pub blue: Vec<RobotDto>,
    pub yellow: Vec<RobotDto>,
}

impl TryFrom<FieldFrameDto> for FieldFrame {
    type Error = WireCountError;

    fn try_from(frame: FieldFrameDto) -> Result<Self, Self::Error> {
        Ok(Self {
            ball: frame.ball.into(),
            blue: team_from_dto(frame.blue)?,
            yellow: team_from_dto(frame.yellow)?,
        })
    }
}

/// Commands the server sends to the physics host over the `/field` socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FieldCommandDto {
    Pause,
    Resume,
    SetToDefault,
    SetStill,
    SetBlueWheels { wheels: Vec<WheelDto> },
    SetYellowWheels { wheels: Vec<WheelDto> },
    SetBluePlacement { robots: Vec<RobotDto> },
    SetYellowPlacement { robots: Vec<RobotDto> },
    SetBallPlacement(BallDto),
}

/// Full match state as sent to event subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct MatchInfoDto {
    pub phase: String,
    pub score: ScoreDto,
    pub tick_match: u64,
    pub tick_round: u64,
    pub ball: BallDto,
    pub blue_robots: Vec<RobotDto>,
    pub yellow_robots: Vec<RobotDto>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreDto {
    pub blue: u32,
    pub yellow: u32,
}

impl From<&MatchInfo> for MatchInfoDto {
    fn from(info: &MatchInfo) -> Self {
        Self {
            phase: info.phase.to_string(),
            score: ScoreDto {
                blue: info.score.blue,
                yellow: info.score.yellow,
            },
            tick_match: info.tick_match,
            tick_round: info.tick_round,
            ball: BallDto::from(&info.ball),
            blue_robots: robots_to_dto(&info.blue_robots),
            yellow_robots: robots_to_dto(&info.yellow_robots),
        }
    }
}

/// Lifecycle events sent over the `/events` socket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum MatchEventDto {
    MatchStart(MatchInfoDto),
    MatchStop(MatchInfoDto),
    MatchInfoUpdate(MatchInfoDto),
    AutoPlacement(MatchInfoDto),
    StrategyFault {
        side: String,
        call: String,
        message: String,
    },
    PlatformExiting,
}

impl From<&MatchEvent> for MatchEventDto {
    fn from(event: &MatchEvent) -> Self {
        match event {
            MatchEvent::MatchStart(info) => MatchEventDto::MatchStart(info.into()),
            MatchEvent::MatchStop(info) => MatchEventDto::MatchStop(info.into()),
            MatchEvent::MatchInfoUpdate(info) => MatchEventDto::MatchInfoUpdate(info.into()),
            MatchEvent::AutoPlacement(info) => MatchEventDto::AutoPlacement(info.into()),
            MatchEvent::StrategyFault {
                side,
                call,
                message,
            } => MatchEventDto::StrategyFault {
                side: side.to_string(),
                call: call.to_string(),
                message: message.clone(),
            },
            MatchEvent::PlatformExiting => MatchEventDto::PlatformExiting,
        }
    }
}

/// Path segment naming a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideDto {
    Blue,
    Yellow,
}

impl From<SideDto> for Side {
    fn from(side: SideDto) -> Self {
        match side {
            SideDto::Blue => Side::Blue,
            SideDto::Yellow => Side::Yellow,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectStrategyRequest {
    // `host[:port]`; the side's default port applies when omitted.
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamInfoResponse {
    pub team_name: String,
}

/// Summary returned by `GET /match`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchViewDto {
    pub status: String,
    pub phase: String,
    pub score: ScoreDto,
    pub tick_match: u64,
    pub tick_round: u64,
    pub blue_team: Option<String>,
    pub yellow_team: Option<String>,
}

fn status_name(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::NotStarted => "not_started",
        MatchStatus::Running => "running",
        MatchStatus::Paused => "paused",
        MatchStatus::Stopped => "stopped",
    }
}

impl From<MatchSnapshot> for MatchViewDto {
    fn from(snapshot: MatchSnapshot) -> Self {
        Self {
            status: status_name(snapshot.status).to_string(),
            phase: snapshot.info.phase.to_string(),
            score: ScoreDto {
                blue: snapshot.info.score.blue,
                yellow: snapshot.info.score.yellow,
            },
            tick_match: snapshot.info.tick_match,
            tick_round: snapshot.info.tick_round,
            blue_team: snapshot.blue_team,
            yellow_team: snapshot.yellow_team,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn when_frame_has_wrong_team_size_then_conversion_fails() {
        let frame = FieldFrameDto {
            ball: BallDto::default(),
            blue: vec![RobotDto::default(); 5],
            yellow: vec![RobotDto::default(); 4],
        };

        assert_eq!(FieldFrame::try_from(frame).unwrap_err(), WireCountError { found: 4 });
    }

    #[test]
    fn when_field_host_sends_frame_without_wheels_then_it_parses() {
        let robot = json!({"x": 1.0, "y": 2.0, "rotation": 90.0});
        let text = json!({
            "type": "Frame",
            "data": {
                "ball": {"x": 0.5, "y": -0.5},
                "blue": [robot, robot, robot, robot, robot],
                "yellow": [robot, robot, robot, robot, robot],
            }
        })
        .to_string();

        let FieldHostMessage::Frame(frame) = serde_json::from_str::<FieldHostMessage>(&text).unwrap();
        let frame = FieldFrame::try_from(frame).unwrap();

        assert_eq!(frame.ball.pos, Vector2::new(0.5, -0.5));
        assert_eq!(frame.yellow[4].rotation, 90.0);
        assert_eq!(frame.blue[0].wheel, Wheel::default());
    }

    #[test]
    fn when_field_command_is_serialized_then_it_uses_type_and_data() {
        let unit = serde_json::to_value(FieldCommandDto::Pause).unwrap();
        assert_eq!(unit, json!({"type": "Pause"}));

        let ball = serde_json::to_value(FieldCommandDto::SetBallPlacement(BallDto {
            x: 1.0,
            y: 2.0,
        }))
        .unwrap();
        assert_eq!(ball, json!({"type": "SetBallPlacement", "data": {"x": 1.0, "y": 2.0}}));
    }

    #[test]
    fn when_fault_event_is_serialized_then_side_and_call_are_named() {
        let event = MatchEvent::StrategyFault {
            side: Side::Blue,
            call: crate::domain::StrategyCall::Instruction,
            message: "strategy call timed out".to_string(),
        };

        let value = serde_json::to_value(MatchEventDto::from(&event)).unwrap();

        assert_eq!(value["type"], "StrategyFault");
        assert_eq!(value["data"]["side"], "blue");
        assert_eq!(value["data"]["call"], "instruction");
    }

    #[test]
    fn when_match_info_is_serialized_then_phase_and_score_are_included() {
        let mut info = MatchInfo::new_default_preset();
        info.score.yellow = 2;

        let value = serde_json::to_value(MatchEventDto::MatchInfoUpdate((&info).into())).unwrap();

        assert_eq!(value["data"]["phase"], "first_half");
        assert_eq!(value["data"]["score"]["yellow"], 2);
        assert_eq!(value["data"]["blue_robots"].as_array().unwrap().len(), 5);
    }
}
