// Strategy RPC envelopes: one JSON text frame per request or response.

use serde::{Deserialize, Serialize};

use crate::domain::{SideInfo, StrategyEvent};
use crate::interface_adapters::protocol::{BallDto, RobotDto, WheelDto, robots_to_dto};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: u64,
    pub body: StrategyRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StrategyRequest {
    GetTeamInfo,
    OnEvent { event: EventTypeDto },
    GetInstruction(FieldDto),
    GetPlacement(FieldDto),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: u64,
    pub body: StrategyResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StrategyResponse {
    TeamInfo { team_name: String },
    EventAck,
    Instruction { wheels: Vec<WheelDto> },
    Placement { robots: Vec<RobotDto>, ball: BallDto },
    Error { message: String },
}

impl StrategyResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyResponse::TeamInfo { .. } => "TeamInfo",
            StrategyResponse::EventAck => "EventAck",
            StrategyResponse::Instruction { .. } => "Instruction",
            StrategyResponse::Placement { .. } => "Placement",
            StrategyResponse::Error { .. } => "Error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTypeDto {
    MatchStart,
    MatchStop,
    RoundStart,
    RoundStop,
}

impl From<StrategyEvent> for EventTypeDto {
    fn from(event: StrategyEvent) -> Self {
        match event {
            StrategyEvent::MatchStart => EventTypeDto::MatchStart,
            StrategyEvent::MatchStop => EventTypeDto::MatchStop,
            StrategyEvent::RoundStart => EventTypeDto::RoundStart,
            StrategyEvent::RoundStop => EventTypeDto::RoundStop,
        }
    }
}

/// One side's view of the field. Opponent wheels are always zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDto {
    pub our_robots: Vec<RobotDto>,
    pub opponent_robots: Vec<RobotDto>,
    pub ball: BallDto,
    pub tick_total: u64,
    pub tick_round: u64,
}

impl From<&SideInfo> for FieldDto {
    fn from(view: &SideInfo) -> Self {
        Self {
            our_robots: robots_to_dto(&view.home),
            opponent_robots: view
                .opp
                .iter()
                .map(|opp| RobotDto {
                    x: opp.pos.x,
                    y: opp.pos.y,
                    rotation: opp.rotation,
                    wheel: WheelDto::default(),
                })
                .collect(),
            ball: BallDto::from(&view.ball),
            tick_total: view.tick_match,
            tick_round: view.tick_round,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MatchInfo, Side, Wheel};
    use serde_json::json;

    #[test]
    fn when_event_request_is_serialized_then_event_is_named() {
        let request = RequestEnvelope {
            id: 7,
            body: StrategyRequest::OnEvent {
                event: StrategyEvent::RoundStop.into(),
            },
        };

        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({"id": 7, "body": {"type": "OnEvent", "data": {"event": "RoundStop"}}})
        );
    }

    #[test]
    fn when_view_is_converted_then_opponent_wheels_are_hidden() {
        let mut info = MatchInfo::new_default_preset();
        info.yellow_robots[0].wheel = Wheel {
            left: 40.0,
            right: 40.0,
        };
        info.tick_match = 12;
        info.tick_round = 3;

        let field = FieldDto::from(&info.side_info(Side::Blue, false));

        assert_eq!(field.our_robots.len(), 5);
        assert_eq!(field.opponent_robots[0].wheel, WheelDto::default());
        assert_eq!(field.opponent_robots[0].x, info.yellow_robots[0].pos.x);
        assert_eq!(field.tick_total, 12);
        assert_eq!(field.tick_round, 3);
    }

    #[test]
    fn when_team_info_response_arrives_then_it_parses() {
        let text = r#"{"id": 1, "body": {"type": "TeamInfo", "data": {"team_name": "Rustaceans"}}}"#;

        let envelope: ResponseEnvelope = serde_json::from_str(text).unwrap();

        assert_eq!(envelope.id, 1);
        assert!(matches!(
            envelope.body,
            StrategyResponse::TeamInfo { ref team_name } if team_name == "Rustaceans"
        ));
    }
}
