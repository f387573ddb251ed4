// Authoritative match state owned by the orchestrator.

use super::field::{
    Ball, FieldFrame, Frame, OpponentRobot, PlacementInfo, ROBOTS_PER_TEAM, Robot, Side, SideInfo,
    default_layout,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchPhase {
    FirstHalf,
    SecondHalf,
    OvertimeFirst,
    OvertimeSecond,
    PenaltyShootout,
    Finished,
}

impl MatchPhase {
    /// Next phase in match order; `None` past the last phase means the match is over.
    pub fn next_phase(self) -> Option<MatchPhase> {
        match self {
            MatchPhase::FirstHalf => Some(MatchPhase::SecondHalf),
            MatchPhase::SecondHalf => Some(MatchPhase::OvertimeFirst),
            MatchPhase::OvertimeFirst => Some(MatchPhase::OvertimeSecond),
            MatchPhase::OvertimeSecond => Some(MatchPhase::PenaltyShootout),
            MatchPhase::PenaltyShootout => Some(MatchPhase::Finished),
            MatchPhase::Finished => None,
        }
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchPhase::FirstHalf => "first_half",
            MatchPhase::SecondHalf => "second_half",
            MatchPhase::OvertimeFirst => "overtime_first",
            MatchPhase::OvertimeSecond => "overtime_second",
            MatchPhase::PenaltyShootout => "penalty_shootout",
            MatchPhase::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchScore {
    pub blue: u32,
    pub yellow: u32,
}

impl MatchScore {
    pub fn record_goal(&mut self, side: Side) {
        match side {
            Side::Blue => self.blue += 1,
            Side::Yellow => self.yellow += 1,
        }
    }

    pub fn is_level(&self) -> bool {
        self.blue == self.yellow
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchInfo {
    pub ball: Ball,
    pub blue_robots: [Robot; ROBOTS_PER_TEAM],
    pub yellow_robots: [Robot; ROBOTS_PER_TEAM],
    pub score: MatchScore,
    pub phase: MatchPhase,
    /// Ticks of real play in the current phase; 0 marks a phase that has not started.
    pub tick_match: u64,
    /// Ticks since the last repositioning.
    pub tick_round: u64,
}

impl Default for MatchInfo {
    fn default() -> Self {
        Self::new_default_preset()
    }
}

impl MatchInfo {
    pub fn new_default_preset() -> Self {
        Self {
            ball: Ball::default(),
            blue_robots: default_layout(Side::Blue),
            yellow_robots: default_layout(Side::Yellow),
            score: MatchScore::default(),
            phase: MatchPhase::FirstHalf,
            tick_match: 0,
            tick_round: 0,
        }
    }

    pub fn robots(&self, side: Side) -> &[Robot; ROBOTS_PER_TEAM] {
        match side {
            Side::Blue => &self.blue_robots,
            Side::Yellow => &self.yellow_robots,
        }
    }

    pub fn robots_mut(&mut self, side: Side) -> &mut [Robot; ROBOTS_PER_TEAM] {
        match side {
            Side::Blue => &mut self.blue_robots,
            Side::Yellow => &mut self.yellow_robots,
        }
    }

    /// Builds the view handed to one side's strategy, mirrored when `convert` is set.
    pub fn side_info(&self, side: Side, convert: bool) -> SideInfo {
        let mut info = SideInfo {
            home: *self.robots(side),
            opp: self.robots(side.other()).each_ref().map(OpponentRobot::from),
            ball: self.ball,
            tick_match: self.tick_match,
            tick_round: self.tick_round,
            frame: Frame::Field,
        };
        if convert {
            info.convert_to_other_side();
        }
        info
    }

    /// Overwrites one side's robots with a placement already in field coordinates.
    pub fn update_from(&mut self, side: Side, robots: &[Robot; ROBOTS_PER_TEAM]) {
        *self.robots_mut(side) = *robots;
    }

    /// Merges both placements into a candidate state; the ball comes from the actor.
    pub fn merged_with(&self, blue: &PlacementInfo, yellow: &PlacementInfo, actor: Side) -> Self {
        let ball = match actor {
            Side::Blue => blue.ball,
            Side::Yellow => yellow.ball,
        };
        Self {
            ball,
            blue_robots: blue.robots,
            yellow_robots: yellow.robots,
            ..self.clone()
        }
    }

    pub fn sync_field(&mut self, frame: &FieldFrame) {
        self.ball = frame.ball;
        self.blue_robots = frame.blue;
        self.yellow_robots = frame.yellow;
    }
}
