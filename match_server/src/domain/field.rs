// Field geometry, robot/ball poses and the per-team views handed to strategies.

use std::fmt;

pub const ROBOTS_PER_TEAM: usize = 5;

// Field dimensions in centimetres, origin at the centre spot.
pub const FIELD_HALF_LENGTH: f32 = 110.0;
pub const FIELD_HALF_WIDTH: f32 = 90.0;
pub const GOAL_HALF_WIDTH: f32 = 20.0;
pub const GOAL_AREA_DEPTH: f32 = 15.0;
pub const GOAL_AREA_HALF_WIDTH: f32 = 25.0;
pub const PENALTY_AREA_DEPTH: f32 = 35.0;
pub const PENALTY_AREA_HALF_WIDTH: f32 = 40.0;
pub const CENTER_CIRCLE_RADIUS: f32 = 25.0;
pub const ROBOT_SIZE: f32 = 7.8;

pub const MAX_WHEEL_SPEED: f32 = 125.0;

/// Team colour. Blue attacks towards +x, yellow towards -x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Blue,
    Yellow,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Blue => Side::Yellow,
            Side::Yellow => Side::Blue,
        }
    }

    /// Sign of the x axis this side attacks towards.
    pub fn attack_sign(self) -> f32 {
        match self {
            Side::Blue => 1.0,
            Side::Yellow => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Blue => f.write_str("blue"),
            Side::Yellow => f.write_str("yellow"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vector2) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    fn mirrored(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Wheel {
    pub left: f32,
    pub right: f32,
}

impl Wheel {
    pub fn normalized(self) -> Self {
        Self {
            left: clamp_speed(self.left),
            right: clamp_speed(self.right),
        }
    }
}

fn clamp_speed(speed: f32) -> f32 {
    if speed.is_finite() {
        speed.clamp(-MAX_WHEEL_SPEED, MAX_WHEEL_SPEED)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Robot {
    pub pos: Vector2,
    /// Heading in degrees, kept in (-180, 180].
    pub rotation: f32,
    pub wheel: Wheel,
}

impl Robot {
    pub const fn at(x: f32, y: f32, rotation: f32) -> Self {
        Self {
            pos: Vector2::new(x, y),
            rotation,
            wheel: Wheel {
                left: 0.0,
                right: 0.0,
            },
        }
    }

    fn mirrored(self) -> Self {
        Self {
            pos: self.pos.mirrored(),
            rotation: mirror_rotation(self.rotation),
            wheel: self.wheel,
        }
    }
}

/// Opponent robot as seen by a strategy: pose only, no wheel state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OpponentRobot {
    pub pos: Vector2,
    pub rotation: f32,
}

impl From<&Robot> for OpponentRobot {
    fn from(robot: &Robot) -> Self {
        Self {
            pos: robot.pos,
            rotation: robot.rotation,
        }
    }
}

impl OpponentRobot {
    fn mirrored(self) -> Self {
        Self {
            pos: self.pos.mirrored(),
            rotation: mirror_rotation(self.rotation),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ball {
    pub pos: Vector2,
}

impl Ball {
    fn mirrored(self) -> Self {
        Self {
            pos: self.pos.mirrored(),
        }
    }
}

/// Wraps a heading in degrees into (-180, 180].
pub fn normalize_rotation(rotation: f32) -> f32 {
    let r = rotation.rem_euclid(360.0);
    if r > 180.0 { r - 360.0 } else { r }
}

fn mirror_rotation(rotation: f32) -> f32 {
    let rotation = normalize_rotation(rotation);
    if rotation > 0.0 {
        rotation - 180.0
    } else {
        rotation + 180.0
    }
}

/// Coordinate frame a view or placement is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frame {
    #[default]
    Field,
    Mirrored,
}

impl Frame {
    fn flipped(self) -> Self {
        match self {
            Frame::Field => Frame::Mirrored,
            Frame::Mirrored => Frame::Field,
        }
    }
}

/// One team's view of the field.
#[derive(Debug, Clone, PartialEq)]
pub struct SideInfo {
    pub home: [Robot; ROBOTS_PER_TEAM],
    pub opp: [OpponentRobot; ROBOTS_PER_TEAM],
    pub ball: Ball,
    pub tick_match: u64,
    pub tick_round: u64,
    pub frame: Frame,
}

impl SideInfo {
    /// Mirrors every pose so the team perceives itself attacking the other way.
    /// Applying it twice restores the original view.
    pub fn convert_to_other_side(&mut self) {
        for robot in &mut self.home {
            *robot = robot.mirrored();
        }
        for robot in &mut self.opp {
            *robot = robot.mirrored();
        }
        self.ball = self.ball.mirrored();
        self.frame = self.frame.flipped();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelInfo {
    pub wheels: [Wheel; ROBOTS_PER_TEAM],
}

impl WheelInfo {
    pub fn normalized(self) -> Self {
        Self {
            wheels: self.wheels.map(Wheel::normalized),
        }
    }
}

/// Placement proposed by a strategy during a repositioning.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlacementInfo {
    pub robots: [Robot; ROBOTS_PER_TEAM],
    pub ball: Ball,
    pub frame: Frame,
}

impl PlacementInfo {
    /// Brings the placement back into field coordinates; a no-op when it already is.
    pub fn into_field_frame(mut self) -> Self {
        if self.frame == Frame::Mirrored {
            self.robots = self.robots.map(Robot::mirrored);
            self.ball = self.ball.mirrored();
            self.frame = Frame::Field;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TeamInfo {
    pub name: String,
}

/// Physics snapshot pushed by the field host every physics step.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFrame {
    pub ball: Ball,
    pub blue: [Robot; ROBOTS_PER_TEAM],
    pub yellow: [Robot; ROBOTS_PER_TEAM],
}

/// Kick-off formation for a side, expressed in field coordinates.
pub fn default_layout(side: Side) -> [Robot; ROBOTS_PER_TEAM] {
    // Blue formation; yellow is the point mirror of it.
    let blue = [
        Robot::at(-102.5, 0.0, 90.0),
        Robot::at(-81.2, 48.0, 0.0),
        Robot::at(-81.2, -48.0, 0.0),
        Robot::at(-30.0, 40.0, 0.0),
        Robot::at(-30.0, -40.0, 0.0),
    ];
    match side {
        Side::Blue => blue,
        Side::Yellow => blue.map(Robot::mirrored),
    }
}
