// Referee: turns the current match state into a judgment and legalizes placements.
//
// The referee never writes into `MatchInfo` while judging. It only keeps its own
// bookkeeping (stalled-ball anchor, penalty shootout tally) and reports facts back.

use super::field::{
    CENTER_CIRCLE_RADIUS, FIELD_HALF_LENGTH, FIELD_HALF_WIDTH, GOAL_AREA_DEPTH,
    GOAL_AREA_HALF_WIDTH, GOAL_HALF_WIDTH, PENALTY_AREA_DEPTH, PENALTY_AREA_HALF_WIDTH,
    ROBOT_SIZE, ROBOTS_PER_TEAM, Robot, Side, Vector2, Wheel, default_layout, normalize_rotation,
};
use super::match_info::{MatchInfo, MatchPhase};
use tracing::warn;

pub const TICKS_PER_SECOND: u64 = 66;
pub const HALF_TICKS: u64 = 5 * 60 * TICKS_PER_SECOND;
pub const OVERTIME_HALF_TICKS: u64 = 3 * 60 * TICKS_PER_SECOND;
pub const PENALTY_ATTEMPT_TICKS: u64 = 5 * TICKS_PER_SECOND;
pub const STALL_TICKS: u64 = 10 * TICKS_PER_SECOND;
pub const SHOOTOUT_ROUNDS: u32 = 5;

const STALL_RADIUS: f32 = 5.0;
const PENALTY_SPOT_X: f32 = 72.5;
const GOAL_KICK_X: f32 = 95.0;
const FREE_KICK_X: f32 = 55.0;
const FREE_KICK_Y: f32 = 60.0;
const FREE_KICK_CLEARANCE: f32 = 15.0;
const MAX_ROBOTS_IN_GOAL_AREA: usize = 1;
const GOALKEEPER: usize = 0;
const SEPARATION_PASSES: usize = 8;
const PLACEMENT_SLACK: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    NormalMatch,
    NextPhase,
    GameOver,
    PlaceKick,
    PenaltyKick,
    GoalKick,
    FreeKickLeftTop,
    FreeKickLeftBot,
    FreeKickRightTop,
    FreeKickRightBot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JudgeResult {
    pub result_type: ResultType,
    pub who_goal: Option<Side>,
    /// Side that places first; always set for repositioning results.
    pub who_is_first: Option<Side>,
    /// Side taking the restart; its proposed ball position is used.
    pub actor: Option<Side>,
}

impl JudgeResult {
    pub fn normal_match() -> Self {
        Self {
            result_type: ResultType::NormalMatch,
            who_goal: None,
            who_is_first: None,
            actor: None,
        }
    }

    pub fn next_phase() -> Self {
        Self {
            result_type: ResultType::NextPhase,
            ..Self::normal_match()
        }
    }

    pub fn game_over(who_goal: Option<Side>) -> Self {
        Self {
            result_type: ResultType::GameOver,
            who_goal,
            ..Self::normal_match()
        }
    }

    /// Restart taken by `actor`; the defending side places first.
    pub fn reposition(result_type: ResultType, actor: Side, who_goal: Option<Side>) -> Self {
        Self {
            result_type,
            who_goal,
            who_is_first: Some(actor.other()),
            actor: Some(actor),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct StallAnchor {
    pos: Vector2,
    since_tick: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ShootoutTally {
    kicker: Option<Side>,
    kicks: [u32; 2],
    goals: [u32; 2],
}

impl ShootoutTally {
    fn starting_with(kicker: Side) -> Self {
        Self {
            kicker: Some(kicker),
            ..Self::default()
        }
    }

    fn record(&mut self, kicker: Side, scored: bool) {
        let i = side_index(kicker);
        self.kicks[i] += 1;
        if scored {
            self.goals[i] += 1;
        }
    }

    fn is_decided(&self) -> bool {
        let [blue_kicks, yellow_kicks] = self.kicks;
        let [blue_goals, yellow_goals] = self.goals;
        if blue_kicks < SHOOTOUT_ROUNDS || yellow_kicks < SHOOTOUT_ROUNDS {
            let blue_left = SHOOTOUT_ROUNDS.saturating_sub(blue_kicks);
            let yellow_left = SHOOTOUT_ROUNDS.saturating_sub(yellow_kicks);
            blue_goals > yellow_goals + yellow_left || yellow_goals > blue_goals + blue_left
        } else {
            // Sudden death: decided only after both sides kicked the same number of times.
            blue_kicks == yellow_kicks && blue_goals != yellow_goals
        }
    }
}

fn side_index(side: Side) -> usize {
    match side {
        Side::Blue => 0,
        Side::Yellow => 1,
    }
}

/// Referee for one match. Replace it with a fresh instance when a match (re)starts.
#[derive(Debug, Clone, Default)]
pub struct Referee {
    stall: Option<StallAnchor>,
    shootout: ShootoutTally,
}

impl Referee {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn judge(&mut self, info: &MatchInfo) -> JudgeResult {
        if info.phase == MatchPhase::Finished {
            return JudgeResult::game_over(None);
        }

        if info.tick_round > info.tick_match || !info.ball.pos.is_finite() {
            warn!(
                tick_match = info.tick_match,
                tick_round = info.tick_round,
                ball_x = info.ball.pos.x,
                ball_y = info.ball.pos.y,
                "malformed match state; continuing play"
            );
            return JudgeResult::normal_match();
        }

        if info.tick_match == 0 {
            self.stall = None;
            return self.phase_start(info.phase);
        }

        if info.phase == MatchPhase::PenaltyShootout {
            return self.judge_shootout(info);
        }

        let result = goal_scored(info.ball.pos)
            .map(|scorer| {
                JudgeResult::reposition(ResultType::PlaceKick, scorer.other(), Some(scorer))
            })
            .or_else(|| time_expired(info))
            .or_else(|| goal_area_foul(info))
            .or_else(|| self.stalled_ball(info));

        match result {
            Some(result) => {
                self.stall = None;
                result
            }
            None => JudgeResult::normal_match(),
        }
    }

    fn phase_start(&mut self, phase: MatchPhase) -> JudgeResult {
        match phase {
            MatchPhase::FirstHalf | MatchPhase::OvertimeFirst => {
                JudgeResult::reposition(ResultType::PlaceKick, Side::Blue, None)
            }
            MatchPhase::SecondHalf | MatchPhase::OvertimeSecond => {
                JudgeResult::reposition(ResultType::PlaceKick, Side::Yellow, None)
            }
            MatchPhase::PenaltyShootout => {
                self.shootout = ShootoutTally::starting_with(Side::Blue);
                JudgeResult::reposition(ResultType::PenaltyKick, Side::Blue, None)
            }
            MatchPhase::Finished => JudgeResult::game_over(None),
        }
    }

    fn judge_shootout(&mut self, info: &MatchInfo) -> JudgeResult {
        let Some(kicker) = self.shootout.kicker else {
            warn!("penalty shootout without a kicker; restarting the shootout");
            return self.phase_start(MatchPhase::PenaltyShootout);
        };

        let goal = goal_scored(info.ball.pos);
        let scored = goal == Some(kicker);
        if goal.is_none() && info.tick_round < PENALTY_ATTEMPT_TICKS {
            return JudgeResult::normal_match();
        }

        self.shootout.record(kicker, scored);
        let who_goal = scored.then_some(kicker);
        if self.shootout.is_decided() {
            return JudgeResult::game_over(who_goal);
        }

        let next = kicker.other();
        self.shootout.kicker = Some(next);
        JudgeResult::reposition(ResultType::PenaltyKick, next, who_goal)
    }

    fn stalled_ball(&mut self, info: &MatchInfo) -> Option<JudgeResult> {
        let ball = info.ball.pos;
        match self.stall {
            Some(anchor) if anchor.pos.distance(ball) <= STALL_RADIUS => {
                if info.tick_match.saturating_sub(anchor.since_tick) < STALL_TICKS {
                    return None;
                }
                let (result_type, actor) = free_kick_for(ball);
                Some(JudgeResult::reposition(result_type, actor, None))
            }
            _ => {
                self.stall = Some(StallAnchor {
                    pos: ball,
                    since_tick: info.tick_match,
                });
                None
            }
        }
    }

    /// Legalizes a merged placement in place. Strategy proposals are overridden
    /// wherever they break the restart rules; every robot ends inside its
    /// restart region and clear of the others.
    pub fn judge_auto_placement(&self, candidate: &mut MatchInfo, result: &JudgeResult) {
        let Some(actor) = result.actor else {
            return;
        };

        replace_invalid_poses(candidate);
        candidate.ball.pos = ball_spot(result.result_type, actor, candidate.ball.pos);
        let rules = PlacementRules::new(result.result_type, actor, candidate);

        for side in [Side::Blue, Side::Yellow] {
            for (index, robot) in candidate.robots_mut(side).iter_mut().enumerate() {
                robot.pos = rules.constrain(side, index, robot.pos);
                robot.rotation = normalize_rotation(robot.rotation);
                robot.wheel = Wheel::default();
            }
        }
        separate_overlaps(candidate, &rules);
    }
}

/// Region rules for one restart. `constrain` leaves a legal position untouched.
struct PlacementRules {
    result_type: ResultType,
    actor: Side,
    ball: Vector2,
    // Actor robot taking a penalty; it may stand inside the area.
    kicker: Option<usize>,
}

impl PlacementRules {
    fn new(result_type: ResultType, actor: Side, candidate: &MatchInfo) -> Self {
        let ball = candidate.ball.pos;
        let kicker = if result_type == ResultType::PenaltyKick {
            nearest_to(candidate.robots(actor), ball)
        } else {
            None
        };
        Self {
            result_type,
            actor,
            ball,
            kicker,
        }
    }

    fn constrain(&self, side: Side, index: usize, pos: Vector2) -> Vector2 {
        let defender = self.actor.other();
        let mut pos = clamp_to_field(pos);
        match self.result_type {
            ResultType::PlaceKick => {
                pos = into_own_half(pos, side);
                if side == defender {
                    pos = outside_circle(pos, Vector2::default(), CENTER_CIRCLE_RADIUS);
                }
            }
            ResultType::PenaltyKick => {
                let exempt = if side == defender {
                    index == GOALKEEPER
                } else {
                    Some(index) == self.kicker
                };
                if !exempt && in_penalty_area(pos, defender) {
                    pos.x = self.actor.attack_sign()
                        * (FIELD_HALF_LENGTH - PENALTY_AREA_DEPTH - ROBOT_SIZE / 2.0);
                }
            }
            ResultType::GoalKick
            | ResultType::FreeKickLeftTop
            | ResultType::FreeKickLeftBot
            | ResultType::FreeKickRightTop
            | ResultType::FreeKickRightBot => {
                if side == defender {
                    pos = outside_circle(pos, self.ball, FREE_KICK_CLEARANCE);
                }
            }
            ResultType::NormalMatch | ResultType::NextPhase | ResultType::GameOver => {}
        }
        pos
    }
}

fn nearest_to(robots: &[Robot; ROBOTS_PER_TEAM], target: Vector2) -> Option<usize> {
    robots
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.pos.distance(target).total_cmp(&b.pos.distance(target)))
        .map(|(i, _)| i)
}

/// Side credited with a goal if the ball is past a goal line inside the mouth.
fn goal_scored(ball: Vector2) -> Option<Side> {
    if ball.y.abs() > GOAL_HALF_WIDTH {
        return None;
    }
    if ball.x > FIELD_HALF_LENGTH {
        Some(Side::Blue)
    } else if ball.x < -FIELD_HALF_LENGTH {
        Some(Side::Yellow)
    } else {
        None
    }
}

fn time_expired(info: &MatchInfo) -> Option<JudgeResult> {
    let limit = match info.phase {
        MatchPhase::FirstHalf | MatchPhase::SecondHalf => HALF_TICKS,
        MatchPhase::OvertimeFirst | MatchPhase::OvertimeSecond => OVERTIME_HALF_TICKS,
        MatchPhase::PenaltyShootout | MatchPhase::Finished => return None,
    };
    if info.tick_match < limit {
        return None;
    }
    match info.phase {
        MatchPhase::SecondHalf | MatchPhase::OvertimeSecond if !info.score.is_level() => {
            Some(JudgeResult::game_over(None))
        }
        _ => Some(JudgeResult::next_phase()),
    }
}

/// Depth of a point measured from the centre line towards `defender`'s goal.
fn depth_towards_goal(pos: Vector2, defender: Side) -> f32 {
    -pos.x * defender.attack_sign()
}

fn in_goal_area(pos: Vector2, defender: Side) -> bool {
    let depth = depth_towards_goal(pos, defender);
    depth >= FIELD_HALF_LENGTH - GOAL_AREA_DEPTH
        && depth <= FIELD_HALF_LENGTH
        && pos.y.abs() <= GOAL_AREA_HALF_WIDTH
}

fn in_penalty_area(pos: Vector2, defender: Side) -> bool {
    depth_towards_goal(pos, defender) >= FIELD_HALF_LENGTH - PENALTY_AREA_DEPTH
        && pos.y.abs() <= PENALTY_AREA_HALF_WIDTH
}

fn goal_area_foul(info: &MatchInfo) -> Option<JudgeResult> {
    for defender in [Side::Blue, Side::Yellow] {
        if !in_goal_area(info.ball.pos, defender) {
            continue;
        }
        let count = |side: Side| {
            info.robots(side)
                .iter()
                .filter(|robot| in_goal_area(robot.pos, defender))
                .count()
        };
        if count(defender) > MAX_ROBOTS_IN_GOAL_AREA {
            return Some(JudgeResult::reposition(
                ResultType::PenaltyKick,
                defender.other(),
                None,
            ));
        }
        if count(defender.other()) > MAX_ROBOTS_IN_GOAL_AREA {
            return Some(JudgeResult::reposition(ResultType::GoalKick, defender, None));
        }
    }
    None
}

fn free_kick_for(ball: Vector2) -> (ResultType, Side) {
    // The free kick goes to the side attacking the half the ball stalled in.
    match (ball.x < 0.0, ball.y >= 0.0) {
        (true, true) => (ResultType::FreeKickLeftTop, Side::Yellow),
        (true, false) => (ResultType::FreeKickLeftBot, Side::Yellow),
        (false, true) => (ResultType::FreeKickRightTop, Side::Blue),
        (false, false) => (ResultType::FreeKickRightBot, Side::Blue),
    }
}

fn ball_spot(result_type: ResultType, actor: Side, proposed: Vector2) -> Vector2 {
    match result_type {
        ResultType::PenaltyKick => Vector2::new(actor.attack_sign() * PENALTY_SPOT_X, 0.0),
        ResultType::GoalKick if proposed.is_finite() && in_goal_area(proposed, actor) => proposed,
        ResultType::GoalKick => Vector2::new(-actor.attack_sign() * GOAL_KICK_X, 0.0),
        ResultType::FreeKickLeftTop => Vector2::new(-FREE_KICK_X, FREE_KICK_Y),
        ResultType::FreeKickLeftBot => Vector2::new(-FREE_KICK_X, -FREE_KICK_Y),
        ResultType::FreeKickRightTop => Vector2::new(FREE_KICK_X, FREE_KICK_Y),
        ResultType::FreeKickRightBot => Vector2::new(FREE_KICK_X, -FREE_KICK_Y),
        ResultType::PlaceKick
        | ResultType::NormalMatch
        | ResultType::NextPhase
        | ResultType::GameOver => Vector2::default(),
    }
}

fn replace_invalid_poses(candidate: &mut MatchInfo) {
    for side in [Side::Blue, Side::Yellow] {
        let fallback = default_layout(side);
        for (robot, default) in candidate.robots_mut(side).iter_mut().zip(fallback) {
            if !robot.pos.is_finite() {
                robot.pos = default.pos;
            }
            if !robot.rotation.is_finite() {
                robot.rotation = default.rotation;
            }
        }
    }
}

fn unit_towards(from: Vector2, to: Vector2) -> (f32, f32) {
    let d = from.distance(to);
    if d > f32::EPSILON {
        ((to.x - from.x) / d, (to.y - from.y) / d)
    } else {
        (0.0, 1.0)
    }
}

fn offset(center: Vector2, (dx, dy): (f32, f32), length: f32) -> Vector2 {
    Vector2::new(center.x + dx * length, center.y + dy * length)
}

/// Pushes `pos` onto the rim of the circle around `center` when it is inside,
/// preferring the radial direction and falling back to the axes near a touch line.
fn outside_circle(pos: Vector2, center: Vector2, radius: f32) -> Vector2 {
    if pos.distance(center) >= radius {
        return pos;
    }
    let (dx, dy) = unit_towards(center, pos);
    let (sx, sy) = (1.0f32.copysign(dx), 1.0f32.copysign(dy));
    let directions = [(dx, dy), (0.0, sy), (sx, 0.0), (0.0, -sy), (-sx, 0.0)];
    directions
        .into_iter()
        .map(|direction| offset(center, direction, radius))
        .find(|rim| clamp_to_field(*rim) == *rim)
        .unwrap_or_else(|| clamp_to_field(offset(center, (dx, dy), radius)))
}

/// Pushes overlapping robots apart. Every moved robot is re-constrained, so
/// separation never breaks a restart rule.
fn separate_overlaps(candidate: &mut MatchInfo, rules: &PlacementRules) {
    let mut robots: Vec<(Side, usize, Vector2)> = [Side::Blue, Side::Yellow]
        .into_iter()
        .flat_map(|side| {
            candidate
                .robots(side)
                .iter()
                .enumerate()
                .map(move |(index, robot)| (side, index, robot.pos))
        })
        .collect();

    for _ in 0..SEPARATION_PASSES {
        let mut moved = false;
        for i in 0..robots.len() {
            for j in (i + 1)..robots.len() {
                let anchor = robots[i].2;
                let (side, index, pos) = robots[j];
                if anchor.distance(pos) >= ROBOT_SIZE - PLACEMENT_SLACK {
                    continue;
                }
                robots[j].2 = push_clear(anchor, pos, |p| rules.constrain(side, index, p));
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }

    for (side, index, pos) in robots {
        candidate.robots_mut(side)[index].pos = pos;
    }
}

/// Moves `pos` one robot size away from `anchor`: straight away first, then
/// sideways, then back, taking the first legal spot that clears the anchor.
fn push_clear(anchor: Vector2, pos: Vector2, constrain: impl Fn(Vector2) -> Vector2) -> Vector2 {
    let (dx, dy) = unit_towards(anchor, pos);
    let spots = [(dx, dy), (-dy, dx), (dy, -dx), (-dx, -dy)]
        .map(|direction| constrain(offset(anchor, direction, ROBOT_SIZE)));
    spots
        .iter()
        .copied()
        .find(|spot| spot.distance(anchor) >= ROBOT_SIZE - PLACEMENT_SLACK)
        .unwrap_or(spots[0])
}

fn clamp_to_field(pos: Vector2) -> Vector2 {
    let max_x = FIELD_HALF_LENGTH - ROBOT_SIZE / 2.0;
    let max_y = FIELD_HALF_WIDTH - ROBOT_SIZE / 2.0;
    Vector2::new(pos.x.clamp(-max_x, max_x), pos.y.clamp(-max_y, max_y))
}

fn into_own_half(pos: Vector2, side: Side) -> Vector2 {
    let own = -side.attack_sign();
    let depth = (pos.x * own).max(ROBOT_SIZE / 2.0);
    Vector2::new(depth * own, pos.y)
}
