// Match orchestration: the tick driver around the referee, strategies and field host.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::strategy_manager::StrategyManager;
use super::timed_pause::{DeferredAction, TimedPauseQueue};
use super::types::{MatchEvent, MatchSnapshot, MatchStatus};
use crate::domain::{
    FieldFrame, FieldHost, JudgeResult, MatchError, MatchInfo, PlacementInfo, Referee, ResultType,
    Side, StrategyEvent, StrategyFault, TeamInfo,
};

#[derive(Debug, Clone, Copy)]
pub struct MatchSettings {
    /// Mirror yellow's view so both strategies see themselves attacking +x.
    pub convert_yellow: bool,
    pub placement_pause: Duration,
}

pub struct MatchController<F> {
    field: F,
    strategies: StrategyManager,
    info: MatchInfo,
    referee: Referee,
    status: MatchStatus,
    pauses: TimedPauseQueue,
    events: broadcast::Sender<MatchEvent>,
    settings: MatchSettings,
}

impl<F> MatchController<F>
where
    F: FieldHost,
{
    pub fn new(
        field: F,
        strategies: StrategyManager,
        events: broadcast::Sender<MatchEvent>,
        settings: MatchSettings,
    ) -> Self {
        Self {
            field,
            strategies,
            info: MatchInfo::new_default_preset(),
            referee: Referee::new(),
            status: MatchStatus::NotStarted,
            pauses: TimedPauseQueue::new(),
            events,
            settings,
        }
    }

    pub fn info(&self) -> &MatchInfo {
        &self.info
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            status: self.status,
            info: self.info.clone(),
            blue_team: self.strategies.team_name(Side::Blue).map(str::to_string),
            yellow_team: self.strategies.team_name(Side::Yellow).map(str::to_string),
        }
    }

    /// Deadline of the running timed pause, for the task loop to sleep on.
    pub fn pause_deadline(&self) -> Option<Instant> {
        self.pauses.deadline()
    }

    pub async fn connect_strategy(&mut self, side: Side, endpoint: &str) -> Result<TeamInfo, MatchError> {
        self.strategies.connect(side, endpoint).await.map_err(|fault| {
            warn!(%side, endpoint, error = %fault, "strategy connect failed");
            MatchError::Strategy(fault)
        })
    }

    pub async fn close_strategy(&mut self, side: Side) {
        self.strategies.close(side).await;
    }

    /// Resets the match and leaves it started but paused.
    pub async fn start_match(&mut self) -> Result<(), MatchError> {
        if !self.strategies.both_ready() {
            return Err(MatchError::NotReady);
        }

        self.pauses.clear();
        self.info = MatchInfo::new_default_preset();
        self.referee = Referee::new();

        self.field.set_to_default();
        self.field.set_still();
        self.field.pause();

        self.strategies.notify_all(StrategyEvent::MatchStart).await;
        self.status = MatchStatus::Paused;
        info!("match started");
        self.emit(MatchEvent::MatchStart(self.info.clone()));
        Ok(())
    }

    /// Halts the match; state is kept for inspection until the next start.
    pub async fn stop_match(&mut self, notify_strategies: bool) {
        if !self.status.is_started() {
            return;
        }
        self.halt();
        if notify_strategies {
            self.strategies.notify_all(StrategyEvent::MatchStop).await;
        }
        info!(
            phase = %self.info.phase,
            blue = self.info.score.blue,
            yellow = self.info.score.yellow,
            "match stopped"
        );
        self.emit(MatchEvent::MatchStop(self.info.clone()));
    }

    pub fn pause_match(&mut self) {
        if self.status != MatchStatus::Running {
            return;
        }
        self.status = MatchStatus::Paused;
        self.field.pause();
        info!("match paused");
    }

    pub fn resume_match(&mut self) {
        if self.status != MatchStatus::Paused {
            return;
        }
        self.status = MatchStatus::Running;
        // A timed pause keeps the field frozen until it elapses.
        if !self.pauses.is_active() {
            self.field.resume();
        }
        info!("match resumed");
    }

    /// Copies the physics host's state in. Frames are ignored while a timed
    /// pause holds the field, so stale positions cannot overwrite a placement.
    pub fn sync_field(&mut self, frame: &FieldFrame) {
        if self.status.is_started() && !self.pauses.is_active() {
            self.info.sync_field(frame);
        }
    }

    /// Runs one referee step. A no-op unless both strategies are ready and the
    /// match is running outside a timed pause.
    pub async fn tick(&mut self) -> Result<(), MatchError> {
        if !self.strategies.both_ready()
            || self.status != MatchStatus::Running
            || self.pauses.is_active()
        {
            return Ok(());
        }

        let result = self.referee.judge(&self.info);
        match result.result_type {
            ResultType::NormalMatch => self.play().await,
            ResultType::GameOver => {
                self.record_goal(&result);
                self.stop_match(true).await;
                Ok(())
            }
            ResultType::NextPhase => {
                match self.info.phase.next_phase() {
                    Some(next) => {
                        info!(from = %self.info.phase, to = %next, "phase over");
                        self.info.phase = next;
                        self.info.tick_match = 0;
                        self.info.tick_round = 0;
                    }
                    None => self.stop_match(true).await,
                }
                Ok(())
            }
            _ => self.reposition(result).await,
        }
    }

    /// Finishes an elapsed timed pause: resume, run its action, release the guard.
    pub async fn complete_timed_pause(&mut self, now: Instant) -> Result<(), MatchError> {
        let Some(action) = self.pauses.take_due(now) else {
            return Ok(());
        };

        if self.status == MatchStatus::Running {
            self.field.resume();
        }
        let outcome = match action {
            DeferredAction::Nothing => Ok(()),
            DeferredAction::ApplyPlacement(result) if self.status.is_started() => {
                self.apply_placement(result).await
            }
            DeferredAction::ApplyPlacement(_) => Ok(()),
        };
        self.pauses.release(Instant::now());
        outcome
    }

    /// Emits `PlatformExiting` and closes both strategy connections.
    pub async fn shutdown(&mut self) {
        self.stop_match(true).await;
        self.emit(MatchEvent::PlatformExiting);
        self.strategies.close_all().await;
        info!("match controller shut down");
    }

    async fn play(&mut self) -> Result<(), MatchError> {
        let blue_view = self.info.side_info(Side::Blue, false);
        let yellow_view = self.info.side_info(Side::Yellow, self.settings.convert_yellow);
        let (blue, yellow) = tokio::join!(
            self.strategies.instruction(Side::Blue, &blue_view),
            self.strategies.instruction(Side::Yellow, &yellow_view),
        );
        let (blue, yellow) = match (blue, yellow) {
            (Ok(blue), Ok(yellow)) => (blue.normalized(), yellow.normalized()),
            (Err(fault), _) | (_, Err(fault)) => return Err(self.halt_on_fault(fault).await),
        };

        self.field.set_blue_wheels(&blue);
        self.field.set_yellow_wheels(&yellow);
        for (robot, wheel) in self.info.blue_robots.iter_mut().zip(blue.wheels) {
            robot.wheel = wheel;
        }
        for (robot, wheel) in self.info.yellow_robots.iter_mut().zip(yellow.wheels) {
            robot.wheel = wheel;
        }

        self.info.tick_match += 1;
        self.info.tick_round += 1;
        self.emit(MatchEvent::MatchInfoUpdate(self.info.clone()));
        Ok(())
    }

    async fn reposition(&mut self, result: JudgeResult) -> Result<(), MatchError> {
        if result.who_is_first.is_none() {
            error!(?result, "repositioning judgment without a first mover");
            return Err(MatchError::IllegalState(format!(
                "{:?} without a first mover",
                result.result_type
            )));
        }

        self.record_goal(&result);
        if self.info.tick_match == 0 {
            return self.apply_placement(result).await;
        }

        // Live play was interrupted: hold the field before asking for placements.
        self.strategies.notify_all(StrategyEvent::RoundStop).await;
        self.field.set_still();
        self.field.pause();
        self.pauses.request(
            Instant::now(),
            self.settings.placement_pause,
            DeferredAction::ApplyPlacement(result),
        );
        Ok(())
    }

    async fn apply_placement(&mut self, result: JudgeResult) -> Result<(), MatchError> {
        let (Some(first), Some(actor)) = (result.who_is_first, result.actor) else {
            error!(?result, "placement requested without a first mover");
            return Err(MatchError::IllegalState(format!(
                "{:?} placement without a first mover",
                result.result_type
            )));
        };
        let second = first.other();

        // The second side places against the first side's proposal.
        let mut working = self.info.clone();
        let first_placement = self.query_placement(first, &working).await?;
        working.update_from(first, &first_placement.robots);
        let second_placement = self.query_placement(second, &working).await?;

        let (blue, yellow) = match first {
            Side::Blue => (first_placement, second_placement),
            Side::Yellow => (second_placement, first_placement),
        };
        let mut candidate = self.info.merged_with(&blue, &yellow, actor);
        self.referee.judge_auto_placement(&mut candidate, &result);

        self.field.set_blue_placement(&candidate.blue_robots);
        self.field.set_yellow_placement(&candidate.yellow_robots);
        self.field.set_ball_placement(&candidate.ball);
        self.field.set_still();
        self.field.pause();

        candidate.tick_match += 1;
        candidate.tick_round = 0;
        self.info = candidate;
        info!(
            result = ?result.result_type,
            %actor,
            tick = self.info.tick_match,
            "placement applied"
        );
        self.emit(MatchEvent::MatchInfoUpdate(self.info.clone()));
        self.emit(MatchEvent::AutoPlacement(self.info.clone()));

        self.strategies.notify_all(StrategyEvent::RoundStart).await;
        self.pauses.request(
            Instant::now(),
            self.settings.placement_pause,
            DeferredAction::Nothing,
        );
        Ok(())
    }

    async fn query_placement(
        &mut self,
        side: Side,
        working: &MatchInfo,
    ) -> Result<PlacementInfo, MatchError> {
        let convert = self.settings.convert_yellow && side == Side::Yellow;
        let view = working.side_info(side, convert);
        let placement = self.strategies.placement(side, &view).await;
        match placement {
            Ok(placement) => Ok(placement.into_field_frame()),
            Err(fault) => Err(self.halt_on_fault(fault).await),
        }
    }

    /// Stops on a strategy fault. Only the healthy side is told the match stopped.
    async fn halt_on_fault(&mut self, fault: StrategyFault) -> MatchError {
        error!(
            side = %fault.side,
            call = %fault.call,
            timeout = fault.source.is_timeout(),
            error = %fault.source,
            "strategy fault; stopping match"
        );
        self.halt();
        self.strategies
            .notify(fault.side.other(), StrategyEvent::MatchStop)
            .await;
        self.emit(MatchEvent::MatchStop(self.info.clone()));
        self.emit(MatchEvent::StrategyFault {
            side: fault.side,
            call: fault.call,
            message: fault.source.to_string(),
        });
        MatchError::Strategy(fault)
    }

    fn halt(&mut self) {
        self.pauses.clear();
        self.status = MatchStatus::Stopped;
        self.field.set_still();
        self.field.pause();
    }

    fn record_goal(&mut self, result: &JudgeResult) {
        if let Some(scorer) = result.who_goal {
            self.info.score.record_goal(scorer);
            info!(
                %scorer,
                blue = self.info.score.blue,
                yellow = self.info.score.yellow,
                "goal"
            );
        }
    }

    fn emit(&self, event: MatchEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
