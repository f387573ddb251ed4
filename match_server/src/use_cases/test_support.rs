use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{
    Ball, Endpoint, FieldHost, PlacementInfo, ROBOTS_PER_TEAM, Robot, SideInfo, Strategy,
    StrategyConnector, StrategyError, StrategyEvent, TeamInfo, WheelInfo,
};

pub(crate) type StrategyLogHandle = Arc<Mutex<StrategyLog>>;

// Everything a scripted strategy was asked, in call order.
#[derive(Debug, Default)]
pub(crate) struct StrategyLog {
    pub events: Vec<StrategyEvent>,
    pub instruction_views: Vec<SideInfo>,
    pub placement_views: Vec<SideInfo>,
    pub closed: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StrategyScript {
    pub team_name: String,
    pub wheels: WheelInfo,
    /// Robots returned from placement, in the strategy's own frame. Defaults to the view.
    pub placement: Option<[Robot; ROBOTS_PER_TEAM]>,
    pub placement_ball: Option<Ball>,
    pub team_info_error: Option<StrategyError>,
    pub event_error: Option<StrategyError>,
    pub instruction_error: Option<StrategyError>,
    pub placement_error: Option<StrategyError>,
}

impl StrategyScript {
    pub(crate) fn named(name: &str) -> Self {
        Self {
            team_name: name.to_string(),
            ..Self::default()
        }
    }
}

pub(crate) struct ScriptedStrategy {
    script: StrategyScript,
    log: StrategyLogHandle,
}

impl ScriptedStrategy {
    fn log(&self) -> std::sync::MutexGuard<'_, StrategyLog> {
        self.log.lock().expect("strategy log mutex poisoned")
    }

    fn check_open(log: &StrategyLog) -> Result<(), StrategyError> {
        if log.closed {
            return Err(StrategyError::Closed);
        }
        Ok(())
    }

    // A scripted `Closed` behaves like a remote hang-up: the connection stays dead.
    fn fail_with(log: &mut StrategyLog, error: &Option<StrategyError>) -> Result<(), StrategyError> {
        match error {
            Some(e) => {
                if *e == StrategyError::Closed {
                    log.closed = true;
                }
                Err(e.clone())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Strategy for ScriptedStrategy {
    async fn team_info(&self) -> Result<TeamInfo, StrategyError> {
        let mut log = self.log();
        Self::check_open(&log)?;
        Self::fail_with(&mut log, &self.script.team_info_error)?;
        Ok(TeamInfo {
            name: self.script.team_name.clone(),
        })
    }

    async fn on_event(&self, event: StrategyEvent) -> Result<(), StrategyError> {
        let mut log = self.log();
        Self::check_open(&log)?;
        log.events.push(event);
        Self::fail_with(&mut log, &self.script.event_error)
    }

    async fn instruction(&self, view: &SideInfo) -> Result<WheelInfo, StrategyError> {
        let mut log = self.log();
        Self::check_open(&log)?;
        log.instruction_views.push(view.clone());
        Self::fail_with(&mut log, &self.script.instruction_error)?;
        Ok(self.script.wheels)
    }

    async fn placement(&self, view: &SideInfo) -> Result<PlacementInfo, StrategyError> {
        let mut log = self.log();
        Self::check_open(&log)?;
        log.placement_views.push(view.clone());
        Self::fail_with(&mut log, &self.script.placement_error)?;
        Ok(PlacementInfo {
            robots: self.script.placement.unwrap_or(view.home),
            ball: self.script.placement_ball.unwrap_or(view.ball),
            frame: view.frame,
        })
    }

    async fn close(&self) -> Result<(), StrategyError> {
        self.log().closed = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.log().closed
    }
}

// Hands out scripted strategies in push order and records every endpoint dialled.
#[derive(Clone, Default)]
pub(crate) struct ScriptedConnector {
    scripts: Arc<Mutex<VecDeque<StrategyScript>>>,
    logs: Arc<Mutex<VecDeque<StrategyLogHandle>>>,
    endpoints: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, script: StrategyScript) -> StrategyLogHandle {
        let log = StrategyLogHandle::default();
        self.scripts
            .lock()
            .expect("scripts mutex poisoned")
            .push_back(script);
        self.logs
            .lock()
            .expect("logs mutex poisoned")
            .push_back(log.clone());
        log
    }

    pub(crate) fn endpoints(&self) -> Vec<String> {
        self.endpoints
            .lock()
            .expect("endpoints mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl StrategyConnector for ScriptedConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Strategy>, StrategyError> {
        self.endpoints
            .lock()
            .expect("endpoints mutex poisoned")
            .push(endpoint.to_string());

        let script = self.scripts.lock().expect("scripts mutex poisoned").pop_front();
        let log = self.logs.lock().expect("logs mutex poisoned").pop_front();
        match (script, log) {
            (Some(script), Some(log)) => Ok(Box::new(ScriptedStrategy { script, log })),
            _ => Err(StrategyError::Connect {
                endpoint: endpoint.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldCall {
    Pause,
    Resume,
    SetToDefault,
    SetStill,
    BlueWheels(WheelInfo),
    YellowWheels(WheelInfo),
    BluePlacement([Robot; ROBOTS_PER_TEAM]),
    YellowPlacement([Robot; ROBOTS_PER_TEAM]),
    BallPlacement(Ball),
}

#[derive(Clone, Default)]
pub(crate) struct RecordingFieldHost {
    calls: Arc<Mutex<Vec<FieldCall>>>,
}

impl RecordingFieldHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<FieldCall> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    /// Returns the recorded calls and starts a fresh log.
    pub(crate) fn drain(&self) -> Vec<FieldCall> {
        std::mem::take(&mut *self.calls.lock().expect("calls mutex poisoned"))
    }

    fn record(&self, call: FieldCall) {
        self.calls.lock().expect("calls mutex poisoned").push(call);
    }
}

impl FieldHost for RecordingFieldHost {
    fn pause(&self) {
        self.record(FieldCall::Pause);
    }

    fn resume(&self) {
        self.record(FieldCall::Resume);
    }

    fn set_to_default(&self) {
        self.record(FieldCall::SetToDefault);
    }

    fn set_still(&self) {
        self.record(FieldCall::SetStill);
    }

    fn set_blue_wheels(&self, wheels: &WheelInfo) {
        self.record(FieldCall::BlueWheels(*wheels));
    }

    fn set_yellow_wheels(&self, wheels: &WheelInfo) {
        self.record(FieldCall::YellowWheels(*wheels));
    }

    fn set_blue_placement(&self, robots: &[Robot; ROBOTS_PER_TEAM]) {
        self.record(FieldCall::BluePlacement(*robots));
    }

    fn set_yellow_placement(&self, robots: &[Robot; ROBOTS_PER_TEAM]) {
        self.record(FieldCall::YellowPlacement(*robots));
    }

    fn set_ball_placement(&self, ball: &Ball) {
        self.record(FieldCall::BallPlacement(*ball));
    }
}
