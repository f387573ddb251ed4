// Owns the two strategy connections and their readiness.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    Endpoint, PlacementInfo, Side, SideInfo, Strategy, StrategyCall, StrategyConnector,
    StrategyError, StrategyEvent, StrategyFault, TeamInfo, WheelInfo,
};

/// Port used when an endpoint omits one.
#[derive(Debug, Clone, Copy)]
pub struct DefaultPorts {
    pub blue: u16,
    pub yellow: u16,
}

impl DefaultPorts {
    fn for_side(self, side: Side) -> u16 {
        match side {
            Side::Blue => self.blue,
            Side::Yellow => self.yellow,
        }
    }
}

struct Connection {
    strategy: Box<dyn Strategy>,
    team: TeamInfo,
}

pub struct StrategyManager {
    connector: Arc<dyn StrategyConnector>,
    ports: DefaultPorts,
    blue: Option<Connection>,
    yellow: Option<Connection>,
}

impl StrategyManager {
    pub fn new(connector: Arc<dyn StrategyConnector>, ports: DefaultPorts) -> Self {
        Self {
            connector,
            ports,
            blue: None,
            yellow: None,
        }
    }

    pub fn is_blue_ready(&self) -> bool {
        self.blue.is_some()
    }

    pub fn is_yellow_ready(&self) -> bool {
        self.yellow.is_some()
    }

    pub fn both_ready(&self) -> bool {
        self.is_blue_ready() && self.is_yellow_ready()
    }

    pub fn team_name(&self, side: Side) -> Option<&str> {
        self.slot(side).map(|conn| conn.team.name.as_str())
    }

    /// Connects one side and fetches its team info. The side's previous
    /// connection is only replaced, and then closed, once the new one answered;
    /// a failed attempt leaves it untouched.
    pub async fn connect(&mut self, side: Side, raw: &str) -> Result<TeamInfo, StrategyFault> {
        let fault = |call, source| StrategyFault { side, call, source };

        let endpoint = Endpoint::parse(raw, self.ports.for_side(side))
            .map_err(|e| fault(StrategyCall::Connect, e))?;

        let strategy = self
            .connector
            .connect(&endpoint)
            .await
            .map_err(|e| fault(StrategyCall::Connect, e))?;

        let team = match strategy.team_info().await {
            Ok(team) => team,
            Err(e) => {
                if let Err(close_err) = strategy.close().await {
                    warn!(%side, error = %close_err, "failed to close strategy after team info error");
                }
                return Err(fault(StrategyCall::TeamInfo, e));
            }
        };

        info!(%side, %endpoint, team = %team.name, "strategy connected");
        let previous = self.slot_mut(side).replace(Connection {
            strategy,
            team: team.clone(),
        });
        if let Some(previous) = previous {
            Self::shut(side, previous).await;
        }
        Ok(team)
    }

    pub async fn close(&mut self, side: Side) {
        if let Some(conn) = self.slot_mut(side).take() {
            Self::shut(side, conn).await;
        }
    }

    async fn shut(side: Side, conn: Connection) {
        match conn.strategy.close().await {
            Ok(()) => info!(%side, team = %conn.team.name, "strategy closed"),
            Err(e) => warn!(%side, error = %e, "strategy close failed"),
        }
    }

    pub async fn close_all(&mut self) {
        self.close(Side::Blue).await;
        self.close(Side::Yellow).await;
    }

    pub async fn instruction(&self, side: Side, view: &SideInfo) -> Result<WheelInfo, StrategyFault> {
        self.connection(side, StrategyCall::Instruction)?
            .strategy
            .instruction(view)
            .await
            .map_err(|source| StrategyFault {
                side,
                call: StrategyCall::Instruction,
                source,
            })
    }

    pub async fn placement(
        &self,
        side: Side,
        view: &SideInfo,
    ) -> Result<PlacementInfo, StrategyFault> {
        self.connection(side, StrategyCall::Placement)?
            .strategy
            .placement(view)
            .await
            .map_err(|source| StrategyFault {
                side,
                call: StrategyCall::Placement,
                source,
            })
    }

    /// Lifecycle notifications never abort the match; failures are logged.
    pub async fn notify(&self, side: Side, event: StrategyEvent) {
        let Some(conn) = self.slot(side) else {
            return;
        };
        if let Err(e) = conn.strategy.on_event(event).await {
            warn!(%side, ?event, error = %e, "strategy event notification failed");
        }
    }

    pub async fn notify_all(&self, event: StrategyEvent) {
        tokio::join!(
            self.notify(Side::Blue, event),
            self.notify(Side::Yellow, event)
        );
    }

    fn connection(&self, side: Side, call: StrategyCall) -> Result<&Connection, StrategyFault> {
        self.slot(side).ok_or(StrategyFault {
            side,
            call,
            source: StrategyError::NotConnected,
        })
    }

    // Connections the remote side hung up on no longer count as ready.
    fn slot(&self, side: Side) -> Option<&Connection> {
        let conn = match side {
            Side::Blue => self.blue.as_ref(),
            Side::Yellow => self.yellow.as_ref(),
        };
        conn.filter(|conn| conn.strategy.is_open())
    }

    fn slot_mut(&mut self, side: Side) -> &mut Option<Connection> {
        match side {
            Side::Blue => &mut self.blue,
            Side::Yellow => &mut self.yellow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{ScriptedConnector, StrategyScript};

    const PORTS: DefaultPorts = DefaultPorts {
        blue: 20000,
        yellow: 20001,
    };

    #[tokio::test]
    async fn when_endpoint_omits_port_then_side_default_is_used() {
        let connector = ScriptedConnector::new();
        connector.push(StrategyScript::named("Blue Bots"));
        connector.push(StrategyScript::named("Yellow Bots"));
        let mut manager = StrategyManager::new(Arc::new(connector.clone()), PORTS);

        let blue = manager.connect(Side::Blue, "127.0.0.1").await.unwrap();
        let yellow = manager.connect(Side::Yellow, "localhost").await.unwrap();

        assert_eq!(blue.name, "Blue Bots");
        assert_eq!(yellow.name, "Yellow Bots");
        assert_eq!(
            connector.endpoints(),
            vec!["127.0.0.1:20000".to_string(), "127.0.0.1:20001".to_string()]
        );
        assert!(manager.both_ready());
        assert_eq!(manager.team_name(Side::Yellow), Some("Yellow Bots"));
    }

    #[tokio::test]
    async fn when_endpoint_is_invalid_then_nothing_is_connected() {
        let connector = ScriptedConnector::new();
        let mut manager = StrategyManager::new(Arc::new(connector.clone()), PORTS);

        let fault = manager.connect(Side::Blue, "not an ip").await.unwrap_err();

        assert_eq!(fault.side, Side::Blue);
        assert_eq!(fault.call, StrategyCall::Connect);
        assert!(matches!(fault.source, StrategyError::InvalidEndpoint(_)));
        assert!(connector.endpoints().is_empty());
        assert!(!manager.is_blue_ready());
    }

    #[tokio::test]
    async fn when_team_info_fails_then_connection_is_rolled_back() {
        let connector = ScriptedConnector::new();
        let script = StrategyScript {
            team_info_error: Some(StrategyError::Timeout),
            ..StrategyScript::named("Slow")
        };
        let log = connector.push(script);
        let mut manager = StrategyManager::new(Arc::new(connector), PORTS);

        let fault = manager.connect(Side::Yellow, "127.0.0.1").await.unwrap_err();

        assert_eq!(fault.call, StrategyCall::TeamInfo);
        assert!(fault.source.is_timeout());
        assert!(!manager.is_yellow_ready());
        assert!(log.lock().unwrap().closed);
    }

    #[tokio::test]
    async fn when_side_reconnects_then_previous_connection_is_closed() {
        let connector = ScriptedConnector::new();
        let first = connector.push(StrategyScript::named("First"));
        connector.push(StrategyScript::named("Second"));
        let mut manager = StrategyManager::new(Arc::new(connector), PORTS);

        manager.connect(Side::Blue, "127.0.0.1").await.unwrap();
        manager.connect(Side::Blue, "127.0.0.1:21000").await.unwrap();

        assert!(first.lock().unwrap().closed);
        assert_eq!(manager.team_name(Side::Blue), Some("Second"));
        assert!(!manager.is_yellow_ready());
    }

    #[tokio::test]
    async fn when_reconnect_fails_then_previous_connection_keeps_serving() {
        let connector = ScriptedConnector::new();
        let healthy = connector.push(StrategyScript::named("Healthy"));
        connector.push(StrategyScript {
            team_info_error: Some(StrategyError::Timeout),
            ..StrategyScript::named("Broken")
        });
        let mut manager = StrategyManager::new(Arc::new(connector), PORTS);
        manager.connect(Side::Blue, "127.0.0.1").await.unwrap();

        let fault = manager.connect(Side::Blue, "127.0.0.1:21000").await.unwrap_err();
        assert_eq!(fault.call, StrategyCall::TeamInfo);
        // Refused endpoints leave it untouched as well.
        manager.connect(Side::Blue, "127.0.0.1:21001").await.unwrap_err();

        assert!(manager.is_blue_ready());
        assert!(!healthy.lock().unwrap().closed);
        assert_eq!(manager.team_name(Side::Blue), Some("Healthy"));
        let view = crate::domain::MatchInfo::new_default_preset().side_info(Side::Blue, false);
        manager.instruction(Side::Blue, &view).await.unwrap();
        assert_eq!(healthy.lock().unwrap().instruction_views.len(), 1);
    }

    #[tokio::test]
    async fn when_remote_side_hangs_up_then_side_is_no_longer_ready() {
        let connector = ScriptedConnector::new();
        connector.push(StrategyScript {
            instruction_error: Some(StrategyError::Closed),
            ..StrategyScript::named("Leaver")
        });
        connector.push(StrategyScript::named("Yellow"));
        let mut manager = StrategyManager::new(Arc::new(connector), PORTS);
        manager.connect(Side::Blue, "127.0.0.1").await.unwrap();
        manager.connect(Side::Yellow, "127.0.0.1").await.unwrap();
        let view = crate::domain::MatchInfo::new_default_preset().side_info(Side::Blue, false);

        let fault = manager.instruction(Side::Blue, &view).await.unwrap_err();
        assert_eq!(fault.source, StrategyError::Closed);

        assert!(!manager.is_blue_ready());
        assert!(!manager.both_ready());
        assert_eq!(manager.team_name(Side::Blue), None);
        let fault = manager.instruction(Side::Blue, &view).await.unwrap_err();
        assert_eq!(fault.source, StrategyError::NotConnected);
        assert!(manager.is_yellow_ready());
    }

    #[tokio::test]
    async fn when_side_is_not_connected_then_calls_report_not_connected() {
        let manager = StrategyManager::new(Arc::new(ScriptedConnector::new()), PORTS);
        let view = crate::domain::MatchInfo::new_default_preset().side_info(Side::Blue, false);

        let fault = manager.instruction(Side::Blue, &view).await.unwrap_err();

        assert_eq!(fault.source, StrategyError::NotConnected);
        manager.notify_all(StrategyEvent::MatchStart).await;
    }

    #[tokio::test]
    async fn when_event_notification_fails_then_it_is_swallowed() {
        let connector = ScriptedConnector::new();
        let log = connector.push(StrategyScript {
            event_error: Some(StrategyError::Transport("connection reset".to_string())),
            ..StrategyScript::named("Flaky")
        });
        let mut manager = StrategyManager::new(Arc::new(connector), PORTS);
        manager.connect(Side::Blue, "127.0.0.1").await.unwrap();

        manager.notify(Side::Blue, StrategyEvent::RoundStop).await;

        assert_eq!(log.lock().unwrap().events, vec![StrategyEvent::RoundStop]);
        assert!(manager.is_blue_ready());
    }
}
