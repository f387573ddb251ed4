// Field host adapter: turns orchestrator commands into `/field` socket messages.

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::{Ball, FieldHost, ROBOTS_PER_TEAM, Robot, WheelInfo};
use crate::interface_adapters::protocol::{BallDto, FieldCommandDto, WheelDto, robots_to_dto};

/// Publishes field commands to every connected physics host.
#[derive(Clone)]
pub struct ChannelFieldHost {
    tx: broadcast::Sender<FieldCommandDto>,
}

impl ChannelFieldHost {
    pub fn new(tx: broadcast::Sender<FieldCommandDto>) -> Self {
        Self { tx }
    }

    fn publish(&self, command: FieldCommandDto) {
        if let Err(broadcast::error::SendError(command)) = self.tx.send(command) {
            debug!(?command, "no field host connected; command dropped");
        }
    }
}

fn wheels_to_dto(wheels: &WheelInfo) -> Vec<WheelDto> {
    wheels.wheels.iter().copied().map(WheelDto::from).collect()
}

impl FieldHost for ChannelFieldHost {
    fn pause(&self) {
        self.publish(FieldCommandDto::Pause);
    }

    fn resume(&self) {
        self.publish(FieldCommandDto::Resume);
    }

    fn set_to_default(&self) {
        self.publish(FieldCommandDto::SetToDefault);
    }

    fn set_still(&self) {
        self.publish(FieldCommandDto::SetStill);
    }

    fn set_blue_wheels(&self, wheels: &WheelInfo) {
        self.publish(FieldCommandDto::SetBlueWheels {
            wheels: wheels_to_dto(wheels),
        });
    }

    fn set_yellow_wheels(&self, wheels: &WheelInfo) {
        self.publish(FieldCommandDto::SetYellowWheels {
            wheels: wheels_to_dto(wheels),
        });
    }

    fn set_blue_placement(&self, robots: &[Robot; ROBOTS_PER_TEAM]) {
        self.publish(FieldCommandDto::SetBluePlacement {
            robots: robots_to_dto(robots),
        });
    }

    fn set_yellow_placement(&self, robots: &[Robot; ROBOTS_PER_TEAM]) {
        self.publish(FieldCommandDto::SetYellowPlacement {
            robots: robots_to_dto(robots),
        });
    }

    fn set_ball_placement(&self, ball: &Ball) {
        self.publish(FieldCommandDto::SetBallPlacement(BallDto::from(ball)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Side, Wheel};
    use crate::domain::field::default_layout;

    #[test]
    fn when_commands_are_issued_then_subscribers_receive_them_in_order() {
        let (tx, mut rx) = broadcast::channel(8);
        let host = ChannelFieldHost::new(tx);

        host.pause();
        host.set_blue_wheels(&WheelInfo {
            wheels: [Wheel {
                left: 10.0,
                right: -10.0,
            }; 5],
        });
        host.set_yellow_placement(&default_layout(Side::Yellow));

        assert_eq!(rx.try_recv().unwrap(), FieldCommandDto::Pause);
        match rx.try_recv().unwrap() {
            FieldCommandDto::SetBlueWheels { wheels } => {
                assert_eq!(wheels.len(), 5);
                assert_eq!(wheels[0].right, -10.0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        match rx.try_recv().unwrap() {
            FieldCommandDto::SetYellowPlacement { robots } => assert_eq!(robots[0].x, 102.5),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn when_no_host_is_connected_then_commands_are_dropped_quietly() {
        let (tx, rx) = broadcast::channel(8);
        drop(rx);
        let host = ChannelFieldHost::new(tx);

        host.set_still();
        host.set_ball_placement(&Ball::default());
    }
}
