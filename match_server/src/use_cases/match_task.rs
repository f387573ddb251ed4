// Long-running task that owns the match controller.

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info};

use super::orchestrator::MatchController;
use super::types::MatchCommand;
use crate::domain::{FieldHost, MatchError};

/// Serializes every match mutation: commands, field frames and timed-pause
/// completions are handled one at a time. Exits on `Shutdown` or when every
/// command sender is dropped.
pub async fn match_task<F>(mut controller: MatchController<F>, mut commands: mpsc::Receiver<MatchCommand>)
where
    F: FieldHost,
{
    info!("match task started");
    loop {
        let deadline = controller.pause_deadline();
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(MatchCommand::Shutdown) | None => break,
                    Some(command) => handle_command(&mut controller, command).await,
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Err(e) = controller.complete_timed_pause(Instant::now()).await {
                    log_tick_error(&e);
                }
            }
        }
    }
    controller.shutdown().await;
}

async fn handle_command<F>(controller: &mut MatchController<F>, command: MatchCommand)
where
    F: FieldHost,
{
    match command {
        MatchCommand::ConnectStrategy {
            side,
            endpoint,
            reply,
        } => {
            let result = controller.connect_strategy(side, &endpoint).await;
            let _ = reply.send(result);
        }
        MatchCommand::CloseStrategy { side, reply } => {
            controller.close_strategy(side).await;
            let _ = reply.send(());
        }
        MatchCommand::Start { reply } => {
            let result = controller.start_match().await;
            let _ = reply.send(result);
        }
        MatchCommand::Stop {
            notify_strategies,
            reply,
        } => {
            controller.stop_match(notify_strategies).await;
            let _ = reply.send(());
        }
        MatchCommand::Pause { reply } => {
            controller.pause_match();
            let _ = reply.send(());
        }
        MatchCommand::Resume { reply } => {
            controller.resume_match();
            let _ = reply.send(());
        }
        MatchCommand::FieldFrame(frame) => {
            controller.sync_field(&frame);
            if let Err(e) = controller.tick().await {
                log_tick_error(&e);
            }
        }
        MatchCommand::Snapshot { reply } => {
            let _ = reply.send(controller.snapshot());
        }
        MatchCommand::Shutdown => {}
    }
}

fn log_tick_error(e: &MatchError) {
    match e {
        // Already reported by the controller when the match was halted.
        MatchError::Strategy(fault) => debug!(error = %fault, "tick aborted by strategy fault"),
        other => error!(error = %other, "tick failed"),
    }
}
