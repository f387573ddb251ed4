// Single-flight scheduler for timed pauses around repositioning.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::JudgeResult;

/// Work run once a timed pause elapses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeferredAction {
    Nothing,
    ApplyPlacement(JudgeResult),
}

#[derive(Debug)]
struct RunningPause {
    deadline: Instant,
    action: Option<DeferredAction>,
}

/// At most one pause runs at a time; later requests wait in FIFO order and
/// start their own delay when the running one is released.
#[derive(Debug, Default)]
pub struct TimedPauseQueue {
    running: Option<RunningPause>,
    waiting: VecDeque<(Duration, DeferredAction)>,
}

impl TimedPauseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the pause started right away.
    pub fn request(&mut self, now: Instant, delay: Duration, action: DeferredAction) -> bool {
        if self.running.is_some() {
            self.waiting.push_back((delay, action));
            return false;
        }
        self.running = Some(RunningPause {
            deadline: now + delay,
            action: Some(action),
        });
        true
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    /// Deadline of the running pause, unless its action was already taken.
    pub fn deadline(&self) -> Option<Instant> {
        self.running
            .as_ref()
            .filter(|pause| pause.action.is_some())
            .map(|pause| pause.deadline)
    }

    /// Takes the action of an elapsed pause. The guard stays held until `release`.
    pub fn take_due(&mut self, now: Instant) -> Option<DeferredAction> {
        let pause = self.running.as_mut()?;
        if pause.deadline > now {
            return None;
        }
        pause.action.take()
    }

    /// Drops the guard and starts the next waiting pause, if any.
    pub fn release(&mut self, now: Instant) {
        self.running = None;
        if let Some((delay, action)) = self.waiting.pop_front() {
            self.request(now, delay, action);
        }
    }

    pub fn clear(&mut self) {
        self.running = None;
        self.waiting.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ResultType, Side};

    const DELAY: Duration = Duration::from_secs(2);

    #[test]
    fn when_pause_is_not_due_then_nothing_is_taken() {
        let start = Instant::now();
        let mut queue = TimedPauseQueue::new();
        assert!(queue.request(start, DELAY, DeferredAction::Nothing));

        assert_eq!(queue.take_due(start + Duration::from_millis(1999)), None);
        assert_eq!(queue.deadline(), Some(start + DELAY));
    }

    #[test]
    fn when_second_request_arrives_then_it_waits_for_release() {
        let start = Instant::now();
        let placement = DeferredAction::ApplyPlacement(JudgeResult::reposition(
            ResultType::PlaceKick,
            Side::Yellow,
            Some(Side::Blue),
        ));
        let mut queue = TimedPauseQueue::new();
        queue.request(start, DELAY, placement);
        assert!(!queue.request(start, DELAY, DeferredAction::Nothing));

        let due = start + DELAY;
        assert_eq!(queue.take_due(due), Some(placement));
        assert!(queue.is_active());
        assert_eq!(queue.deadline(), None);
        assert_eq!(queue.take_due(due), None);

        let released = due + Duration::from_millis(10);
        queue.release(released);
        assert_eq!(queue.deadline(), Some(released + DELAY));
        assert_eq!(
            queue.take_due(released + DELAY),
            Some(DeferredAction::Nothing)
        );

        queue.release(released + DELAY);
        assert!(!queue.is_active());
    }

    #[test]
    fn when_cleared_then_pending_actions_are_dropped() {
        let start = Instant::now();
        let mut queue = TimedPauseQueue::new();
        queue.request(start, DELAY, DeferredAction::Nothing);
        queue.request(start, DELAY, DeferredAction::Nothing);

        queue.clear();
        queue.release(start + DELAY);

        assert!(!queue.is_active());
        assert_eq!(queue.take_due(start + DELAY * 4), None);
    }
}
