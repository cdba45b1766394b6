//! Timer events and the pending-deadline set.
//!
//! Every scheduled alarm carries a [`TimerEvent`] tag identifying which
//! logical timer fired, so expiry handling is a single dispatch over the
//! tag. Rescheduling an event replaces its pending deadline; a given event
//! can never be pending twice.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// Identifies one logical timer of a GLBP group.
///
/// Forwarder timers carry the 0-based slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerEvent {
    /// Periodic hello transmission.
    Hello,
    /// Active-gateway liveness (hold) timer.
    ActiveGateway,
    /// Standby-gateway liveness (hold) timer.
    StandbyGateway,
    /// Per-slot forwarder election timer.
    VfActive(usize),
    /// Per-slot redirect grace period for a departed primary.
    VfRedirect(usize),
    /// Per-slot decommission timer for a departed primary.
    VfTimeout(usize),
}

impl fmt::Display for TimerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerEvent::Hello => write!(f, "hello"),
            TimerEvent::ActiveGateway => write!(f, "active"),
            TimerEvent::StandbyGateway => write!(f, "standby"),
            TimerEvent::VfActive(i) => write!(f, "vf-active({})", i + 1),
            TimerEvent::VfRedirect(i) => write!(f, "vf-redirect({})", i + 1),
            TimerEvent::VfTimeout(i) => write!(f, "vf-timeout({})", i + 1),
        }
    }
}

/// The set of pending one-shot deadlines for a group.
///
/// A group owns up to three gateway timers plus three timers per forwarder
/// slot; all of them live here so teardown can cancel everything in one
/// call.
#[derive(Debug, Default)]
pub struct TimerSet {
    pending: HashMap<TimerEvent, Instant>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` to fire at `deadline`, replacing any pending
    /// deadline for the same event.
    pub fn schedule(&mut self, event: TimerEvent, deadline: Instant) {
        self.pending.insert(event, deadline);
    }

    /// Cancel a pending event. Returns whether it was pending.
    pub fn cancel(&mut self, event: TimerEvent) -> bool {
        self.pending.remove(&event).is_some()
    }

    /// Cancel every pending event.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_scheduled(&self, event: TimerEvent) -> bool {
        self.pending.contains_key(&event)
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return the earliest event due at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerEvent> {
        let due = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .min_by_key(|(_, deadline)| **deadline)
            .map(|(event, _)| *event)?;
        self.pending.remove(&due);
        Some(due)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_schedule_replaces_pending_deadline() {
        let mut timers = TimerSet::new();
        let now = Instant::now();

        timers.schedule(TimerEvent::Hello, now + Duration::from_secs(3));
        timers.schedule(TimerEvent::Hello, now + Duration::from_secs(30));
        assert_eq!(timers.len(), 1);

        // The replaced deadline must not fire.
        assert_eq!(timers.pop_due(now + Duration::from_secs(10)), None);
        assert_eq!(
            timers.pop_due(now + Duration::from_secs(30)),
            Some(TimerEvent::Hello)
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn test_pop_due_orders_by_deadline() {
        let mut timers = TimerSet::new();
        let now = Instant::now();

        timers.schedule(TimerEvent::StandbyGateway, now + Duration::from_secs(10));
        timers.schedule(TimerEvent::VfActive(0), now + Duration::from_secs(5));
        timers.schedule(TimerEvent::Hello, now + Duration::from_secs(3));

        let later = now + Duration::from_secs(60);
        assert_eq!(timers.pop_due(later), Some(TimerEvent::Hello));
        assert_eq!(timers.pop_due(later), Some(TimerEvent::VfActive(0)));
        assert_eq!(timers.pop_due(later), Some(TimerEvent::StandbyGateway));
        assert_eq!(timers.pop_due(later), None);
    }

    #[test]
    fn test_cancel() {
        let mut timers = TimerSet::new();
        let now = Instant::now();

        timers.schedule(TimerEvent::ActiveGateway, now);
        assert!(timers.is_scheduled(TimerEvent::ActiveGateway));
        assert!(timers.cancel(TimerEvent::ActiveGateway));
        assert!(!timers.cancel(TimerEvent::ActiveGateway));
        assert_eq!(timers.pop_due(now + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_cancel_all() {
        let mut timers = TimerSet::new();
        let now = Instant::now();

        timers.schedule(TimerEvent::Hello, now);
        timers.schedule(TimerEvent::VfActive(2), now);
        timers.schedule(TimerEvent::VfTimeout(2), now);
        timers.cancel_all();
        assert!(timers.is_empty());
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn test_next_deadline() {
        let mut timers = TimerSet::new();
        let now = Instant::now();
        assert_eq!(timers.next_deadline(), None);

        timers.schedule(TimerEvent::Hello, now + Duration::from_secs(3));
        timers.schedule(TimerEvent::ActiveGateway, now + Duration::from_secs(10));
        assert_eq!(timers.next_deadline(), Some(now + Duration::from_secs(3)));
    }
}
