//! Swallow bursts of events and act once they've settled.

use std::time::{Duration, Instant};

/// A pending deadline that gets pushed back by every new event. It fires once, when the
/// deadline passes with no further events.
///
/// Time is always passed in, never read from the system clock, so the host decides what "now"
/// means.
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// How long things have to be quiet before firing
    window: Duration,
    /// When the debouncer will fire, if it's armed
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Instantiate
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Register an event. Replaces any pending deadline.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now.checked_add(self.window).unwrap_or(now));
    }

    /// Returns `true`, exactly once, when the quiet window has elapsed since the last trigger.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            Some(_) | None => false,
        }
    }

    /// Forget any pending deadline.
    pub const fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Is there a deadline waiting to fire?
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// When it will fire, if armed.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(250);

    fn millis(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn fires_once_after_the_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        assert!(!debouncer.poll(start));

        debouncer.trigger(start);
        assert!(!debouncer.poll(start + millis(249)));
        assert!(debouncer.poll(start + millis(250)));
        assert!(!debouncer.poll(start + millis(251)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn new_events_push_the_deadline_back() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);

        for ms in [0, 20, 40, 60, 80] {
            debouncer.trigger(start + millis(ms));
            assert!(!debouncer.poll(start + millis(ms)));
        }

        assert_eq!(debouncer.deadline(), Some(start + millis(330)));
        assert!(!debouncer.poll(start + millis(300)));
        assert!(debouncer.poll(start + millis(330)));
    }

    #[test]
    fn cancelled_debouncer_never_fires() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.trigger(start);
        debouncer.cancel();
        assert!(!debouncer.poll(start + millis(1000)));
    }
}
