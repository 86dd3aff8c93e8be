//! Cancellable one-shot timers on the host's clock.
//!
//! The canvas runs on a single-threaded event loop, so timers are plain
//! deadline fields rather than scheduled tasks. The host passes its clock
//! (milliseconds) with every event and calls `tick` periodically; a due
//! timer fires exactly once. Scheduling always replaces the previous
//! deadline, so a stale timer can never fire after it was superseded.

/// A pending-timer handle. `None` deadline = not armed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PendingTimer {
    deadline: Option<f64>,
}

impl PendingTimer {
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm the timer `delay_ms` after `now`, replacing any earlier deadline.
    pub fn schedule(&mut self, now: f64, delay_ms: f64) {
        self.deadline = Some(now + delay_ms.max(0.0));
    }

    /// Disarm. Returns true if the timer was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Armed and not yet due at `now`.
    pub fn is_running_at(&self, now: f64) -> bool {
        self.deadline.is_some_and(|d| now < d)
    }

    /// Fire if due: disarms and returns true once the deadline has passed.
    pub fn fire(&mut self, now: f64) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
