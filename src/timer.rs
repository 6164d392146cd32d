//! One-shot software deadlines, compared against the tick's `now`.

use crate::{Duration, Instant};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OneShot(Option<Instant>);

impl OneShot {
    pub const fn armed(deadline: Instant) -> Self {
        Self(Some(deadline))
    }

    /// Arms (or re-arms) the timer to expire `delay` after `now`.
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.0 = Some(now + delay);
    }

    pub fn arm_at(&mut self, deadline: Instant) {
        self.0 = Some(deadline);
    }

    pub fn disarm(&mut self) {
        self.0 = None;
    }

    /// Returns `true` exactly once, on the first call at or after the deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.0 {
            Some(deadline) if now >= deadline => {
                self.0 = None;
                true
            }
            _ => false,
        }
    }
}
