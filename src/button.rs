//! Debounced push button.
//!
//! The new-game button is wired active low with a pull-up, so a press is a
//! falling edge. [`Debouncer::update`] is polled once per tick and reports an
//! edge only after the raw level has held steady for the debounce interval.

use embedded_hal::digital::InputPin;

use crate::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Level went high (released).
    Rose,
    /// Level went low (pressed).
    Fell,
}

pub struct Debouncer<P> {
    pin: P,
    interval: Duration,
    stable: bool,
    candidate: bool,
    since: Instant,
}

impl<P: InputPin> Debouncer<P> {
    /// Starts in the released (high) state.
    pub fn new(pin: P, interval: Duration) -> Self {
        Self {
            pin,
            interval,
            stable: true,
            candidate: true,
            since: Instant::from_ticks(0),
        }
    }

    /// Samples the pin and returns an edge if the debounced level changed.
    pub fn update(&mut self, now: Instant) -> Option<Edge> {
        let level = match self.pin.is_high() {
            Ok(level) => level,
            Err(_) => {
                error!("button read failed");
                return None;
            }
        };

        if level != self.candidate {
            self.candidate = level;
            self.since = now;
            return None;
        }
        if level == self.stable || now < self.since + self.interval {
            return None;
        }

        self.stable = level;
        Some(if level { Edge::Rose } else { Edge::Fell })
    }

    pub fn is_pressed(&self) -> bool {
        !self.stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    struct FakePin<'a>(&'a Cell<bool>);

    impl ErrorType for FakePin<'_> {
        type Error = Infallible;
    }

    impl InputPin for FakePin<'_> {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0.get())
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0.get())
        }
    }

    fn at(ms: u64) -> Instant {
        Instant::from_ticks(ms * 1_000)
    }

    #[test]
    fn reports_press_after_interval() {
        let level = Cell::new(true);
        let mut button = Debouncer::new(FakePin(&level), Duration::millis(10));
        assert_eq!(button.update(at(0)), None);

        level.set(false);
        assert_eq!(button.update(at(1)), None);
        assert_eq!(button.update(at(5)), None);
        assert_eq!(button.update(at(11)), Some(Edge::Fell));
        assert!(button.is_pressed());
        assert_eq!(button.update(at(20)), None);

        level.set(true);
        assert_eq!(button.update(at(30)), None);
        assert_eq!(button.update(at(40)), Some(Edge::Rose));
    }

    #[test]
    fn ignores_chatter() {
        let level = Cell::new(true);
        let mut button = Debouncer::new(FakePin(&level), Duration::millis(10));

        for t in 0..20 {
            level.set(t % 2 == 0);
            assert_eq!(button.update(at(t * 3)), None);
        }
        assert!(!button.is_pressed());
    }
}
