//! Text projection of the game onto the score display.
//!
//! The display controller renders three fields: the score, the ball number
//! and the wrapped status text. Everything here is plain strings; fonts and
//! pixels belong to the [`Scoreboard`] implementation.

use core::fmt::Write as _;

use heapless::String;

pub trait Scoreboard {
    fn show_score(&mut self, score: &str);
    fn show_ball(&mut self, ball: &str);
    /// `status` is already wrapped, lines separated by `\n`.
    fn show_status(&mut self, status: &str);
}

/// Decimal rendering of a score or ball count.
pub fn number(value: u32) -> String<10> {
    let mut text = String::new();
    // u32::MAX has exactly ten digits.
    let _ = write!(text, "{}", value);
    text
}
