//! # Cadet display controller
//!
//! Game logic for the display board of a three-board pinball machine. The
//! solenoid driver and the sound controller report playfield events over two
//! UART links; this crate keeps score, runs the mode/mission/rank state
//! machine, animates the playfield lamps and produces the text shown on the
//! score display.
//!
//! The library is hardware-agnostic and builds on the host, so the whole game
//! can be exercised with `cargo test`. Hardware is reached through
//! [`transport::SerialPort`], [`lamps::LightBank`], [`scoreboard::Scoreboard`]
//! and the `embedded-hal` traits. The RP2350 firmware binary (feature
//! `rp2350`) wires those to real peripherals and calls
//! [`scheduler::Scheduler::tick`] forever.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod aw9523;
pub mod button;
pub mod config;
pub mod game;
pub mod lamps;
pub mod lights;
pub mod missions;
pub mod protocol;
pub mod rng;
pub mod scheduler;
pub mod scoreboard;
pub mod servo;
pub mod status;
pub mod timer;
pub mod transport;

/// Monotonic time in microseconds, as read from the RP2350 `TIMER0`.
pub type Instant = fugit::TimerInstantU64<1_000_000>;

pub type Duration = fugit::MicrosDurationU64;

pub use game::{Game, Mode};
pub use scheduler::{Peripherals, Scheduler};
