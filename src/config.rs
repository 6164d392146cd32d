//! Configuration constants for the display controller.
//!
//! Every score value, delay and table size the game logic uses lives here so
//! the playfield can be re-tuned without touching the state machine. Physical
//! layout (lamp pins, lane counts) lives in [`crate::protocol`] instead, since
//! the other two boards must agree on it.

use crate::Duration;
use crate::protocol::REENTRY_LANES;

// Game Rules
/// Balls per game.
pub const NUM_BALLS: u8 = 3;

/// Upper bound for the drop-target score multiplier.
pub const MAX_MULTIPLIER: u8 = 5;

/// Missions that must be completed at one rank before a promotion.
pub const MISSIONS_PER_RANK: u8 = 3;

/// Crash bonus every fresh ball starts with.
pub const DEFAULT_CRASH_BONUS: u32 = 1_000;

// Scoring
pub const POP_BUMPER_SCORE: u32 = 100;
pub const SLINGSHOT_SCORE: u32 = 10;
pub const DROP_TARGET_SCORE: u32 = 250;
pub const DROP_TARGET_RESET_SCORE: u32 = 1_000;
pub const DROP_TARGET_RESET_CRASH_BONUS: u32 = 500;
pub const MISSION_BUTTON_SCORE: u32 = 50;
pub const MISSION_BUTTON_CRASH_BONUS: u32 = 25;

/// Points for each re-entry lane, indexed by lane.
pub const REENTRY_SCORES: [u32; REENTRY_LANES] = [100, 500, 200];

/// Awarded when every re-entry lane is lit at once.
pub const REENTRY_GROUP_BONUS: u32 = 2_500;

/// Base value of a hyperspace shot, multiplied by `combo + 1`.
pub const HYPERSPACE_HIT_SCORE: u32 = 1_000;
pub const HYPERSPACE_JACKPOT_BONUS: u32 = 25_000;

/// Combo value at which a hyperspace shot pays the jackpot.
pub const HYPERSPACE_JACKPOT_COMBO: u8 = 2;

/// Combo value at which a hyperspace shot lights the extra ball.
pub const HYPERSPACE_EXTRA_BALL_COMBO: u8 = 3;

/// Crash bonus added per rank level on promotion.
pub const PROMOTION_CRASH_BONUS: u32 = 1_000;

// Timing Configuration
/// Hold-off before the drop-target reset sound so it does not overlap the
/// mechanical reset of the bank.
pub const DROP_TARGET_SOUND_DELAY: Duration = Duration::millis(600);

/// Time between a drain and the reload (or game over) decision.
pub const BALL_DRAINED_DELAY: Duration = Duration::millis(3_000);

/// Ball-save window after a launch before the center post starts retracting.
pub const REDEPLOY_GRACE: Duration = Duration::millis(10_000);

/// Inactivity window after which the hyperspace combo loses one level.
pub const HYPERSPACE_DECAY: Duration = Duration::millis(12_000);

/// Minimum time an announcement stays on the status display.
pub const STATUS_HOLD: Duration = Duration::millis(2_000);

/// How long a promotion announcement stays up.
pub const PROMOTION_HOLD: Duration = Duration::millis(5_000);

/// Debounce interval for the new-game button.
pub const BUTTON_DEBOUNCE: Duration = Duration::millis(10);

// Lamp Animations
pub const BLINK_FAST: Duration = Duration::millis(100);
pub const BLINK_SLOW: Duration = Duration::millis(250);

/// Toggles for a short acknowledgement blink.
pub const BLINKS_SHORT: u16 = 6;

/// Toggles for the ship celebration after a mission.
pub const BLINKS_CELEBRATE: u16 = 12;

/// Toggles for the ship celebration after a promotion.
pub const BLINKS_PROMOTION: u16 = 30;

/// Toggles while the center post retracts at the end of the ball save.
pub const BLINKS_CENTER_POST: u16 = 10;

// Ship Servo
/// PWM is released this long after each move to stop the servo buzzing.
pub const SERVO_TIMEOUT: Duration = Duration::millis(1_000);
pub const SERVO_MOVE_MIN_MS: u32 = 5_000;
pub const SERVO_MOVE_MAX_MS: u32 = 30_000;
pub const SERVO_HOME_ANGLE: u8 = 90;
pub const SERVO_MIN_ANGLE: u8 = 50;
pub const SERVO_MAX_ANGLE: u8 = 130;
pub const SERVO_MAX_STEP: u8 = 30;

/// Servo pulse width limits in microseconds at 50 Hz.
pub const SERVO_MIN_PULSE_US: u32 = 500;
pub const SERVO_MAX_PULSE_US: u32 = 2_500;
pub const SERVO_PERIOD_US: u32 = 20_000;

// Buffers
/// Longest inbound line accepted from a peer, excluding the terminator.
pub const MAX_LINE_LEN: usize = 32;

/// Outbound messages that may queue up within one tick.
pub const OUTBOX_DEPTH: usize = 16;

/// Concurrent lamp animations. One per target at most, so this covers every
/// lamp plus every lamp group.
pub const MAX_ANIMATIONS: usize = crate::protocol::LIGHT_COUNT + 4;

/// Status display width in characters.
pub const STATUS_WIDTH: usize = 14;

/// Capacity of a status string, wrapped or not.
pub const STATUS_CAPACITY: usize = 96;

// Communication Configuration
/// Baud rate of both peer UART links.
pub const PEER_BAUD_RATE: u32 = 9_600;

/// Outbound bytes buffered per peer link while the UART FIFO is full. Holds
/// a full outbox of encoded messages.
pub const PEER_TX_QUEUE: usize = 256;
