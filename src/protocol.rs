//! Shared wire schema for the three-board cabinet.
//!
//! The solenoid driver and the sound controller are built against the same
//! tables: command tags, board names, sound numbers, lane counts and the lamp
//! pin map. Bump [`PROTOCOL_VERSION`] whenever any of them changes.

use core::fmt::{self, Write as _};

use heapless::String;

use crate::config::MAX_LINE_LEN;

pub const PROTOCOL_VERSION: u8 = 3;

/// Line terminator on both peer links.
pub const LINE_END: &str = "\r\n";

pub const REENTRY_LANES: usize = 3;
pub const MISSION_BUTTONS: usize = 3;
pub const DROP_TARGETS: usize = 3;
pub const HYPERSPACE_LEVELS: usize = 5;

/// Which serial link a line travelled over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peer {
    Solenoid,
    Sound,
}

/// Boards that announce themselves with `INI`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Board {
    SolenoidDriver,
    SoundController,
}

impl Board {
    pub const fn name(self) -> &'static str {
        match self {
            Board::SolenoidDriver => "solenoidDriver",
            Board::SoundController => "soundController",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "solenoidDriver" => Some(Board::SolenoidDriver),
            "soundController" => Some(Board::SoundController),
            _ => None,
        }
    }
}

/// Inbound command tag, the first token of every line.
///
/// Missions name their target by tag, so a tag compares equal for every
/// argument value (`DT 0` and `DT 2` are both [`Tag::DropTarget`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tag {
    Hyperspace,
    Drain,
    DropTargetReset,
    MissionButton,
    BoardReady,
    Reentry,
    DropTarget,
    PopBumper,
    Slingshot,
    LeftFlipperUp,
    LeftFlipperDown,
    RightFlipperUp,
    RightFlipperDown,
}

impl Tag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Tag::Hyperspace => "HYP",
            Tag::Drain => "DRN",
            Tag::DropTargetReset => "DTR",
            Tag::MissionButton => "BTN",
            Tag::BoardReady => "INI",
            Tag::Reentry => "IR",
            Tag::DropTarget => "DT",
            Tag::PopBumper => "PB",
            Tag::Slingshot => "SLG",
            Tag::LeftFlipperUp => "FLU",
            Tag::LeftFlipperDown => "FLD",
            Tag::RightFlipperUp => "FRU",
            Tag::RightFlipperDown => "FRD",
        }
    }

    /// Tags are case-sensitive.
    pub fn parse(token: &str) -> Option<Self> {
        let tag = match token {
            "HYP" => Tag::Hyperspace,
            "DRN" => Tag::Drain,
            "DTR" => Tag::DropTargetReset,
            "BTN" => Tag::MissionButton,
            "INI" => Tag::BoardReady,
            "IR" => Tag::Reentry,
            "DT" => Tag::DropTarget,
            "PB" => Tag::PopBumper,
            "SLG" => Tag::Slingshot,
            "FLU" => Tag::LeftFlipperUp,
            "FLD" => Tag::LeftFlipperDown,
            "FRU" => Tag::RightFlipperUp,
            "FRD" => Tag::RightFlipperDown,
            _ => return None,
        };
        Some(tag)
    }
}

/// A decoded inbound event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Hyperspace,
    Drain,
    DropTargetReset,
    MissionButton(u8),
    BoardReady(Board),
    Reentry(u8),
    DropTarget(u8),
    PopBumper,
    Slingshot,
    LeftFlipperUp,
    LeftFlipperDown,
    RightFlipperUp,
    RightFlipperDown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Blank line.
    Empty,
    UnknownTag,
    MissingArgument(Tag),
    InvalidArgument(Tag),
}

impl Command {
    /// Decodes one line with its terminator already stripped.
    ///
    /// Extra trailing tokens are ignored.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut tokens = line.split_ascii_whitespace();
        let tag = tokens.next().ok_or(ParseError::Empty)?;
        let tag = Tag::parse(tag).ok_or(ParseError::UnknownTag)?;

        let command = match tag {
            Tag::Hyperspace => Command::Hyperspace,
            Tag::Drain => Command::Drain,
            Tag::DropTargetReset => Command::DropTargetReset,
            Tag::MissionButton => Command::MissionButton(index_arg(tag, tokens.next())?),
            Tag::BoardReady => {
                let name = tokens.next().ok_or(ParseError::MissingArgument(tag))?;
                let board = Board::from_name(name).ok_or(ParseError::InvalidArgument(tag))?;
                Command::BoardReady(board)
            }
            Tag::Reentry => Command::Reentry(index_arg(tag, tokens.next())?),
            Tag::DropTarget => Command::DropTarget(index_arg(tag, tokens.next())?),
            Tag::PopBumper => Command::PopBumper,
            Tag::Slingshot => Command::Slingshot,
            Tag::LeftFlipperUp => Command::LeftFlipperUp,
            Tag::LeftFlipperDown => Command::LeftFlipperDown,
            Tag::RightFlipperUp => Command::RightFlipperUp,
            Tag::RightFlipperDown => Command::RightFlipperDown,
        };
        Ok(command)
    }

    pub const fn tag(&self) -> Tag {
        match self {
            Command::Hyperspace => Tag::Hyperspace,
            Command::Drain => Tag::Drain,
            Command::DropTargetReset => Tag::DropTargetReset,
            Command::MissionButton(_) => Tag::MissionButton,
            Command::BoardReady(_) => Tag::BoardReady,
            Command::Reentry(_) => Tag::Reentry,
            Command::DropTarget(_) => Tag::DropTarget,
            Command::PopBumper => Tag::PopBumper,
            Command::Slingshot => Tag::Slingshot,
            Command::LeftFlipperUp => Tag::LeftFlipperUp,
            Command::LeftFlipperDown => Tag::LeftFlipperDown,
            Command::RightFlipperUp => Tag::RightFlipperUp,
            Command::RightFlipperDown => Tag::RightFlipperDown,
        }
    }
}

fn index_arg(tag: Tag, token: Option<&str>) -> Result<u8, ParseError> {
    let token = token.ok_or(ParseError::MissingArgument(tag))?;
    token.parse().map_err(|_| ParseError::InvalidArgument(tag))
}

/// Outbound commands. Which peers receive each one is fixed by
/// [`Message::destinations`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    /// `PNT`: ball scored before the deploy sensor fired.
    Point,
    /// `ACC`: mission accepted.
    Accepted,
    /// `MSN n`: missions completed at the current rank.
    MissionCount(u8),
    /// `RNK n`: promoted to rank index `n`.
    Rank(u8),
    /// `RST`: stop everything and return to idle.
    Reset,
    /// `RLD`: load a ball into the plunger lane.
    Reload,
    /// `GOV`: game over.
    GameOver,
    /// `SND n`: play sound effect `n`.
    Sound(u8),
    /// `DRN`: ball drained.
    Drained,
}

impl Message {
    pub const fn destinations(&self) -> &'static [Peer] {
        match self {
            Message::Reload => &[Peer::Solenoid],
            Message::Reset => &[Peer::Solenoid, Peer::Sound],
            _ => &[Peer::Sound],
        }
    }

    pub fn encode(&self) -> String<MAX_LINE_LEN> {
        let mut line = String::new();
        // Longest encoding is "MSN 255", far below MAX_LINE_LEN.
        let _ = write!(line, "{}", self);
        line
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Point => f.write_str("PNT"),
            Message::Accepted => f.write_str("ACC"),
            Message::MissionCount(n) => write!(f, "MSN {}", n),
            Message::Rank(n) => write!(f, "RNK {}", n),
            Message::Reset => f.write_str("RST"),
            Message::Reload => f.write_str("RLD"),
            Message::GameOver => f.write_str("GOV"),
            Message::Sound(n) => write!(f, "SND {}", n),
            Message::Drained => f.write_str("DRN"),
        }
    }
}

/// Sound-effect numbers understood by the sound controller.
pub mod sound {
    pub const STARTUP: u8 = 0;
    pub const HIGH_SCORE: u8 = 1;
    pub const BALL_DEPLOY: u8 = 2;
    pub const FLIPPER: u8 = 3;
    pub const WIND_DOWN: u8 = 4;
    pub const FUEL_LIGHT: u8 = 5;
    pub const MISSION_COMPLETE: u8 = 6;
    pub const SLINGSHOT: u8 = 7;
    pub const LIGHT_GROUP_LIT: u8 = 8;
    pub const CENTER_POST_GONE: u8 = 9;
    pub const FLIPPER_2: u8 = 10;
    pub const DROP_TARGET_RESET: u8 = 11;
    pub const WOOP_UP: u8 = 12;
    pub const WOOP_DOWN: u8 = 13;
    pub const DROP_TARGET_RESET_2: u8 = 14;
    pub const PLUNGER_LAUNCH: u8 = 15;
    pub const MISSION_ACCEPTED: u8 = 16;
    pub const SHIP_REFUELED: u8 = 17;
    pub const RE_ENTRY: u8 = 18;
    pub const BALL_DRAINED: u8 = 19;
    pub const EXTRA_BALL_GAINED: u8 = 20;
    pub const HIGH_PITCHED_JACKPOT: u8 = 21;
    pub const LAUNCHED_NO_MISSION: u8 = 22;
    pub const CENTERPOST_BUMP: u8 = 23;
    pub const HYPERSPACE_LAUNCH: u8 = 24;
    pub const HYPERSPACE_JACKPOT: u8 = 25;
    pub const HYPERSPACE_EXTRA_BALL: u8 = 26;
    pub const HYPERSPACE_GRAVITY_WELL: u8 = 27;
    pub const GRAVITY_WELL_CANCELLED: u8 = 28;
    pub const WORMHOLE: u8 = 29;
    pub const DROP_TARGET_RESET_3: u8 = 30;
    pub const SHOOT: u8 = 31;
    pub const SHOOT_2: u8 = 32;
    pub const BONUS_AWARDED: u8 = 33;
    pub const SECRET_MISSION_SELECTED: u8 = 34;
    pub const MISSION_COMPLETE_PROMOTION: u8 = 35;
    pub const WORMHOLE_OPEN_LIGHT: u8 = 36;
    pub const BLACK_HOLE_RELEASE: u8 = 37;
    pub const SHOOT_3: u8 = 38;
    pub const FLIPPER_3: u8 = 39;
    pub const FLIPPER_4: u8 = 40;
    pub const TILT: u8 = 41;
    pub const SPINNER: u8 = 42;

    /// Variants played after a drop-target bank resets.
    pub const DROP_TARGET_RESET_VARIANTS: [u8; 3] =
        [DROP_TARGET_RESET, DROP_TARGET_RESET_2, DROP_TARGET_RESET_3];

    /// Hyperspace launch sound per combo value.
    pub const HYPERSPACE: [u8; super::HYPERSPACE_LEVELS] = [
        HYPERSPACE_LAUNCH,
        HYPERSPACE_LAUNCH,
        HYPERSPACE_JACKPOT,
        HYPERSPACE_EXTRA_BALL,
        HYPERSPACE_GRAVITY_WELL,
    ];
}

/// Location of a lamp: which AW9523 expander and which of its 16 pins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LampPin {
    pub device: u8,
    pub pin: u8,
}

const fn lamp(device: u8, pin: u8) -> LampPin {
    LampPin { device, pin }
}

/// A playfield lamp, as an index into [`LAMP_PINS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Light(u8);

const MISSION_BASE: u8 = 8;
const DROP_TARGET_BASE: u8 = MISSION_BASE + MISSION_BUTTONS as u8;
const MULTIPLIER_BASE: u8 = DROP_TARGET_BASE + DROP_TARGETS as u8;
const REENTRY_BASE: u8 = MULTIPLIER_BASE + 4;
const HYPERSPACE_BASE: u8 = REENTRY_BASE + REENTRY_LANES as u8;

pub const LIGHT_COUNT: usize = HYPERSPACE_BASE as usize + HYPERSPACE_LEVELS;

impl Light {
    pub const BALL_DEPLOY: Light = Light(0);
    pub const EXTRA_BALL: Light = Light(1);
    pub const CENTER_POST: Light = Light(2);
    pub const SHIP: Light = Light(3);
    pub const MISSION_ARROW: Light = Light(4);
    pub const NEW_GAME: Light = Light(5);
    pub const FLIPPER_LEFT: Light = Light(6);
    pub const FLIPPER_RIGHT: Light = Light(7);

    /// Index clamps to the last mission button.
    pub const fn mission(n: usize) -> Light {
        Light(MISSION_BASE + clamp(n, MISSION_BUTTONS))
    }

    pub const fn drop_target(n: usize) -> Light {
        Light(DROP_TARGET_BASE + clamp(n, DROP_TARGETS))
    }

    /// Lamp for multiplier `m` (x2..=x5); x1 has no lamp and clamps to x2.
    pub const fn multiplier(m: u8) -> Light {
        let m = if m < 2 { 2 } else { m };
        Light(MULTIPLIER_BASE + clamp((m - 2) as usize, 4))
    }

    pub const fn reentry(n: usize) -> Light {
        Light(REENTRY_BASE + clamp(n, REENTRY_LANES))
    }

    pub const fn hyperspace(n: usize) -> Light {
        Light(HYPERSPACE_BASE + clamp(n, HYPERSPACE_LEVELS))
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn pin(self) -> LampPin {
        LAMP_PINS[self.0 as usize]
    }

    pub fn all() -> impl Iterator<Item = Light> {
        (0..LIGHT_COUNT as u8).map(Light)
    }
}

const fn clamp(n: usize, len: usize) -> u8 {
    if n >= len { (len - 1) as u8 } else { n as u8 }
}

/// Lamp wiring. Expander 0 sits at 0x58, expander 1 at 0x59.
pub const LAMP_PINS: [LampPin; LIGHT_COUNT] = [
    // Ball deploy, extra ball, center post, ship, mission arrow, new game
    lamp(0, 0),
    lamp(0, 1),
    lamp(0, 2),
    lamp(0, 3),
    lamp(0, 4),
    lamp(0, 5),
    // Flippers
    lamp(0, 6),
    lamp(0, 7),
    // Mission select 0..2
    lamp(0, 8),
    lamp(0, 9),
    lamp(0, 10),
    // Drop targets 0..2
    lamp(0, 11),
    lamp(0, 12),
    lamp(0, 13),
    // Multiplier x2..x5
    lamp(1, 0),
    lamp(1, 1),
    lamp(1, 2),
    lamp(1, 3),
    // Re-entry lanes 0..2
    lamp(1, 4),
    lamp(1, 5),
    lamp(1, 6),
    // Hyperspace bars, bottom to top
    lamp(1, 8),
    lamp(1, 9),
    lamp(1, 10),
    lamp(1, 11),
    lamp(1, 12),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_tags() {
        assert_eq!(Command::parse("HYP"), Ok(Command::Hyperspace));
        assert_eq!(Command::parse("PB"), Ok(Command::PopBumper));
        assert_eq!(Command::parse("  SLG  "), Ok(Command::Slingshot));
        assert_eq!(Command::parse("FRD"), Ok(Command::RightFlipperDown));
    }

    #[test]
    fn parses_arguments() {
        assert_eq!(Command::parse("BTN 2"), Ok(Command::MissionButton(2)));
        assert_eq!(Command::parse("DT 0"), Ok(Command::DropTarget(0)));
        assert_eq!(Command::parse("IR 1 extra"), Ok(Command::Reentry(1)));
        assert_eq!(
            Command::parse("INI soundController"),
            Ok(Command::BoardReady(Board::SoundController))
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(Command::parse(""), Err(ParseError::Empty));
        assert_eq!(Command::parse("hyp"), Err(ParseError::UnknownTag));
        assert_eq!(Command::parse("XYZ 1"), Err(ParseError::UnknownTag));
        assert_eq!(
            Command::parse("BTN"),
            Err(ParseError::MissingArgument(Tag::MissionButton))
        );
        assert_eq!(
            Command::parse("DT x"),
            Err(ParseError::InvalidArgument(Tag::DropTarget))
        );
        assert_eq!(
            Command::parse("INI toaster"),
            Err(ParseError::InvalidArgument(Tag::BoardReady))
        );
    }

    #[test]
    fn tag_names_match_wire_tokens() {
        for token in ["HYP", "DRN", "DTR", "BTN", "INI", "IR", "DT", "PB", "SLG", "FLU", "FLD", "FRU", "FRD"] {
            assert_eq!(Tag::parse(token).map(Tag::as_str), Some(token));
        }
    }

    #[test]
    fn encodes_outbound_messages() {
        assert_eq!(Message::MissionCount(2).encode().as_str(), "MSN 2");
        assert_eq!(Message::Rank(4).encode().as_str(), "RNK 4");
        assert_eq!(Message::Sound(sound::WORMHOLE).encode().as_str(), "SND 29");
        assert_eq!(Message::Reload.encode().as_str(), "RLD");
        assert_eq!(Message::Reload.destinations(), &[Peer::Solenoid]);
        assert_eq!(Message::Accepted.destinations(), &[Peer::Sound]);
        assert_eq!(Message::Reset.destinations(), &[Peer::Solenoid, Peer::Sound]);
    }

    #[test]
    fn lamp_indices_are_distinct_and_clamped() {
        assert_eq!(Light::mission(7), Light::mission(MISSION_BUTTONS - 1));
        assert_eq!(Light::multiplier(1), Light::multiplier(2));
        assert_eq!(Light::multiplier(9), Light::multiplier(5));
        assert_eq!(Light::hyperspace(HYPERSPACE_LEVELS - 1).index(), LIGHT_COUNT - 1);

        for (i, a) in LAMP_PINS.iter().enumerate() {
            for b in &LAMP_PINS[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
