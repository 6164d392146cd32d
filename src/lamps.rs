//! Lamp frame buffer.
//!
//! Game logic writes lamp levels into an in-memory frame; [`Lamps::flush`]
//! pushes only the lamps that changed since the last flush to the hardware.

use crate::protocol::{LIGHT_COUNT, Light};

pub const LAMP_ON: u8 = 255;
pub const LAMP_OFF: u8 = 0;

/// Lamp output hardware.
pub trait LightBank {
    type Error: core::fmt::Debug;

    /// Drives `light` at `level` (0 = off, 255 = full brightness).
    fn set(&mut self, light: Light, level: u8) -> Result<(), Self::Error>;
}

pub struct Lamps {
    frame: [u8; LIGHT_COUNT],
    dirty: [bool; LIGHT_COUNT],
}

impl Default for Lamps {
    fn default() -> Self {
        Self::new()
    }
}

impl Lamps {
    /// All lamps off, with every lamp marked dirty so the first flush
    /// overwrites whatever the expanders powered up with.
    pub const fn new() -> Self {
        Self {
            frame: [LAMP_OFF; LIGHT_COUNT],
            dirty: [true; LIGHT_COUNT],
        }
    }

    pub fn set_level(&mut self, light: Light, level: u8) {
        let i = light.index();
        if self.frame[i] != level {
            self.frame[i] = level;
            self.dirty[i] = true;
        }
    }

    pub fn set(&mut self, light: Light, on: bool) {
        self.set_level(light, if on { LAMP_ON } else { LAMP_OFF });
    }

    pub fn level(&self, light: Light) -> u8 {
        self.frame[light.index()]
    }

    pub fn is_on(&self, light: Light) -> bool {
        self.level(light) != LAMP_OFF
    }

    pub fn clear(&mut self) {
        for light in Light::all() {
            self.set(light, false);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.iter().any(|d| *d)
    }

    /// Writes changed lamps to `bank`. A lamp whose write fails stays dirty
    /// and is retried on the next flush.
    pub fn flush<B: LightBank>(&mut self, bank: &mut B) {
        for light in Light::all() {
            let i = light.index();
            if !self.dirty[i] {
                continue;
            }
            match bank.set(light, self.frame[i]) {
                Ok(()) => self.dirty[i] = false,
                Err(_e) => {
                    error!("lamp {} write failed", i);
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::vec::Vec;

    /// Records every write; fails writes to `broken` if set.
    #[derive(Default)]
    pub struct RecordingBank {
        pub writes: Vec<(Light, u8)>,
        pub broken: Option<Light>,
    }

    impl LightBank for RecordingBank {
        type Error = ();

        fn set(&mut self, light: Light, level: u8) -> Result<(), ()> {
            if self.broken == Some(light) {
                return Err(());
            }
            self.writes.push((light, level));
            Ok(())
        }
    }

    #[test]
    fn first_flush_writes_every_lamp() {
        let mut lamps = Lamps::new();
        let mut bank = RecordingBank::default();
        lamps.flush(&mut bank);
        assert_eq!(bank.writes.len(), LIGHT_COUNT);
        assert!(!lamps.is_dirty());
    }

    #[test]
    fn flush_sends_only_changes() {
        let mut lamps = Lamps::new();
        lamps.flush(&mut RecordingBank::default());

        lamps.set(Light::SHIP, true);
        lamps.set(Light::BALL_DEPLOY, false);
        let mut bank = RecordingBank::default();
        lamps.flush(&mut bank);

        assert_eq!(bank.writes, [(Light::SHIP, LAMP_ON)]);
    }

    #[test]
    fn failed_write_is_retried() {
        let mut lamps = Lamps::new();
        let mut bank = RecordingBank {
            broken: Some(Light::NEW_GAME),
            ..Default::default()
        };
        lamps.flush(&mut bank);
        assert!(lamps.is_dirty());

        bank.broken = None;
        bank.writes.clear();
        lamps.flush(&mut bank);
        assert_eq!(bank.writes, [(Light::NEW_GAME, LAMP_OFF)]);
    }
}
