//! AW9523 I/O expander in constant-current LED mode.
//!
//! Two expanders on one I2C bus drive every playfield lamp. Each of the 16
//! pins has its own 8-bit dimmer register; the register order does not follow
//! the pin order, see [`dimmer_register`].

use embedded_hal::i2c::I2c;

use crate::lamps::LightBank;
use crate::protocol::Light;

/// 7-bit address with AD0 and AD1 low.
pub const BASE_ADDRESS: u8 = 0x58;

const CHIP_ID: u8 = 0x23;
const PINS: u8 = 16;

mod reg {
    pub const CONFIG_P0: u8 = 0x04;
    pub const CONFIG_P1: u8 = 0x05;
    pub const ID: u8 = 0x10;
    pub const CONTROL: u8 = 0x11;
    pub const LED_MODE_P0: u8 = 0x12;
    pub const LED_MODE_P1: u8 = 0x13;
    pub const SOFT_RESET: u8 = 0x7F;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Aw9523Error<E> {
    I2c(E),
    /// ID register did not read back 0x23.
    BadChipId(u8),
    /// Pin index above 15.
    InvalidPin(u8),
    /// Lamp wired to an expander that is not on the bank.
    NoDevice(u8),
}

/// Dimmer register for pin `pin` (0..=7 is port 0, 8..=15 is port 1).
pub const fn dimmer_register(pin: u8) -> Option<u8> {
    match pin {
        0..=7 => Some(0x24 + pin),
        8..=11 => Some(0x20 + (pin - 8)),
        12..=15 => Some(0x2C + (pin - 12)),
        _ => None,
    }
}

pub struct Aw9523<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Aw9523<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Checks the chip ID, resets the chip and puts all 16 pins in LED mode
    /// with every lamp off.
    pub fn init(&mut self) -> Result<(), Aw9523Error<I::Error>> {
        let mut id = [0u8];
        self.i2c
            .write_read(self.address, &[reg::ID], &mut id)
            .map_err(Aw9523Error::I2c)?;
        if id[0] != CHIP_ID {
            return Err(Aw9523Error::BadChipId(id[0]));
        }

        self.write(reg::SOFT_RESET, 0x00)?;
        self.write(reg::LED_MODE_P0, 0x00)?;
        self.write(reg::LED_MODE_P1, 0x00)?;
        self.write(reg::CONFIG_P0, 0x00)?;
        self.write(reg::CONFIG_P1, 0x00)?;
        // Push-pull port 0, full current range.
        self.write(reg::CONTROL, 0x10)?;
        for pin in 0..PINS {
            self.set_level(pin, 0)?;
        }
        Ok(())
    }

    /// Sets the LED current of `pin`, 0 = off, 255 = maximum.
    pub fn set_level(&mut self, pin: u8, level: u8) -> Result<(), Aw9523Error<I::Error>> {
        let register = dimmer_register(pin).ok_or(Aw9523Error::InvalidPin(pin))?;
        self.write(register, level)
    }

    pub fn release(self) -> I {
        self.i2c
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), Aw9523Error<I::Error>> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(Aw9523Error::I2c)
    }
}

/// The playfield lamps, spread across two expanders.
pub struct ExpanderBank<I> {
    expanders: [Aw9523<I>; 2],
}

impl<I: I2c> ExpanderBank<I> {
    /// `first` drives lamps on device 0, `second` those on device 1.
    pub fn new(first: Aw9523<I>, second: Aw9523<I>) -> Self {
        Self {
            expanders: [first, second],
        }
    }

    pub fn init(&mut self) -> Result<(), Aw9523Error<I::Error>> {
        for expander in &mut self.expanders {
            expander.init()?;
            info!("AW9523 at {=u8:#x} ready", expander.address());
        }
        Ok(())
    }
}

impl<I: I2c> LightBank for ExpanderBank<I> {
    type Error = Aw9523Error<I::Error>;

    fn set(&mut self, light: Light, level: u8) -> Result<(), Self::Error> {
        let pin = light.pin();
        let expander = self
            .expanders
            .get_mut(usize::from(pin.device))
            .ok_or(Aw9523Error::NoDevice(pin.device))?;
        expander.set_level(pin.pin, level)
    }
}
