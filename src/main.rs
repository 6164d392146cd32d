//! SPDX-License-Identifier: MIT OR Apache-2.0
//!
//! # Cadet Pinball Display Controller
//!
//! Firmware for the display board of the three-board pinball machine:
//! - **Hardware Module:** HAL bring-up for the peer UARTs, lamp expanders,
//!   display, servo and button (`hardware.rs`).
//! - **USB Module:** status text mirrored over USB CDC (`usb_console.rs`).
//! - **Display Module:** score, ball and status on the ST7789 (`display.rs`).
//! - **Game:** the `cadet_display` scheduler, ticked as fast as the loop runs.
//!
//! Target: Raspberry Pi Pico 2 (RP2350).

#![no_std]
#![no_main]

// --- Imports ---
use defmt::*;
use defmt_rtt as _;
use panic_probe as _;

use cadet_display::{Peripherals, Scheduler, protocol::PROTOCOL_VERSION};

// --- Modules ---
mod display;
mod hardware;
mod usb_console;

// --- HAL Selection ---
use rp235x_hal as hal;
use hal::entry;

// --- Bootloader Configuration ---

#[unsafe(link_section = ".start_block")]
#[used]
pub static IMAGE_DEF: hal::block::ImageDef = hal::block::ImageDef::secure_exe();

/// Entry point.
#[entry]
fn main() -> ! {
    info!("Display controller start, protocol v{}", PROTOCOL_VERSION);

    // 1. Initialize Hardware Stack (Clocks, UARTs, I2C, SPI, PWM, USB)
    let hw = hardware::init();

    // 2. Initialize the game
    let now = hw.timer.get_counter();
    let seed = now.ticks() as u32;
    let mut scheduler = Scheduler::new(
        now,
        seed,
        Peripherals {
            solenoid: hw.solenoid,
            sound: hw.sound,
            new_game_button: hw.button,
            lights: hw.lamps,
            display: hw.screen,
            servo: hw.servo,
        },
    );

    // 3. Main Application Loop
    loop {
        scheduler.tick(hw.timer.get_counter());
    }
}

// --- Metadata ---

#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [hal::binary_info::EntryAddr; 4] = [
    hal::binary_info::rp_cargo_bin_name!(),
    hal::binary_info::rp_cargo_version!(),
    hal::binary_info::rp_program_description!(c"Cadet pinball display controller"),
    hal::binary_info::rp_program_build_attribute!()
];
