//! ST7789 score display, 240x320 portrait, over SPI.
//!
//! Draws the three text fields the game produces and mirrors each new status
//! message to the USB console.

use defmt::warn;
use embedded_graphics::{
    mono_font::{
        MonoTextStyle,
        ascii::{FONT_6X10, FONT_10X20},
    },
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::Text,
};
use static_cell::StaticCell;

use cadet_display::scoreboard::Scoreboard;

use crate::hardware::{Backlight, DisplayDc, DisplayReset, DisplaySpi, Timer};
use crate::usb_console;

type Interface = mipidsi::interface::SpiInterface<'static, DisplaySpi, DisplayDc>;
type Panel = mipidsi::Display<Interface, mipidsi::models::ST7789, DisplayReset>;

const WIDTH: u32 = 240;
const HEIGHT: u32 = 320;

const SCORE_AREA: Rectangle = Rectangle::new(Point::new(0, 40), Size::new(WIDTH, 30));
const BALL_AREA: Rectangle = Rectangle::new(Point::new(0, 100), Size::new(WIDTH, 30));
const STATUS_AREA: Rectangle = Rectangle::new(Point::new(0, 160), Size::new(WIDTH, HEIGHT - 160));

pub struct Screen {
    panel: Panel,
    _backlight: Backlight,
}

pub fn init(
    spi: DisplaySpi,
    dc: DisplayDc,
    reset: DisplayReset,
    backlight: Backlight,
    delay: &mut Timer,
) -> Screen {
    static BUFFER: StaticCell<[u8; 512]> = StaticCell::new();
    let buffer = BUFFER.init([0; 512]);
    let di = mipidsi::interface::SpiInterface::new(spi, dc, buffer);

    let mut panel = mipidsi::Builder::new(mipidsi::models::ST7789, di)
        .reset_pin(reset)
        .display_size(WIDTH as u16, HEIGHT as u16)
        .invert_colors(mipidsi::options::ColorInversion::Inverted)
        .orientation(mipidsi::options::Orientation::new().rotate(mipidsi::options::Rotation::Deg180))
        .init(delay)
        .unwrap();
    let _ = panel.clear(Rgb565::BLACK);

    let label = MonoTextStyle::new(&FONT_6X10, Rgb565::CSS_LIGHT_GRAY);
    let _ = Text::new("SCORE", Point::new(10, 30), label).draw(&mut panel);
    let _ = Text::new("BALL", Point::new(10, 90), label).draw(&mut panel);

    Screen {
        panel,
        _backlight: backlight,
    }
}

impl Screen {
    fn draw_field(&mut self, area: Rectangle, text: &str, color: Rgb565) {
        let style = MonoTextStyle::new(&FONT_10X20, color);
        let cleared = area
            .into_styled(PrimitiveStyle::with_fill(Rgb565::BLACK))
            .draw(&mut self.panel);
        let drawn = Text::new(text, area.top_left + Point::new(10, 20), style).draw(&mut self.panel);
        if cleared.is_err() || drawn.is_err() {
            warn!("display write failed");
        }
    }
}

impl Scoreboard for Screen {
    fn show_score(&mut self, score: &str) {
        self.draw_field(SCORE_AREA, score, Rgb565::CSS_GOLD);
    }

    fn show_ball(&mut self, ball: &str) {
        self.draw_field(BALL_AREA, ball, Rgb565::WHITE);
    }

    fn show_status(&mut self, status: &str) {
        self.draw_field(STATUS_AREA, status, Rgb565::CSS_LIGHT_SKY_BLUE);
        usb_console::write_line(status);
    }
}
