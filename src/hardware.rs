//! Hardware Abstraction Module
//!
//! Brings up the RP2350 peripherals the display controller uses and hands
//! them to `main` as one [`Hardware`] struct:
//!
//! - UART0 (GPIO0/1) to the solenoid driver, UART1 (GPIO4/5) to the sound
//!   controller, both at the peer baud rate
//! - I2C0 (GPIO20/21) shared by the two AW9523 lamp expanders
//! - SPI1 (GPIO12/14/15) to the ST7789 score display
//! - PWM slice 0 channel A (GPIO16) for the ship servo
//! - the new-game button on GPIO22, active low
//! - USB CDC console (see [`crate::usb_console`])

use core::cell::RefCell;

use defmt::warn;
use embedded_hal::digital::OutputPin;
use embedded_hal_bus::i2c::RefCellDevice;
use embedded_hal_bus::spi::ExclusiveDevice;
use fugit::RateExtU32;
use static_cell::StaticCell;

use rp235x_hal as hal;
use hal::Clock;
use hal::gpio::bank0::{
    Gpio0, Gpio1, Gpio4, Gpio5, Gpio9, Gpio10, Gpio11, Gpio12, Gpio13, Gpio14, Gpio15, Gpio20,
    Gpio21, Gpio22,
};
use hal::gpio::{
    FunctionI2C, FunctionSio, FunctionSpi, FunctionUart, Pin, PullDown, PullUp, SioInput,
    SioOutput,
};
use hal::pac;
use hal::uart::{DataBits, Enabled, StopBits, UartConfig, UartDevice, UartPeripheral, ValidUartPinout};

use cadet_display::aw9523::{Aw9523, BASE_ADDRESS, ExpanderBank};
use cadet_display::config::{PEER_BAUD_RATE, PEER_TX_QUEUE};
use cadet_display::transport::{SerialPort, TxQueue};

use crate::display::{self, Screen};
use crate::usb_console;

/// External crystal frequency used by the Raspberry Pi Pico 2.
const XTAL_FREQ_HZ: u32 = 12_000_000u32;

/// 150 MHz system clock divided down to a 1 MHz PWM counter.
const SERVO_PWM_DIV: u8 = 150;
/// 20 ms servo frame at 1 MHz.
const SERVO_PWM_TOP: u16 = 19_999;

pub type Timer = hal::Timer<hal::timer::CopyableTimer0>;

type SolenoidPins = (Pin<Gpio0, FunctionUart, PullDown>, Pin<Gpio1, FunctionUart, PullDown>);
type SoundPins = (Pin<Gpio4, FunctionUart, PullDown>, Pin<Gpio5, FunctionUart, PullDown>);

type I2cBus = hal::I2C<
    pac::I2C0,
    (Pin<Gpio20, FunctionI2C, PullUp>, Pin<Gpio21, FunctionI2C, PullUp>),
>;
pub type Lamps = ExpanderBank<RefCellDevice<'static, I2cBus>>;

pub type ButtonPin = Pin<Gpio22, FunctionSio<SioInput>, PullUp>;

pub type ServoChannel =
    hal::pwm::Channel<hal::pwm::Slice<hal::pwm::Pwm0, hal::pwm::FreeRunning>, hal::pwm::A>;

type SpiBus = hal::spi::Spi<
    hal::spi::Enabled,
    pac::SPI1,
    (
        Pin<Gpio15, FunctionSpi, PullDown>,
        Pin<Gpio12, FunctionSpi, PullDown>,
        Pin<Gpio14, FunctionSpi, PullDown>,
    ),
>;
type OutPin<G> = Pin<G, FunctionSio<SioOutput>, PullDown>;
pub type DisplaySpi = ExclusiveDevice<SpiBus, OutPin<Gpio13>, Timer>;
pub type DisplayDc = OutPin<Gpio10>;
pub type DisplayReset = OutPin<Gpio11>;
pub type Backlight = OutPin<Gpio9>;

/// One peer UART link. Writes go through a queue that is topped up into the
/// UART FIFO on every call, so the tick loop never waits on the wire.
pub struct PeerLink<D: UartDevice, P: ValidUartPinout<D>> {
    uart: UartPeripheral<Enabled, D, P>,
    tx: TxQueue<PEER_TX_QUEUE>,
}

impl<D: UartDevice, P: ValidUartPinout<D>> PeerLink<D, P> {
    fn new(uart: UartPeripheral<Enabled, D, P>) -> Self {
        Self {
            uart,
            tx: TxQueue::new(),
        }
    }

    fn pump(&mut self) {
        let uart = &self.uart;
        self.tx.pump(|chunk| match uart.write_raw(chunk) {
            Ok(rest) => chunk.len() - rest.len(),
            Err(_) => 0,
        });
    }
}

impl<D: UartDevice, P: ValidUartPinout<D>> SerialPort for PeerLink<D, P> {
    fn read_byte(&mut self) -> Option<u8> {
        // Polled every tick, which keeps the transmit side moving too.
        self.pump();
        let mut byte = [0u8];
        match self.uart.read_raw(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    fn write_all(&mut self, bytes: &[u8]) {
        if !self.tx.push(bytes) {
            warn!("peer tx queue full, dropping {} bytes", bytes.len());
        }
        self.pump();
    }
}

pub type SolenoidLink = PeerLink<pac::UART0, SolenoidPins>;
pub type SoundLink = PeerLink<pac::UART1, SoundPins>;

/// Everything `main` needs after bring-up.
pub struct Hardware {
    pub timer: Timer,
    pub solenoid: SolenoidLink,
    pub sound: SoundLink,
    pub lamps: Lamps,
    pub button: ButtonPin,
    pub servo: ServoChannel,
    pub screen: Screen,
}

/// Initializes the entire hardware stack.
///
/// This function:
/// 1.  Takes ownership of the raw PAC peripherals.
/// 2.  Configures the Watchdog and Clocks (System & USB).
/// 3.  Initializes the Microsecond Timer.
/// 4.  Configures both peer UARTs.
/// 5.  Brings up the lamp expanders on the shared I2C bus.
/// 6.  Sets up the servo PWM, the button and the display.
/// 7.  Initializes the USB console.
///
/// Any failure here is fatal: there is nothing to fall back to before the
/// main loop starts.
pub fn init() -> Hardware {
    // 1. Take ownership of raw peripherals
    let mut pac = pac::Peripherals::take().unwrap();
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);

    // 2. Configure Clocks
    let clocks = hal::clocks::init_clocks_and_plls(
        XTAL_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();

    // 3. Configure Timer (Microsecond precision)
    let mut timer = hal::Timer::new_timer0(pac.TIMER0, &mut pac.RESETS, &clocks);

    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // 4. Peer links
    let uart_config = || UartConfig::new(PEER_BAUD_RATE.Hz(), DataBits::Eight, None, StopBits::One);
    let solenoid: UartPeripheral<Enabled, pac::UART0, SolenoidPins> = UartPeripheral::new(
        pac.UART0,
        (pins.gpio0.into_function(), pins.gpio1.into_function()),
        &mut pac.RESETS,
    )
    .enable(uart_config(), clocks.peripheral_clock.freq())
    .unwrap();
    let sound: UartPeripheral<Enabled, pac::UART1, SoundPins> = UartPeripheral::new(
        pac.UART1,
        (pins.gpio4.into_function(), pins.gpio5.into_function()),
        &mut pac.RESETS,
    )
    .enable(uart_config(), clocks.peripheral_clock.freq())
    .unwrap();

    // 5. Lamp expanders
    let i2c: I2cBus = hal::I2C::i2c0(
        pac.I2C0,
        pins.gpio20.reconfigure(),
        pins.gpio21.reconfigure(),
        400.kHz(),
        &mut pac.RESETS,
        &clocks.system_clock,
    );
    static I2C_BUS: StaticCell<RefCell<I2cBus>> = StaticCell::new();
    let i2c = I2C_BUS.init(RefCell::new(i2c));
    let mut lamps = ExpanderBank::new(
        Aw9523::new(RefCellDevice::new(i2c), BASE_ADDRESS),
        Aw9523::new(RefCellDevice::new(i2c), BASE_ADDRESS + 1),
    );
    lamps.init().unwrap();

    // 6. Servo, button, display
    let pwm_slices = hal::pwm::Slices::new(pac.PWM, &mut pac.RESETS);
    let mut pwm = pwm_slices.pwm0;
    pwm.set_div_int(SERVO_PWM_DIV);
    pwm.set_top(SERVO_PWM_TOP);
    pwm.enable();
    let mut servo = pwm.channel_a;
    servo.output_to(pins.gpio16);

    let button = pins.gpio22.into_pull_up_input();

    let mut backlight = pins.gpio9.into_push_pull_output();
    let _ = backlight.set_high();
    let spi_bus: SpiBus = hal::spi::Spi::<_, _, _, 8>::new(
        pac.SPI1,
        (
            pins.gpio15.into_function(),
            pins.gpio12.into_function(),
            pins.gpio14.into_function(),
        ),
    )
    .init(
        &mut pac.RESETS,
        clocks.peripheral_clock.freq(),
        32.MHz(),
        embedded_hal::spi::MODE_0,
    );
    let spi = ExclusiveDevice::new(spi_bus, pins.gpio13.into_push_pull_output(), timer).unwrap();
    let screen = display::init(
        spi,
        pins.gpio10.into_push_pull_output(),
        pins.gpio11.into_push_pull_output(),
        backlight,
        &mut timer,
    );

    // 7. Configure USB Serial (via module)
    usb_console::init(
        pac.USB,
        pac.USB_DPRAM,
        clocks.usb_clock,
        &mut pac.RESETS,
    );

    Hardware {
        timer,
        solenoid: PeerLink::new(solenoid),
        sound: PeerLink::new(sound),
        lamps,
        button,
        servo,
        screen,
    }
}
