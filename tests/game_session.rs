//! Drives the scheduler over in-memory links the way the two peer boards
//! would, through a full game.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use cadet_display::lamps::LightBank;
use cadet_display::protocol::Light;
use cadet_display::scoreboard::Scoreboard;
use cadet_display::transport::SerialPort;
use cadet_display::{Duration, Instant, Mode, Peripherals, Scheduler};
use embedded_hal::digital::InputPin;
use embedded_hal::pwm::SetDutyCycle;

#[derive(Default)]
struct Wire {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

/// Serial port whose buffers stay reachable from the test after the
/// scheduler takes ownership.
#[derive(Clone, Default)]
struct Link(Rc<RefCell<Wire>>);

impl Link {
    fn send(&self, line: &str) {
        let mut wire = self.0.borrow_mut();
        wire.rx.extend(line.bytes());
        wire.rx.extend(b"\r\n");
    }

    fn take_sent(&self) -> Vec<String> {
        let bytes = std::mem::take(&mut self.0.borrow_mut().tx);
        String::from_utf8(bytes)
            .unwrap()
            .split_terminator("\r\n")
            .map(str::to_string)
            .collect()
    }
}

impl SerialPort for Link {
    fn read_byte(&mut self) -> Option<u8> {
        self.0.borrow_mut().rx.pop_front()
    }

    fn write_all(&mut self, bytes: &[u8]) {
        self.0.borrow_mut().tx.extend_from_slice(bytes);
    }
}

#[derive(Clone, Default)]
struct Panel(Rc<RefCell<[u8; 32]>>);

impl Panel {
    fn is_on(&self, light: Light) -> bool {
        self.0.borrow()[light.index()] != 0
    }
}

impl LightBank for Panel {
    type Error = Infallible;

    fn set(&mut self, light: Light, level: u8) -> Result<(), Infallible> {
        self.0.borrow_mut()[light.index()] = level;
        Ok(())
    }
}

#[derive(Default)]
struct Fields {
    score: String,
    ball: String,
    status: String,
}

#[derive(Clone, Default)]
struct Display(Rc<RefCell<Fields>>);

impl Scoreboard for Display {
    fn show_score(&mut self, score: &str) {
        self.0.borrow_mut().score = score.to_string();
    }

    fn show_ball(&mut self, ball: &str) {
        self.0.borrow_mut().ball = ball.to_string();
    }

    fn show_status(&mut self, status: &str) {
        self.0.borrow_mut().status = status.to_string();
    }
}

#[derive(Clone)]
struct Button(Rc<Cell<bool>>);

impl embedded_hal::digital::ErrorType for Button {
    type Error = Infallible;
}

impl InputPin for Button {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.0.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.0.get())
    }
}

struct Servo;

impl embedded_hal::pwm::ErrorType for Servo {
    type Error = Infallible;
}

impl SetDutyCycle for Servo {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), Infallible> {
        Ok(())
    }
}

struct Machine {
    scheduler: Scheduler<Link, Link, Button, Panel, Display, Servo>,
    solenoid: Link,
    sound: Link,
    button: Rc<Cell<bool>>,
    panel: Panel,
    display: Display,
    now: Instant,
}

impl Machine {
    fn power_on() -> Self {
        let solenoid = Link::default();
        let sound = Link::default();
        let button = Rc::new(Cell::new(true));
        let panel = Panel::default();
        let display = Display::default();
        let now = Instant::from_ticks(0);
        let scheduler = Scheduler::new(
            now,
            0xC0FFEE,
            Peripherals {
                solenoid: solenoid.clone(),
                sound: sound.clone(),
                new_game_button: Button(button.clone()),
                lights: panel.clone(),
                display: display.clone(),
                servo: Servo,
            },
        );
        Self {
            scheduler,
            solenoid,
            sound,
            button,
            panel,
            display,
            now,
        }
    }

    fn run(&mut self, ms: u64) {
        let end = self.now + Duration::millis(ms);
        loop {
            self.scheduler.tick(self.now);
            if self.now >= end {
                break;
            }
            self.now = self.now + Duration::millis(1);
        }
    }

    fn mode(&self) -> Mode {
        self.scheduler.game().mode()
    }

    fn score(&self) -> String {
        self.display.0.borrow().score.clone()
    }

    fn status(&self) -> String {
        self.display.0.borrow().status.clone()
    }
}

#[test]
fn boot_launch_and_accept_a_mission() {
    let mut m = Machine::power_on();
    m.run(5);
    assert_eq!(m.mode(), Mode::Startup);

    m.solenoid.send("INI solenoidDriver");
    m.sound.send("INI soundController");
    m.run(1);
    assert_eq!(m.mode(), Mode::BallLaunch);
    assert!(m.panel.is_on(Light::BALL_DEPLOY));
    assert_eq!(m.solenoid.take_sent(), ["RLD"]);

    m.solenoid.send("IR 0");
    m.run(1);
    assert_eq!(m.mode(), Mode::Playing);
    assert_eq!(m.score(), "100");
    assert!(!m.panel.is_on(Light::BALL_DEPLOY));
    assert_eq!(m.sound.take_sent(), ["SND 18"]);

    m.solenoid.send("BTN 1");
    m.run(1);
    assert_eq!(m.score(), "150");
    assert_eq!(m.status(), "Bumper Assault\n- Enter\nHyperspace to\naccept");

    // A second pick does not override the first.
    m.solenoid.send("BTN 0");
    m.run(1);
    assert_eq!(m.score(), "200");
    assert_eq!(m.status(), "Bumper Assault\n- Enter\nHyperspace to\naccept");

    m.solenoid.send("HYP");
    m.run(1);
    assert_eq!(m.sound.take_sent(), ["ACC"]);
    assert_eq!(m.status(), "Mission\nAccepted");

    m.run(2_100);
    assert_eq!(m.status(), "Hit the Attack\nBumpers 8\ntimes");
}

#[test]
fn three_balls_then_new_game() {
    let mut m = Machine::power_on();
    m.solenoid.send("INI solenoidDriver");
    m.sound.send("INI soundController");
    m.run(1);

    for ball in 1..=3 {
        assert_eq!(m.display.0.borrow().ball, ball.to_string());
        m.solenoid.send("IR 2");
        m.solenoid.send("PB");
        // Outlast the ball save so the drain counts.
        m.run(15_000);
        m.solenoid.send("DRN");
        m.run(3_100);
    }
    assert_eq!(m.mode(), Mode::GameOver);
    assert!(m.sound.take_sent().iter().any(|l| l == "GOV"));
    assert_eq!(m.status(), "Game Over");
    // 3 x (200 + 100) in play, plus the 1000 crash bonus per ball.
    assert_eq!(m.score(), "3900");

    m.solenoid.take_sent();
    m.button.set(false);
    m.run(20);
    m.button.set(true);
    m.run(20);

    assert_eq!(m.mode(), Mode::BallLaunch);
    assert_eq!(m.score(), "0");
    assert_eq!(m.solenoid.take_sent(), ["RST", "RLD"]);
    assert!(!m.panel.is_on(Light::NEW_GAME));
}
