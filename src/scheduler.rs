//! Cooperative tick loop.
//!
//! One [`Scheduler::tick`] services every input and output once, in a fixed
//! order, against a single `now`. Nothing in here blocks: the caller decides
//! the cadence (the firmware calls it back to back).

use embedded_hal::digital::InputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::Instant;
use crate::button::Debouncer;
use crate::config::BUTTON_DEBOUNCE;
use crate::game::Game;
use crate::lamps::LightBank;
use crate::protocol::Peer;
use crate::scoreboard::Scoreboard;
use crate::servo::Servo;
use crate::transport::{LineChannel, SerialPort};

/// Everything the game talks to.
pub struct Peripherals<A, B, P, L, D, S> {
    pub solenoid: A,
    pub sound: B,
    pub new_game_button: P,
    pub lights: L,
    pub display: D,
    pub servo: S,
}

pub struct Scheduler<A, B, P, L, D, S> {
    game: Game,
    solenoid: LineChannel<A>,
    sound: LineChannel<B>,
    button: Debouncer<P>,
    lights: L,
    display: D,
    servo: Servo<S>,
}

impl<A, B, P, L, D, S> Scheduler<A, B, P, L, D, S>
where
    A: SerialPort,
    B: SerialPort,
    P: InputPin,
    L: LightBank,
    D: Scoreboard,
    S: SetDutyCycle,
{
    pub fn new(now: Instant, seed: u32, peripherals: Peripherals<A, B, P, L, D, S>) -> Self {
        Self {
            game: Game::new(now, seed),
            solenoid: LineChannel::new(Peer::Solenoid, peripherals.solenoid),
            sound: LineChannel::new(Peer::Sound, peripherals.sound),
            button: Debouncer::new(peripherals.new_game_button, BUTTON_DEBOUNCE),
            lights: peripherals.lights,
            display: peripherals.display,
            servo: Servo::new(peripherals.servo),
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn lights(&self) -> &L {
        &self.lights
    }

    pub fn solenoid_port(&mut self) -> &mut A {
        self.solenoid.port_mut()
    }

    pub fn sound_port(&mut self) -> &mut B {
        self.sound.port_mut()
    }

    /// Runs one iteration of the loop:
    ///
    /// 1. every buffered line from the solenoid driver
    /// 2. every buffered line from the sound controller
    /// 3. lamp animations
    /// 4. one-shot timers and the ship servo
    /// 5. the new-game button
    /// 6. the deferred status message
    ///
    /// and then pushes queued messages, changed lamps, the scoreboard and any
    /// servo command out to the hardware.
    pub fn tick(&mut self, now: Instant) {
        self.game.begin_tick(now);

        while let Some(line) = self.solenoid.receive_line() {
            self.game.handle_line(Peer::Solenoid, &line);
            self.flush_messages();
        }
        while let Some(line) = self.sound.receive_line() {
            self.game.handle_line(Peer::Sound, &line);
            self.flush_messages();
        }

        self.game.advance_lights();
        self.game.service_timers();
        if let Some(edge) = self.button.update(now) {
            self.game.on_new_game_button(edge);
        }
        self.game.deliver_status();

        self.flush_messages();
        self.game.lamps_mut().flush(&mut self.lights);
        self.game.render(&mut self.display);
        if let Some(command) = self.game.take_servo_command() {
            self.servo.apply(command);
        }
    }

    /// Sends queued messages to their peers. Flushed after every inbound
    /// line so a burst cannot overrun the outbox.
    fn flush_messages(&mut self) {
        while let Some(message) = self.game.pop_outbound() {
            let line = message.encode();
            for peer in message.destinations() {
                match peer {
                    Peer::Solenoid => self.solenoid.send(&line),
                    Peer::Sound => self.sound.send(&line),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Duration;
    use crate::game::Mode;
    use crate::lamps::tests::RecordingBank;
    use crate::protocol::{LIGHT_COUNT, Light};
    use crate::scoreboard::tests::TextScoreboard;
    use crate::transport::tests::LoopbackPort;
    use core::cell::Cell;
    use core::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone)]
    struct SharedPin(Rc<Cell<bool>>);

    impl embedded_hal::digital::ErrorType for SharedPin {
        type Error = Infallible;
    }

    impl InputPin for SharedPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0.get())
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0.get())
        }
    }

    struct NullPwm;

    impl embedded_hal::pwm::ErrorType for NullPwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for NullPwm {
        fn max_duty_cycle(&self) -> u16 {
            20_000
        }

        fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), Infallible> {
            Ok(())
        }
    }

    type TestScheduler =
        Scheduler<LoopbackPort, LoopbackPort, SharedPin, RecordingBank, TextScoreboard, NullPwm>;

    fn at(ms: u64) -> Instant {
        Instant::from_ticks(ms * 1_000)
    }

    fn scheduler(button: &Rc<Cell<bool>>) -> TestScheduler {
        Scheduler::new(
            at(0),
            7,
            Peripherals {
                solenoid: LoopbackPort::default(),
                sound: LoopbackPort::default(),
                new_game_button: SharedPin(button.clone()),
                lights: RecordingBank::default(),
                display: TextScoreboard::default(),
                servo: NullPwm,
            },
        )
    }

    #[test]
    fn handshake_over_both_links() {
        let button = Rc::new(Cell::new(true));
        let mut s = scheduler(&button);
        s.tick(at(0));
        assert_eq!(s.lights().writes.len(), LIGHT_COUNT);
        assert_eq!(s.display().status, "Starting Up");

        s.solenoid_port().feed("INI solenoidDriver\r\n");
        s.sound_port().feed("INI soundController\r\n");
        s.tick(at(1));

        assert_eq!(s.game().mode(), Mode::BallLaunch);
        assert_eq!(s.solenoid_port().sent_lines(), ["RLD"]);
        assert!(s.sound_port().sent_lines().is_empty());
        assert_eq!(s.display().ball, "1");
        assert!(s.lights().writes.contains(&(Light::BALL_DEPLOY, 255)));
    }

    #[test]
    fn burst_of_lines_drained_in_one_tick() {
        let button = Rc::new(Cell::new(true));
        let mut s = scheduler(&button);
        s.solenoid_port().feed("INI solenoidDriver\r\nIR 0\r\n");
        s.sound_port().feed("INI soundController\r\n");
        s.tick(at(0));
        // IR arrived before the sound board was ready, so it scored nothing.
        assert_eq!(s.game().state().score(), 0);

        for _ in 0..40 {
            s.solenoid_port().feed("PB\r\n");
        }
        s.tick(at(1));
        assert_eq!(s.game().state().score(), 40 * 100);
        assert_eq!(s.display().score, "4000");
        // Skip-over acknowledgement from the first bumper.
        assert_eq!(s.sound_port().sent_lines(), ["PNT"]);
    }

    #[test]
    fn reset_reaches_both_peers() {
        let button = Rc::new(Cell::new(true));
        let mut s = scheduler(&button);
        s.solenoid_port().feed("INI solenoidDriver\r\n");
        s.sound_port().feed("INI soundController\r\n");
        s.tick(at(0));

        let mut now = at(0);
        let mut tick = |s: &mut TestScheduler, ms: u64| {
            let end = now + Duration::millis(ms);
            while now < end {
                now = now + Duration::millis(5);
                s.tick(now);
            }
        };

        // Three balls, each launched, saved once by the center post timer
        // running out, then drained.
        for _ in 0..3 {
            s.solenoid_port().feed("IR 0\r\n");
            tick(&mut s, 12_000);
            s.solenoid_port().feed("DRN\r\n");
            tick(&mut s, 3_100);
        }
        assert_eq!(s.game().mode(), Mode::GameOver);
        assert!(s.sound_port().sent_lines().contains(&"GOV".to_string()));
        s.solenoid_port().tx.clear();
        s.sound_port().tx.clear();

        button.set(false);
        tick(&mut s, 50);
        assert_eq!(s.game().mode(), Mode::BallLaunch);
        assert_eq!(s.solenoid_port().sent_lines(), ["RST", "RLD"]);
        assert_eq!(s.sound_port().sent_lines(), ["RST"]);
        assert_eq!(s.display().score, "0");
    }
}
