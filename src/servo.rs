//! Ship model servo.
//!
//! The ship on the playfield drifts to a new random heading every few
//! seconds. Each move stays within a fixed step of the last heading and
//! inside the mechanical limits, and the PWM is released shortly after each
//! move so the servo does not buzz while holding.

use embedded_hal::pwm::SetDutyCycle;

use crate::config::{
    SERVO_HOME_ANGLE, SERVO_MAX_ANGLE, SERVO_MAX_PULSE_US, SERVO_MAX_STEP, SERVO_MIN_ANGLE,
    SERVO_MIN_PULSE_US, SERVO_MOVE_MAX_MS, SERVO_MOVE_MIN_MS, SERVO_PERIOD_US, SERVO_TIMEOUT,
};
use crate::rng::Rng;
use crate::timer::OneShot;
use crate::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServoCommand {
    Angle(u8),
    Release,
}

/// Decides when and where the ship moves.
pub struct ShipMotion {
    angle: u8,
    next_move: Instant,
    shutoff: OneShot,
}

impl ShipMotion {
    pub fn new(now: Instant, rng: &mut Rng) -> Self {
        Self {
            angle: SERVO_HOME_ANGLE,
            next_move: now + next_delay(rng),
            shutoff: OneShot::armed(now + SERVO_TIMEOUT),
        }
    }

    pub fn angle(&self) -> u8 {
        self.angle
    }

    pub fn tick(&mut self, now: Instant, rng: &mut Rng) -> Option<ServoCommand> {
        if now >= self.next_move {
            self.angle = next_angle(self.angle, rng);
            self.next_move = now + next_delay(rng);
            self.shutoff.arm_at(now + SERVO_TIMEOUT);
            debug!("ship servo -> {}", self.angle);
            return Some(ServoCommand::Angle(self.angle));
        }
        if self.shutoff.fire(now) {
            return Some(ServoCommand::Release);
        }
        None
    }
}

fn next_delay(rng: &mut Rng) -> Duration {
    Duration::millis(u64::from(rng.range(SERVO_MOVE_MIN_MS, SERVO_MOVE_MAX_MS)))
}

fn next_angle(current: u8, rng: &mut Rng) -> u8 {
    let lo = current.saturating_sub(SERVO_MAX_STEP).max(SERVO_MIN_ANGLE);
    let hi = current.saturating_add(SERVO_MAX_STEP).min(SERVO_MAX_ANGLE);
    rng.range(u32::from(lo), u32::from(hi)) as u8
}

/// Hobby servo on a 50 Hz PWM channel.
pub struct Servo<P> {
    pwm: P,
}

impl<P: SetDutyCycle> Servo<P> {
    pub fn new(pwm: P) -> Self {
        Self { pwm }
    }

    pub fn apply(&mut self, command: ServoCommand) {
        let duty = match command {
            ServoCommand::Angle(angle) => self.duty_for(angle),
            ServoCommand::Release => 0,
        };
        if self.pwm.set_duty_cycle(duty).is_err() {
            error!("servo duty write failed");
        }
    }

    fn duty_for(&self, angle: u8) -> u16 {
        let angle = u32::from(angle.min(180));
        let pulse = SERVO_MIN_PULSE_US + (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US) * angle / 180;
        let max = u32::from(self.pwm.max_duty_cycle());
        (max * pulse / SERVO_PERIOD_US) as u16
    }

    pub fn into_inner(self) -> P {
        self.pwm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::pwm::ErrorType;

    struct FakePwm {
        duty: u16,
    }

    impl ErrorType for FakePwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for FakePwm {
        fn max_duty_cycle(&self) -> u16 {
            20_000
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.duty = duty;
            Ok(())
        }
    }

    fn at(ms: u64) -> Instant {
        Instant::from_ticks(ms * 1_000)
    }

    #[test]
    fn pulse_width_spans_limits() {
        let mut servo = Servo::new(FakePwm { duty: 1 });
        servo.apply(ServoCommand::Angle(0));
        assert_eq!(servo.pwm.duty, 500);
        servo.apply(ServoCommand::Angle(90));
        assert_eq!(servo.pwm.duty, 1_500);
        servo.apply(ServoCommand::Angle(180));
        assert_eq!(servo.pwm.duty, 2_500);
        servo.apply(ServoCommand::Release);
        assert_eq!(servo.into_inner().duty, 0);
    }

    #[test]
    fn releases_then_moves_within_limits() {
        let mut rng = Rng::new(7);
        let mut ship = ShipMotion::new(at(0), &mut rng);

        assert_eq!(ship.tick(at(500), &mut rng), None);
        assert_eq!(ship.tick(at(1_000), &mut rng), Some(ServoCommand::Release));
        assert_eq!(ship.tick(at(1_001), &mut rng), None);

        let mut now = 1_000;
        let mut last = SERVO_HOME_ANGLE;
        for _ in 0..50 {
            now += 31_000;
            match ship.tick(at(now), &mut rng) {
                Some(ServoCommand::Angle(a)) => {
                    assert!((SERVO_MIN_ANGLE..=SERVO_MAX_ANGLE).contains(&a));
                    assert!(a.abs_diff(last) <= SERVO_MAX_STEP);
                    last = a;
                }
                other => panic!("expected a move, got {:?}", other),
            }
        }
        assert_eq!(ship.angle(), last);
    }
}
