//! Lamp animation scheduler.
//!
//! Tracks independent blink animations and advances them once per tick. At
//! most one animation runs per [`Target`]; starting another on the same target
//! replaces it. Completion actions are plain data ([`Completion`]) handed back
//! to the caller, which applies them to the game.

use heapless::Vec;

use crate::config::MAX_ANIMATIONS;
use crate::lamps::Lamps;
use crate::protocol::{DROP_TARGETS, Light, REENTRY_LANES};
use crate::{Duration, Instant};

/// Lamps that animate together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Group {
    Reentry,
    DropTargets,
}

impl Group {
    pub fn lights(self) -> impl Iterator<Item = Light> {
        let (count, light): (usize, fn(usize) -> Light) = match self {
            Group::Reentry => (REENTRY_LANES, Light::reentry),
            Group::DropTargets => (DROP_TARGETS, Light::drop_target),
        };
        (0..count).map(light)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    Single(Light),
    Group(Group),
}

impl From<Light> for Target {
    fn from(light: Light) -> Self {
        Target::Single(light)
    }
}

impl From<Group> for Target {
    fn from(group: Group) -> Self {
        Target::Group(group)
    }
}

impl Target {
    fn set(self, lamps: &mut Lamps, on: bool) {
        match self {
            Target::Single(light) => lamps.set(light, on),
            Target::Group(group) => group.lights().for_each(|light| lamps.set(light, on)),
        }
    }
}

/// What to do once an animation ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Completion {
    /// Drop the hyperspace combo one level.
    DecrementHyperspace,
    /// The center post has retracted; ball save is over.
    ClearRedeploy,
    /// Restore each re-entry lamp to its lane state.
    ResetReentryLights,
    /// Restore each drop-target lamp: lit while the target stands.
    ResetDropTargetLights,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Blinks {
    Count(u16),
    /// Runs until cancelled.
    Forever,
}

#[derive(Clone, Copy, Debug)]
pub struct Animation {
    pub target: Target,
    pub remaining: Blinks,
    pub period: Duration,
    pub final_state: bool,
    pub on_complete: Option<Completion>,
    lit: bool,
    last_toggle: Instant,
}

pub type Completions = Vec<Completion, MAX_ANIMATIONS>;

#[derive(Default)]
pub struct Animator {
    active: Vec<Animation, MAX_ANIMATIONS>,
}

impl Animator {
    pub const fn new() -> Self {
        Self { active: Vec::new() }
    }

    /// Starts blinking `target`, lit from `now`. Each elapsed `period` toggles
    /// the target and uses up one blink; once none remain the target is set
    /// to `final_state` and `on_complete` is reported by [`Animator::tick`].
    ///
    /// Returns the completion of the animation this one replaced, if any, so
    /// the caller can run or suppress it.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        lamps: &mut Lamps,
        now: Instant,
        target: impl Into<Target>,
        blinks: Blinks,
        period: Duration,
        final_state: bool,
        on_complete: Option<Completion>,
    ) -> Option<Completion> {
        let target = target.into();
        let replaced = self.cancel(target);

        target.set(lamps, true);
        let animation = Animation {
            target,
            remaining: blinks,
            period,
            final_state,
            on_complete,
            lit: true,
            last_toggle: now,
        };
        if self.active.push(animation).is_err() {
            error!("animation table full, dropping {}", target);
            target.set(lamps, final_state);
        }
        replaced
    }

    /// Stops the animation on `target`, leaving its lamps as they are.
    ///
    /// Returns its completion so the caller can run or suppress it.
    pub fn cancel(&mut self, target: impl Into<Target>) -> Option<Completion> {
        let target = target.into();
        let pos = self.active.iter().position(|a| a.target == target)?;
        self.active.swap_remove(pos).on_complete
    }

    /// Stops every animation without reporting completions.
    pub fn cancel_all(&mut self) {
        self.active.clear();
    }

    pub fn is_active(&self, target: impl Into<Target>) -> bool {
        let target = target.into();
        self.active.iter().any(|a| a.target == target)
    }

    pub fn get(&self, target: impl Into<Target>) -> Option<&Animation> {
        let target = target.into();
        self.active.iter().find(|a| a.target == target)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Advances every animation to `now` and returns the completions of the
    /// ones that finished.
    pub fn tick(&mut self, lamps: &mut Lamps, now: Instant) -> Completions {
        let mut done = Completions::new();
        self.active.retain_mut(|a| {
            if a.remaining == Blinks::Count(0) {
                a.target.set(lamps, a.final_state);
                if let Some(completion) = a.on_complete {
                    // Capacity matches the animation table, so this cannot overflow.
                    let _ = done.push(completion);
                }
                return false;
            }
            if now >= a.last_toggle + a.period {
                a.lit = !a.lit;
                a.target.set(lamps, a.lit);
                a.last_toggle = now;
                if let Blinks::Count(n) = &mut a.remaining {
                    *n -= 1;
                }
            }
            true
        });
        done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_ticks(ms * 1_000)
    }

    const PERIOD: Duration = Duration::millis(100);

    #[test]
    fn blinks_then_settles_and_completes() {
        let mut lamps = Lamps::new();
        let mut anim = Animator::new();
        anim.start(
            &mut lamps,
            at(0),
            Light::SHIP,
            Blinks::Count(2),
            PERIOD,
            false,
            Some(Completion::ClearRedeploy),
        );
        assert!(lamps.is_on(Light::SHIP));

        assert!(anim.tick(&mut lamps, at(50)).is_empty());
        assert!(lamps.is_on(Light::SHIP));

        assert!(anim.tick(&mut lamps, at(100)).is_empty());
        assert!(!lamps.is_on(Light::SHIP));

        assert!(anim.tick(&mut lamps, at(200)).is_empty());
        assert!(lamps.is_on(Light::SHIP));

        let done = anim.tick(&mut lamps, at(210));
        assert_eq!(done.as_slice(), &[Completion::ClearRedeploy]);
        assert!(!lamps.is_on(Light::SHIP));
        assert!(anim.is_empty());
    }

    #[test]
    fn restart_replaces_and_reports_old_completion() {
        let mut lamps = Lamps::new();
        let mut anim = Animator::new();
        let first = anim.start(
            &mut lamps,
            at(0),
            Light::CENTER_POST,
            Blinks::Count(4),
            PERIOD,
            false,
            Some(Completion::ClearRedeploy),
        );
        assert_eq!(first, None);

        let replaced = anim.start(
            &mut lamps,
            at(10),
            Light::CENTER_POST,
            Blinks::Count(8),
            PERIOD,
            true,
            None,
        );
        assert_eq!(replaced, Some(Completion::ClearRedeploy));
        assert_eq!(anim.len(), 1);
        assert_eq!(anim.get(Light::CENTER_POST).map(|a| a.remaining), Some(Blinks::Count(8)));
    }

    #[test]
    fn forever_never_completes_on_its_own() {
        let mut lamps = Lamps::new();
        let mut anim = Animator::new();
        anim.start(&mut lamps, at(0), Light::MISSION_ARROW, Blinks::Forever, PERIOD, false, None);

        for step in 1..500 {
            assert!(anim.tick(&mut lamps, at(step * 100)).is_empty());
        }
        assert!(anim.is_active(Light::MISSION_ARROW));

        assert_eq!(anim.cancel(Light::MISSION_ARROW), None);
        assert!(!anim.is_active(Light::MISSION_ARROW));
    }

    #[test]
    fn cancel_returns_completion_once() {
        let mut lamps = Lamps::new();
        let mut anim = Animator::new();
        anim.start(
            &mut lamps,
            at(0),
            Group::Reentry,
            Blinks::Count(1),
            PERIOD,
            false,
            Some(Completion::ResetReentryLights),
        );

        assert_eq!(anim.cancel(Group::Reentry), Some(Completion::ResetReentryLights));
        assert_eq!(anim.cancel(Group::Reentry), None);
        assert!(anim.tick(&mut lamps, at(1_000)).is_empty());
    }

    #[test]
    fn group_drives_every_member() {
        let mut lamps = Lamps::new();
        let mut anim = Animator::new();
        anim.start(&mut lamps, at(0), Group::DropTargets, Blinks::Count(1), PERIOD, true, None);
        assert!(Group::DropTargets.lights().all(|l| lamps.is_on(l)));

        anim.tick(&mut lamps, at(100));
        assert!(Group::DropTargets.lights().all(|l| !lamps.is_on(l)));

        anim.tick(&mut lamps, at(101));
        assert!(Group::DropTargets.lights().all(|l| lamps.is_on(l)));
        assert!(anim.is_empty());
    }
}
