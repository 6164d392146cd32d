//! Authoritative game state and the lamp/status helpers shared by the event
//! handlers. This is the context of the mode state machine; the entry actions
//! at the bottom run when [`ModeFsm`](super::ModeFsm) changes state.

use heapless::Deque;

use crate::config::{
    BALL_DRAINED_DELAY, BLINK_FAST, BLINK_SLOW, BLINKS_CENTER_POST, BLINKS_SHORT,
    DEFAULT_CRASH_BONUS, HYPERSPACE_DECAY, OUTBOX_DEPTH, REDEPLOY_GRACE, STATUS_HOLD,
};
use crate::lamps::Lamps;
use crate::lights::{Animator, Blinks, Completion, Group, Target};
use crate::missions::{self, MissionDefinition};
use crate::protocol::{
    Board, DROP_TARGETS, HYPERSPACE_LEVELS, Light, MISSION_BUTTONS, Message, REENTRY_LANES, sound,
};
use crate::rng::Rng;
use crate::servo::{ServoCommand, ShipMotion};
use crate::status::{self, StatusLine, StatusText};
use crate::timer::OneShot;
use crate::{Duration, Instant};

use super::mode::Mode;

/// Shown when no mission is selected.
pub const DEFAULT_STATUS: &str = "Select a Mission";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MissionStatus {
    None,
    /// Chosen with a mission button, waiting for a hyperspace shot.
    Selected,
    Active,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MissionProgress {
    pub status: MissionStatus,
    pub current: Option<usize>,
    pub hits_left: u16,
}

impl MissionProgress {
    const NONE: Self = Self {
        status: MissionStatus::None,
        current: None,
        hits_left: 0,
    };

    pub fn definition(&self) -> Option<&'static MissionDefinition> {
        self.current.and_then(missions::mission)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct BoardsReady {
    solenoid: bool,
    sound: bool,
}

impl BoardsReady {
    pub(crate) fn mark(&mut self, board: Board) {
        match board {
            Board::SolenoidDriver => self.solenoid = true,
            Board::SoundController => self.sound = true,
        }
    }

    pub(crate) fn all(&self) -> bool {
        self.solenoid && self.sound
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Timers {
    pub(crate) hyperspace_decay: OneShot,
    pub(crate) drop_target_sound: OneShot,
    pub(crate) ball_drained: OneShot,
    pub(crate) redeploy: OneShot,
}

pub struct GameState {
    pub(crate) now: Instant,
    pub(crate) mode: Mode,
    pub(crate) score: u32,
    pub(crate) multiplier: u8,
    pub(crate) ball: u8,
    pub(crate) crash_bonus: u32,
    pub(crate) mission: MissionProgress,
    pub(crate) rank: u8,
    pub(crate) missions_this_rank: u8,
    pub(crate) hyperspace_combo: u8,
    pub(crate) extra_ball: bool,
    /// Ball save: a drain while set redeploys the same ball.
    pub(crate) ball_saver: bool,
    pub(crate) boards: BoardsReady,
    pub(crate) reentry_lit: [bool; REENTRY_LANES],
    pub(crate) drop_targets_down: [bool; DROP_TARGETS],
    pub(crate) reset_sound: u8,
    pub(crate) timers: Timers,
    pub(crate) status: StatusLine,
    pub(crate) lamps: Lamps,
    pub(crate) animator: Animator,
    pub(crate) outbox: Deque<Message, OUTBOX_DEPTH>,
    pub(crate) rng: Rng,
    pub(crate) ship: ShipMotion,
    pub(crate) servo_command: Option<ServoCommand>,
    pub(crate) score_changed: bool,
    pub(crate) ball_changed: bool,
}

impl GameState {
    pub(crate) fn new(now: Instant, seed: u32) -> Self {
        let mut rng = Rng::new(seed);
        let ship = ShipMotion::new(now, &mut rng);
        Self {
            now,
            mode: Mode::Startup,
            score: 0,
            multiplier: 1,
            ball: 1,
            crash_bonus: DEFAULT_CRASH_BONUS,
            mission: MissionProgress::NONE,
            rank: 0,
            missions_this_rank: 0,
            hyperspace_combo: 0,
            extra_ball: false,
            ball_saver: false,
            boards: BoardsReady::default(),
            reentry_lit: [false; REENTRY_LANES],
            drop_targets_down: [false; DROP_TARGETS],
            reset_sound: sound::DROP_TARGET_RESET,
            timers: Timers::default(),
            status: StatusLine::new(),
            lamps: Lamps::new(),
            animator: Animator::new(),
            outbox: Deque::new(),
            rng,
            ship,
            servo_command: None,
            score_changed: true,
            ball_changed: true,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn multiplier(&self) -> u8 {
        self.multiplier
    }

    pub fn ball(&self) -> u8 {
        self.ball
    }

    pub fn crash_bonus(&self) -> u32 {
        self.crash_bonus
    }

    pub fn mission(&self) -> MissionProgress {
        self.mission
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    pub fn missions_this_rank(&self) -> u8 {
        self.missions_this_rank
    }

    pub fn hyperspace_combo(&self) -> u8 {
        self.hyperspace_combo
    }

    pub fn extra_ball(&self) -> bool {
        self.extra_ball
    }

    pub fn ball_saver(&self) -> bool {
        self.ball_saver
    }

    pub fn reentry_lit(&self) -> [bool; REENTRY_LANES] {
        self.reentry_lit
    }

    pub fn drop_targets_down(&self) -> [bool; DROP_TARGETS] {
        self.drop_targets_down
    }

    pub fn lamps(&self) -> &Lamps {
        &self.lamps
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub(crate) fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
        self.score_changed = true;
    }

    pub(crate) fn send(&mut self, message: Message) {
        if self.outbox.push_back(message).is_err() {
            warn!("outbox full, dropping {}", message);
        }
    }

    // Lamps and animations

    /// Starts an animation, first running the completion of any animation
    /// it replaces.
    pub(crate) fn blink(
        &mut self,
        target: impl Into<Target>,
        blinks: Blinks,
        period: Duration,
        final_state: bool,
        on_complete: Option<Completion>,
    ) {
        let target = target.into();
        if let Some(completion) = self.animator.cancel(target) {
            self.complete(completion);
        }
        self.animator
            .start(&mut self.lamps, self.now, target, blinks, period, final_state, on_complete);
    }

    /// Stops any animation on `light` without running its completion and
    /// sets the lamp steady.
    pub(crate) fn hold(&mut self, light: Light, on: bool) {
        self.animator.cancel(light);
        self.lamps.set(light, on);
    }

    /// Runs a completion action from a finished or replaced animation.
    pub(crate) fn complete(&mut self, completion: Completion) {
        debug!("animation complete: {}", completion);
        match completion {
            Completion::DecrementHyperspace => {
                self.hyperspace_combo = self.hyperspace_combo.saturating_sub(1);
                self.relight_hyperspace_bars();
                if self.hyperspace_combo > 0 {
                    self.timers.hyperspace_decay.arm(self.now, HYPERSPACE_DECAY);
                }
            }
            Completion::ClearRedeploy => {
                self.ball_saver = false;
                self.lamps.set(Light::CENTER_POST, false);
                if self.mode.is_live() {
                    self.send(Message::Sound(sound::CENTER_POST_GONE));
                }
            }
            Completion::ResetReentryLights => {
                for lane in 0..REENTRY_LANES {
                    self.lamps.set(Light::reentry(lane), self.reentry_lit[lane]);
                }
            }
            Completion::ResetDropTargetLights => {
                for i in 0..DROP_TARGETS {
                    self.lamps.set(Light::drop_target(i), !self.drop_targets_down[i]);
                }
            }
        }
    }

    /// Bars below the combo value lit, the rest dark, no bar animating.
    pub(crate) fn relight_hyperspace_bars(&mut self) {
        let lit = usize::from(self.hyperspace_combo);
        for bar in 0..HYPERSPACE_LEVELS {
            self.hold(Light::hyperspace(bar), bar < lit);
        }
    }

    /// Re-entry lamps follow lane state unless the group celebration owns them.
    pub(crate) fn relight_reentry(&mut self) {
        if self.animator.is_active(Group::Reentry) {
            return;
        }
        for lane in 0..REENTRY_LANES {
            self.lamps.set(Light::reentry(lane), self.reentry_lit[lane]);
        }
    }

    /// Sets every playfield lamp to the steady state implied by the game,
    /// after animations were cleared.
    pub(crate) fn settle_lamps(&mut self) {
        self.lamps.set(Light::BALL_DEPLOY, self.mode == Mode::BallLaunch);
        self.lamps.set(Light::EXTRA_BALL, self.extra_ball);
        self.lamps.set(Light::CENTER_POST, self.ball_saver);
        self.lamps.set(Light::SHIP, false);
        self.lamps.set(Light::MISSION_ARROW, false);
        for i in 0..MISSION_BUTTONS {
            self.lamps.set(Light::mission(i), self.mission.current == Some(i));
        }
        for i in 0..DROP_TARGETS {
            self.lamps.set(Light::drop_target(i), !self.drop_targets_down[i]);
        }
        for m in 2..=crate::config::MAX_MULTIPLIER {
            self.lamps.set(Light::multiplier(m), m <= self.multiplier);
        }
        for lane in 0..REENTRY_LANES {
            self.lamps.set(Light::reentry(lane), self.reentry_lit[lane]);
        }
        let lit = usize::from(self.hyperspace_combo);
        for bar in 0..HYPERSPACE_LEVELS {
            self.lamps.set(Light::hyperspace(bar), bar < lit);
        }
    }

    /// Restarts the indicator animations of a selected or active mission.
    fn restore_mission_animations(&mut self) {
        let Some(index) = self.mission.current else {
            return;
        };
        match self.mission.status {
            MissionStatus::Selected => {
                self.blink(Light::mission(index), Blinks::Forever, BLINK_SLOW, true, None);
            }
            MissionStatus::Active => {
                self.blink(Light::MISSION_ARROW, Blinks::Forever, BLINK_SLOW, false, None);
            }
            MissionStatus::None => {}
        }
    }

    // Status text

    /// What the status area shows when nothing is being announced.
    pub(crate) fn objective_text(&self) -> StatusText {
        let definition = self.mission.definition();
        match (self.mission.status, definition) {
            (MissionStatus::Selected, Some(def)) => def.selected_text(),
            (MissionStatus::Active, Some(def)) => def.progress_text(self.mission.hits_left),
            _ => status::format(format_args!("{}", DEFAULT_STATUS)),
        }
    }

    /// Shows `text` now and brings the objective back after `hold`.
    pub(crate) fn announce(&mut self, text: &str, hold: Duration) {
        self.status.set(text);
        let objective = self.objective_text();
        self.status.schedule(&objective, self.now + hold);
    }

    // Missions

    pub(crate) fn select_mission(&mut self, index: usize) {
        let Some(def) = missions::mission(index) else {
            warn!("no mission {}", index);
            return;
        };
        info!("mission selected: {}", def.name);
        self.mission = MissionProgress {
            status: MissionStatus::Selected,
            current: Some(index),
            hits_left: 0,
        };
        for other in (0..MISSION_BUTTONS).filter(|i| *i != index) {
            self.hold(Light::mission(other), false);
        }
        self.blink(Light::mission(index), Blinks::Forever, BLINK_SLOW, true, None);
        self.status.set(&def.selected_text());
    }

    pub(crate) fn accept_mission(&mut self) {
        let Some((index, def)) = self.mission.current.zip(self.mission.definition()) else {
            warn!("accept without a selected mission");
            self.mission = MissionProgress::NONE;
            return;
        };
        self.mission.status = MissionStatus::Active;
        self.mission.hits_left = def.required_hits(self.rank);
        info!("mission accepted: {} ({} hits)", def.name, self.mission.hits_left);

        self.send(Message::Accepted);
        self.hold(Light::mission(index), true);
        self.blink(Light::SHIP, Blinks::Count(BLINKS_SHORT), BLINK_FAST, false, None);
        self.blink(Light::MISSION_ARROW, Blinks::Forever, BLINK_SLOW, false, None);
        self.announce("Mission Accepted", STATUS_HOLD);
    }

    /// Drops the current mission and its lamps.
    pub(crate) fn reset_mission(&mut self) {
        if let Some(index) = self.mission.current {
            self.hold(Light::mission(index), false);
        }
        self.hold(Light::MISSION_ARROW, false);
        self.mission = MissionProgress::NONE;
    }

    // Ball and game lifecycle

    /// Per-ball state for a fresh (not redeployed) ball.
    pub(crate) fn start_new_ball(&mut self) {
        self.multiplier = 1;
        self.crash_bonus = DEFAULT_CRASH_BONUS;
        self.extra_ball = false;
        self.ball_saver = false;
        self.reentry_lit = [false; REENTRY_LANES];
        self.drop_targets_down = [false; DROP_TARGETS];
        self.mission = MissionProgress::NONE;
        self.hyperspace_combo = 0;
        self.ball_changed = true;
    }

    pub(crate) fn reset_for_new_game(&mut self) {
        self.start_new_ball();
        self.score = 0;
        self.ball = 1;
        self.rank = 0;
        self.missions_this_rank = 0;
        self.timers = Timers::default();
        self.animator.cancel_all();
        self.lamps.clear();
        self.score_changed = true;
    }

    pub(crate) fn retract_center_post(&mut self) {
        if !self.ball_saver {
            return;
        }
        debug!("ball save ending");
        self.blink(
            Light::CENTER_POST,
            Blinks::Count(BLINKS_CENTER_POST),
            BLINK_FAST,
            false,
            Some(Completion::ClearRedeploy),
        );
    }

    pub(crate) fn decay_hyperspace(&mut self) {
        if self.hyperspace_combo == 0 {
            return;
        }
        let top = usize::from(self.hyperspace_combo) - 1;
        self.blink(
            Light::hyperspace(top),
            Blinks::Count(BLINKS_SHORT),
            BLINK_FAST,
            false,
            Some(Completion::DecrementHyperspace),
        );
    }

    pub(crate) fn play_reset_sound(&mut self) {
        self.send(Message::Sound(self.reset_sound));
        for i in 0..DROP_TARGETS {
            self.hold(Light::drop_target(i), !self.drop_targets_down[i]);
        }
    }

    // Mode entry actions

    pub(crate) fn enter_startup(&mut self) {
        self.mode = Mode::Startup;
        info!("waiting for peer boards");
        self.status.set("Starting Up");
    }

    pub(crate) fn enter_ball_launch(&mut self) {
        self.mode = Mode::BallLaunch;
        info!("ball {} ready to launch", self.ball);
        self.timers.ball_drained.disarm();
        self.settle_lamps();
        self.restore_mission_animations();
        self.send(Message::Reload);
        self.ball_changed = true;
        self.status.set("Launch the Ball");
    }

    pub(crate) fn enter_playing(&mut self) {
        self.mode = Mode::Playing;
        self.lamps.set(Light::BALL_DEPLOY, false);
        self.ball_saver = true;
        self.lamps.set(Light::CENTER_POST, true);
        self.timers.redeploy.arm(self.now, REDEPLOY_GRACE);
        // A replayed ball keeps its combo, and the combo keeps decaying.
        if self.hyperspace_combo > 0 {
            self.timers.hyperspace_decay.arm(self.now, HYPERSPACE_DECAY);
        }
        let objective = self.objective_text();
        self.status.show_or_defer(&objective);
    }

    pub(crate) fn enter_ball_drain(&mut self) {
        self.mode = Mode::BallDrain;
        info!("ball {} drained", self.ball);
        self.timers.redeploy.disarm();
        self.timers.hyperspace_decay.disarm();
        self.timers.drop_target_sound.disarm();
        self.send(Message::Drained);
        self.timers.ball_drained.arm(self.now, BALL_DRAINED_DELAY);
    }

    pub(crate) fn enter_game_over(&mut self) {
        self.mode = Mode::GameOver;
        info!("game over, final score {}", self.score);
        self.timers = Timers::default();
        self.animator.cancel_all();
        self.lamps.clear();
        self.blink(Light::NEW_GAME, Blinks::Forever, BLINK_SLOW, false, None);
        self.send(Message::GameOver);
        self.status.set("Game Over");
    }
}
