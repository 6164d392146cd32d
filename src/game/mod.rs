//! Game logic: peer events in, peer messages, lamps and status text out.
//!
//! [`Game`] pairs the mode state machine with the [`GameState`] it drives.
//! Inbound commands are handled one at a time; mode changes go through
//! [`ModeFsm::dispatch`] so each mode's entry action runs exactly once.
//! Timers, animations and the deferred status slot are advanced by the
//! scheduler through the `advance_*`/`service_*` methods, all against the
//! single `now` recorded by [`Game::begin_tick`].

mod mode;
mod state;

pub use mode::{Mode, ModeEvent, ModeFsm};
pub use state::{DEFAULT_STATUS, GameState, MissionProgress, MissionStatus};

use crate::Instant;
use crate::button::Edge;
use crate::config::{
    BLINK_FAST, BLINKS_CELEBRATE, BLINKS_PROMOTION, BLINKS_SHORT,
    DROP_TARGET_RESET_CRASH_BONUS, DROP_TARGET_RESET_SCORE, DROP_TARGET_SCORE,
    DROP_TARGET_SOUND_DELAY, HYPERSPACE_DECAY, HYPERSPACE_EXTRA_BALL_COMBO,
    HYPERSPACE_HIT_SCORE, HYPERSPACE_JACKPOT_BONUS, HYPERSPACE_JACKPOT_COMBO, MAX_MULTIPLIER,
    MISSION_BUTTON_CRASH_BONUS, MISSION_BUTTON_SCORE, MISSIONS_PER_RANK, NUM_BALLS,
    POP_BUMPER_SCORE, PROMOTION_CRASH_BONUS, PROMOTION_HOLD, REENTRY_GROUP_BONUS, REENTRY_SCORES,
    SLINGSHOT_SCORE, STATUS_HOLD,
};
use crate::lamps::Lamps;
use crate::lights::{Blinks, Completion, Group};
use crate::missions::{self, MAX_RANK};
use crate::protocol::{
    Board, Command, DROP_TARGETS, HYPERSPACE_LEVELS, Light, MISSION_BUTTONS, Message, ParseError,
    Peer, REENTRY_LANES, Tag, sound,
};
use crate::scoreboard::{self, Scoreboard};
use crate::servo::ServoCommand;
use crate::status;

pub struct Game {
    fsm: ModeFsm,
    state: GameState,
}

impl Game {
    /// Boots into [`Mode::Startup`]. `seed` feeds the pseudorandom choices
    /// (reset sounds, ship heading).
    pub fn new(now: Instant, seed: u32) -> Self {
        let mut state = GameState::new(now, seed);
        let mut fsm = ModeFsm::Startup;
        fsm.init(&mut state);
        Self { fsm, state }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    /// Records the time snapshot used for everything processed this tick.
    pub fn begin_tick(&mut self, now: Instant) {
        self.state.now = now;
    }

    fn transition(&mut self, event: ModeEvent) {
        let before = self.state.mode;
        self.fsm.dispatch(&mut self.state, &event);
        if self.state.mode != before {
            info!("mode {} -> {} on {}", before, self.state.mode, event);
        }
    }

    // Inbound events

    /// Decodes and handles one line from `peer`. Malformed lines are logged
    /// and dropped.
    pub fn handle_line(&mut self, peer: Peer, line: &str) {
        match Command::parse(line) {
            Ok(command) => {
                trace!("{} <- {}", peer, command);
                self.handle(command);
            }
            Err(ParseError::Empty) => {}
            Err(e) => warn!("ignoring line from {}: {} ({})", peer, line, e),
        }
    }

    /// Handles one decoded command, then counts it toward the active
    /// mission.
    pub fn handle(&mut self, command: Command) {
        let accepted = match command {
            Command::Hyperspace => self.on_hyperspace(),
            Command::Drain => {
                self.on_drain();
                false
            }
            Command::DropTargetReset => {
                self.on_drop_target_reset();
                false
            }
            Command::MissionButton(n) => {
                self.on_mission_button(usize::from(n));
                false
            }
            Command::BoardReady(board) => {
                self.on_board_ready(board);
                false
            }
            Command::Reentry(n) => {
                self.on_reentry(usize::from(n));
                false
            }
            Command::DropTarget(n) => {
                self.on_drop_target(usize::from(n));
                false
            }
            Command::PopBumper => {
                self.award(POP_BUMPER_SCORE);
                false
            }
            Command::Slingshot => {
                self.award(SLINGSHOT_SCORE);
                false
            }
            Command::LeftFlipperUp => {
                self.on_flipper(Light::FLIPPER_LEFT, true);
                false
            }
            Command::LeftFlipperDown => {
                self.on_flipper(Light::FLIPPER_LEFT, false);
                false
            }
            Command::RightFlipperUp => {
                self.on_flipper(Light::FLIPPER_RIGHT, true);
                false
            }
            Command::RightFlipperDown => {
                self.on_flipper(Light::FLIPPER_RIGHT, false);
                false
            }
        };

        // A mission accepted by this very event must not also count it as a hit.
        if !accepted {
            self.check_mission(command.tag());
        }
    }

    /// Adds points while a ball is live. Scoring during the launch means the
    /// ball reached the playfield without passing the deploy sensor, which
    /// counts as a launch.
    ///
    /// Returns `false` when the award was ignored.
    fn award(&mut self, points: u32) -> bool {
        match self.state.mode {
            Mode::Playing => {}
            Mode::BallLaunch => {
                debug!("skip-over: scored before the deploy sensor");
                self.state.send(Message::Point);
                self.transition(ModeEvent::Launched);
            }
            _ => return false,
        }
        self.state.add_score(points);
        true
    }

    /// Returns `true` if this shot accepted the selected mission.
    fn on_hyperspace(&mut self) -> bool {
        let combo = self.state.hyperspace_combo;
        if !self.award((u32::from(combo) + 1) * HYPERSPACE_HIT_SCORE) {
            return false;
        }

        let s = &mut self.state;
        let accepted = s.mission.status == MissionStatus::Selected;
        if accepted {
            s.accept_mission();
        } else if combo == HYPERSPACE_JACKPOT_COMBO {
            s.add_score(HYPERSPACE_JACKPOT_BONUS);
            s.send(Message::Sound(sound::HYPERSPACE_JACKPOT));
            s.announce("Jackpot Awarded", STATUS_HOLD);
        } else if combo == HYPERSPACE_EXTRA_BALL_COMBO {
            s.extra_ball = true;
            s.blink(Light::EXTRA_BALL, Blinks::Count(BLINKS_CELEBRATE), BLINK_FAST, true, None);
            s.send(Message::Sound(sound::HYPERSPACE_EXTRA_BALL));
            s.announce("Extra Ball Awarded", STATUS_HOLD);
        } else {
            s.send(Message::Sound(sound::HYPERSPACE[usize::from(combo)]));
            s.announce("Hyperspace Bonus", STATUS_HOLD);
        }

        self.advance_hyperspace_bars();
        accepted
    }

    /// Lights the bars below the current combo, blinks the current one and
    /// moves the combo up a level.
    fn advance_hyperspace_bars(&mut self) {
        let s = &mut self.state;
        let current = usize::from(s.hyperspace_combo);
        for bar in 0..current {
            s.hold(Light::hyperspace(bar), true);
        }
        s.blink(Light::hyperspace(current), Blinks::Count(BLINKS_SHORT), BLINK_FAST, true, None);

        s.hyperspace_combo = (s.hyperspace_combo + 1) % HYPERSPACE_LEVELS as u8;
        if s.hyperspace_combo == 0 {
            s.relight_hyperspace_bars();
            s.timers.hyperspace_decay.disarm();
        } else {
            s.timers.hyperspace_decay.arm(s.now, HYPERSPACE_DECAY);
        }
    }

    fn on_drain(&mut self) {
        let s = &mut self.state;
        match s.mode {
            Mode::Playing => {}
            // Fell back out of the shooter lane: always load it again.
            Mode::BallLaunch => s.ball_saver = true,
            mode => {
                debug!("drain ignored in {}", mode);
                return;
            }
        }

        s.animator.cancel_all();
        if s.extra_ball || s.ball_saver {
            info!("drain with redeploy pending, bonus held");
        } else {
            let bonus = s.crash_bonus.saturating_mul(u32::from(s.multiplier));
            info!("crash bonus {} x{}", s.crash_bonus, s.multiplier);
            s.add_score(bonus);
            s.reset_mission();
        }
        self.transition(ModeEvent::Drained);
        self.state.settle_lamps();
    }

    fn on_drop_target_reset(&mut self) {
        if !self.award(DROP_TARGET_RESET_SCORE) {
            return;
        }
        let s = &mut self.state;
        s.crash_bonus = s.crash_bonus.saturating_add(DROP_TARGET_RESET_CRASH_BONUS);
        s.multiplier = (s.multiplier + 1).min(MAX_MULTIPLIER);
        s.drop_targets_down = [false; DROP_TARGETS];

        s.reset_sound = *s
            .rng
            .pick(&sound::DROP_TARGET_RESET_VARIANTS)
            .unwrap_or(&sound::DROP_TARGET_RESET);
        s.timers.drop_target_sound.arm(s.now, DROP_TARGET_SOUND_DELAY);

        s.blink(
            Group::DropTargets,
            Blinks::Count(BLINKS_SHORT),
            BLINK_FAST,
            true,
            Some(Completion::ResetDropTargetLights),
        );
        let multiplier = s.multiplier;
        for m in 2..multiplier {
            s.hold(Light::multiplier(m), true);
        }
        if multiplier >= 2 {
            s.blink(Light::multiplier(multiplier), Blinks::Count(BLINKS_SHORT), BLINK_FAST, true, None);
        }
        let text = status::format(format_args!("Multiplier x{}", multiplier));
        s.announce(&text, STATUS_HOLD);
    }

    fn on_mission_button(&mut self, index: usize) {
        if !self.award(MISSION_BUTTON_SCORE) {
            return;
        }
        let s = &mut self.state;
        s.crash_bonus = s.crash_bonus.saturating_add(MISSION_BUTTON_CRASH_BONUS);

        if index >= MISSION_BUTTONS {
            warn!("no mission button {}", index);
            return;
        }
        if s.mission.status != MissionStatus::None {
            debug!("mission already {}, selection unchanged", s.mission.status);
            return;
        }
        s.select_mission(index);
    }

    fn on_board_ready(&mut self, board: Board) {
        info!("{} ready", board.name());
        let s = &mut self.state;
        s.boards.mark(board);
        if s.mode != Mode::Startup || !s.boards.all() {
            return;
        }
        s.animator.cancel_all();
        s.lamps.clear();
        self.transition(ModeEvent::BoardsReady);
    }

    fn on_reentry(&mut self, lane: usize) {
        if lane >= REENTRY_LANES {
            warn!("no re-entry lane {}", lane);
            return;
        }
        // The deploy sensor fired: this is the launch, not a skip-over.
        if self.state.mode == Mode::BallLaunch {
            self.transition(ModeEvent::Launched);
        }
        if !self.award(REENTRY_SCORES[lane]) {
            return;
        }

        let s = &mut self.state;
        s.send(Message::Sound(sound::RE_ENTRY));
        s.reentry_lit[lane] = true;
        if s.reentry_lit.iter().all(|lit| *lit) {
            s.add_score(REENTRY_GROUP_BONUS);
            s.reentry_lit = [false; REENTRY_LANES];
            s.send(Message::Sound(sound::LIGHT_GROUP_LIT));
            s.blink(
                Group::Reentry,
                Blinks::Count(BLINKS_SHORT),
                BLINK_FAST,
                false,
                Some(Completion::ResetReentryLights),
            );
        } else {
            s.relight_reentry();
        }
    }

    fn on_drop_target(&mut self, target: usize) {
        if target >= DROP_TARGETS {
            warn!("no drop target {}", target);
            return;
        }
        if !self.award(DROP_TARGET_SCORE) {
            return;
        }
        let s = &mut self.state;
        s.drop_targets_down[target] = true;
        // Mid-celebration the group's completion turns it off.
        if !s.animator.is_active(Group::DropTargets) {
            s.hold(Light::drop_target(target), false);
        }
    }

    /// Flipper lamps follow the buttons. While a ball is live each up edge
    /// also shifts the lit re-entry lanes one step toward that flipper's
    /// side, wrapping around.
    fn on_flipper(&mut self, light: Light, up: bool) {
        let s = &mut self.state;
        s.lamps.set(light, up);
        if !up || !s.mode.is_live() {
            return;
        }
        if light == Light::FLIPPER_LEFT {
            s.reentry_lit.rotate_left(1);
        } else {
            s.reentry_lit.rotate_right(1);
        }
        s.relight_reentry();
    }

    // Missions

    fn check_mission(&mut self, tag: Tag) {
        let s = &mut self.state;
        if !s.mode.is_live() || s.mission.status != MissionStatus::Active {
            return;
        }
        let Some(def) = s.mission.definition() else {
            return;
        };
        if def.target != tag {
            return;
        }

        s.mission.hits_left = s.mission.hits_left.saturating_sub(1);
        if s.mission.hits_left == 0 {
            self.complete_mission();
        } else {
            let text = def.progress_text(s.mission.hits_left);
            s.status.show_or_defer(&text);
        }
    }

    fn complete_mission(&mut self) {
        let s = &mut self.state;
        let Some(def) = s.mission.definition() else {
            return;
        };
        let reward = def.reward(s.rank);
        info!("mission complete: {} (+{})", def.name, reward);
        s.reset_mission();
        s.add_score(reward);
        s.missions_this_rank += 1;

        if s.missions_this_rank >= MISSIONS_PER_RANK {
            self.promote();
        } else {
            let count = s.missions_this_rank;
            s.send(Message::MissionCount(count));
            s.blink(Light::SHIP, Blinks::Count(BLINKS_CELEBRATE), BLINK_FAST, false, None);
            s.announce("Mission Completed", STATUS_HOLD);
        }
    }

    fn promote(&mut self) {
        let s = &mut self.state;
        let bonus = PROMOTION_CRASH_BONUS * missions::rank_level(s.rank);
        s.crash_bonus = s.crash_bonus.saturating_add(bonus);
        s.missions_this_rank = 0;
        s.rank = (s.rank + 1).min(MAX_RANK);
        info!("promoted to {}", missions::rank_name(s.rank));

        s.send(Message::Rank(s.rank));
        s.blink(Light::SHIP, Blinks::Count(BLINKS_PROMOTION), BLINK_FAST, false, None);
        let text = status::format(format_args!("Promotion {}", missions::rank_name(s.rank)));
        s.announce(&text, PROMOTION_HOLD);
    }

    // Ticked services

    /// Advances lamp animations and runs the completions of those that ended.
    pub fn advance_lights(&mut self) {
        let s = &mut self.state;
        let done = s.animator.tick(&mut s.lamps, s.now);
        for completion in done {
            s.complete(completion);
        }
    }

    /// Fires every one-shot timer whose deadline has passed.
    pub fn service_timers(&mut self) {
        let now = self.state.now;
        let timers = &mut self.state.timers;
        let decay = timers.hyperspace_decay.fire(now);
        let reset_sound = timers.drop_target_sound.fire(now);
        let redeploy = timers.redeploy.fire(now);
        let drained = timers.ball_drained.fire(now);

        if decay {
            self.state.decay_hyperspace();
        }
        if reset_sound {
            self.state.play_reset_sound();
        }
        if redeploy {
            self.state.retract_center_post();
        }
        if drained {
            self.resolve_drain();
        }

        let s = &mut self.state;
        if let Some(command) = s.ship.tick(now, &mut s.rng) {
            s.servo_command = Some(command);
        }
    }

    /// Replays the ball, loads the next one, or ends the game.
    fn resolve_drain(&mut self) {
        if self.state.mode != Mode::BallDrain {
            return;
        }
        let s = &mut self.state;
        if s.extra_ball {
            s.extra_ball = false;
            s.ball_saver = false;
            self.transition(ModeEvent::Redeploy);
            self.state.status.set("Shoot Again");
        } else if s.ball_saver {
            s.ball_saver = false;
            self.transition(ModeEvent::Redeploy);
        } else if s.ball >= NUM_BALLS {
            self.transition(ModeEvent::GameEnded);
        } else {
            s.ball += 1;
            s.start_new_ball();
            self.transition(ModeEvent::NextBall);
        }
    }

    /// Applies the deferred status message once it is due.
    pub fn deliver_status(&mut self) {
        let now = self.state.now;
        if self.state.status.deliver(now) {
            trace!("deferred status delivered");
        }
    }

    /// Debounced new-game button edge.
    pub fn on_new_game_button(&mut self, edge: Edge) {
        match edge {
            Edge::Rose => {
                self.state.hold(Light::NEW_GAME, false);
                return;
            }
            Edge::Fell => {}
        }

        match self.state.mode {
            Mode::GameOver => {
                info!("new game");
                self.state.reset_for_new_game();
                self.state.send(Message::Reset);
                self.transition(ModeEvent::NewGame);
            }
            Mode::Playing | Mode::BallLaunch => {
                info!("manual reload");
                self.state.send(Message::Reload);
            }
            _ => {}
        }
        self.state.hold(Light::NEW_GAME, true);
    }

    // Outputs

    pub fn pop_outbound(&mut self) -> Option<Message> {
        self.state.outbox.pop_front()
    }

    pub fn take_servo_command(&mut self) -> Option<ServoCommand> {
        self.state.servo_command.take()
    }

    pub fn lamps(&self) -> &Lamps {
        &self.state.lamps
    }

    pub fn lamps_mut(&mut self) -> &mut Lamps {
        &mut self.state.lamps
    }

    /// Pushes the fields that changed since the last render.
    pub fn render<S: Scoreboard>(&mut self, board: &mut S) {
        let s = &mut self.state;
        if core::mem::take(&mut s.score_changed) {
            board.show_score(&scoreboard::number(s.score));
        }
        if core::mem::take(&mut s.ball_changed) {
            board.show_ball(&scoreboard::number(u32::from(s.ball)));
        }
        if let Some(text) = s.status.take_changed() {
            board.show_status(text);
        }
    }
}
