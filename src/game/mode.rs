use typed_fsm::{Transition, state_machine};

use super::state::GameState;

/// Game mode, mirrored into [`GameState`] by each state's entry action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Startup,
    BallLaunch,
    Playing,
    BallDrain,
    GameOver,
}

impl Mode {
    /// Scoring and mission progress only happen while a ball is live.
    pub const fn is_live(self) -> bool {
        matches!(self, Mode::BallLaunch | Mode::Playing)
    }
}

// FSM Events
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeEvent {
    /// Both peer boards reported in.
    BoardsReady,
    /// The ball left the plunger lane.
    Launched,
    Drained,
    /// Replay the same ball (extra ball or ball save).
    Redeploy,
    NextBall,
    GameEnded,
    NewGame,
}

// State Machine Definition
state_machine! {
    Name: ModeFsm,
    Context: GameState,
    Event: ModeEvent,
    States: {
        // Waiting for the solenoid driver and sound controller
        Startup => {
            entry: |ctx| {
                ctx.enter_startup();
            }
            process: |_ctx, evt| {
                match evt {
                    ModeEvent::BoardsReady => Transition::To(ModeFsm::BallLaunch),
                    _ => Transition::None,
                }
            }
        },

        // Ball loaded, waiting for it to reach the playfield
        BallLaunch => {
            entry: |ctx| {
                ctx.enter_ball_launch();
            }
            process: |_ctx, evt| {
                match evt {
                    ModeEvent::Launched => Transition::To(ModeFsm::Playing),
                    ModeEvent::Drained => Transition::To(ModeFsm::BallDrain),
                    _ => Transition::None,
                }
            }
        },

        Playing => {
            entry: |ctx| {
                ctx.enter_playing();
            }
            process: |_ctx, evt| {
                match evt {
                    ModeEvent::Drained => Transition::To(ModeFsm::BallDrain),
                    _ => Transition::None,
                }
            }
        },

        // Ball lost, reload timer running
        BallDrain => {
            entry: |ctx| {
                ctx.enter_ball_drain();
            }
            process: |_ctx, evt| {
                match evt {
                    ModeEvent::Redeploy | ModeEvent::NextBall => Transition::To(ModeFsm::BallLaunch),
                    ModeEvent::GameEnded => Transition::To(ModeFsm::GameOver),
                    _ => Transition::None,
                }
            }
        },

        GameOver => {
            entry: |ctx| {
                ctx.enter_game_over();
            }
            process: |_ctx, evt| {
                match evt {
                    ModeEvent::NewGame => Transition::To(ModeFsm::BallLaunch),
                    _ => Transition::None,
                }
            }
        }
    }
}
