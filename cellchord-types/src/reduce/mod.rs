//! Pure state-mutation reducers.
//!
//! These functions are the single source of truth for action → state
//! mutations. They mutate [`SessionState`] only; they never touch the audio
//! side. The conductor observes the state after a reduce and reconciles
//! audio (cancelling timers, stopping voices) from what it sees.

mod grid;
mod playback;
mod rule;
mod transport;
mod tuning;

use crate::action::Action;
use crate::state::session::SessionState;

/// Apply an action. Returns true if the state changed.
pub fn reduce(action: &Action, session: &mut SessionState) -> bool {
    match action {
        Action::Transport(a) => transport::reduce(a, session),
        Action::Grid(a) => grid::reduce(a, session),
        Action::Rule(a) => rule::reduce(a, session),
        Action::Tuning(a) => tuning::reduce(a, session),
        Action::Playback(a) => playback::reduce(a, session),
    }
}
