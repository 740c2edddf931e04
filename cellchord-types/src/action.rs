//! Control actions: the only external mutation surface of the session.
//!
//! Every knob the front end exposes maps to exactly one action variant;
//! the reducers in [`crate::reduce`] are the single source of truth for
//! how an action mutates [`crate::SessionState`].

use serde::{Deserialize, Serialize};

use crate::state::grid::Dimension;
use crate::state::harmonics::AxisRatio;
use crate::state::rule::RuleId;
use crate::state::session::ArpMode;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Transport(TransportAction),
    Grid(GridAction),
    Rule(RuleAction),
    Tuning(TuningAction),
    Playback(PlaybackAction),
}

/// Start/stop/step/reset of the generation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportAction {
    Start,
    Stop,
    /// One generation on demand, regardless of the running state.
    Step,
    /// Reseed the grid and reset the generation counter.
    Reset,
}

/// Structural grid changes. Both enter the Transitioning phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridAction {
    SetDimension(Dimension),
    SetSize(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleAction {
    Select(RuleId),
    ToggleBirth(u8),
    ToggleSurvival(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TuningAction {
    SetBaseFrequency(f64),
    SetAxisRatio(usize, AxisRatio),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackAction {
    SetArpMode(ArpMode),
    CycleArpMode,
    SetGenerationMs(u64),
}
