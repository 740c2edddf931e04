//! # cellchord-types
//!
//! Shared data model for the cellchord sonified cellular automaton:
//! the toroidal grid, neighborhood counting, rule evaluation, harmonic
//! (just-intonation) coordinate mapping, session state, and the pure
//! reducers that apply control actions to it.
//!
//! Everything here is synchronous and allocation-light; the audio side
//! (`cellchord-audio`) consumes these types without feeding anything back.

pub mod action;
pub mod reduce;
pub mod render;
pub mod state;

pub use action::*;
pub use state::*;
