//! # cellchord-audio
//!
//! The sound half of cellchord: planning sound events from the active-cell
//! set, managing voice lifecycles against an abstract audio graph, and
//! conducting generation timing, arpeggio loops, and deferred teardowns on
//! a single cooperative thread.
//!
//! The [`graph::AudioGraph`] trait is the only way audio is touched;
//! [`dsp`] provides the real backend (cpal realtime or offline WAV), and
//! [`graph::TestGraph`]/[`graph::NullGraph`] cover tests and headless runs.

pub mod conductor;
pub mod dsp;
pub mod graph;
pub mod planner;
pub mod telemetry;
pub mod voices;

pub use conductor::Conductor;
pub use graph::{AudioGraph, GraphError, GraphResult, NullGraph, TestGraph};
