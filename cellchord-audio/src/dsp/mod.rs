//! DSP backend: a real implementation of [`crate::graph::AudioGraph`]
//! with realtime (cpal) and offline (WAV) output sinks.

pub mod engine;
pub mod nodes;
pub mod output;
pub mod params;
pub mod wav;

pub use engine::DspGraph;
pub use output::AudioOutput;
pub use wav::WavRenderer;
