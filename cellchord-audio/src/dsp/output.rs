//! Realtime output: a cpal stream pulling samples from the DSP graph.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::graph::{GraphError, GraphResult};

use super::engine::DspGraph;

/// A live output stream. Dropping it stops playback; the graph handle it
/// was built around stays valid for the conductor.
pub struct AudioOutput {
    _stream: cpal::Stream,
    sample_rate: f64,
}

impl AudioOutput {
    /// Open the default output device and start a stream that drains the
    /// returned graph. The graph's sample rate follows the device config.
    pub fn start() -> GraphResult<(AudioOutput, DspGraph)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| GraphError("no default output device".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|e| GraphError(format!("output config: {}", e)))?;
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(GraphError(format!(
                "unsupported sample format {:?}",
                config.sample_format()
            )));
        }

        let sample_rate = config.sample_rate().0 as f64;
        let channels = config.channels() as usize;
        let graph = DspGraph::new(sample_rate);
        let callback_graph = graph.clone();

        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback_graph.render_interleaved(data, channels);
                },
                |e| log::error!(target: "audio", "stream error: {}", e),
                None,
            )
            .map_err(|e| GraphError(format!("build stream: {}", e)))?;
        stream
            .play()
            .map_err(|e| GraphError(format!("start stream: {}", e)))?;

        log::info!(
            target: "audio",
            "output stream started at {} Hz, {} channels",
            sample_rate,
            channels
        );
        Ok((
            AudioOutput {
                _stream: stream,
                sample_rate,
            },
            graph,
        ))
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
