//! Offline rendering: drain the DSP graph into a mono 16-bit WAV file.
//!
//! The caller interleaves `advance` with conductor ticks, so scheduled
//! events land exactly where the sample clock says they should.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::graph::{GraphError, GraphResult};

use super::engine::DspGraph;

const RENDER_CHUNK: usize = 1024;

pub struct WavRenderer {
    graph: DspGraph,
    writer: hound::WavWriter<BufWriter<File>>,
}

impl WavRenderer {
    pub fn create<P: AsRef<Path>>(path: P, graph: DspGraph) -> GraphResult<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: graph.sample_rate() as u32,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, spec)
            .map_err(|e| GraphError(format!("create wav: {}", e)))?;
        Ok(Self { graph, writer })
    }

    /// Render `secs` of audio into the file, advancing the graph clock.
    pub fn advance(&mut self, secs: f64) -> GraphResult {
        let mut remaining = (secs * self.graph.sample_rate()).round() as usize;
        let mut buf = [0.0f32; RENDER_CHUNK];
        while remaining > 0 {
            let n = remaining.min(RENDER_CHUNK);
            self.graph.render(&mut buf[..n]);
            for &sample in &buf[..n] {
                let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                self.writer
                    .write_sample(scaled)
                    .map_err(|e| GraphError(format!("write wav: {}", e)))?;
            }
            remaining -= n;
        }
        Ok(())
    }

    pub fn graph(&self) -> &DspGraph {
        &self.graph
    }

    pub fn finalize(self) -> GraphResult {
        self.writer
            .finalize()
            .map_err(|e| GraphError(format!("finalize wav: {}", e)))
    }
}
