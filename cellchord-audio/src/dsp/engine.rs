//! The synthesis graph behind `AudioGraph`: nodes, connections, and a
//! sample-at-a-time pull renderer driven by whichever output sink owns it
//! (cpal stream or offline WAV render).
//!
//! The graph clock is the sample counter, so `now()` is monotonic and
//! scheduling is deterministic for offline renders.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::graph::{
    AudioGraph, CompressorParams, FilterKind, GraphError, GraphResult, NodeId, Param, Waveform,
    DESTINATION,
};

use super::nodes::{waveform_sample, Biquad, Compressor, Reverb};
use super::params::ScheduledParam;

enum NodeKind {
    Oscillator {
        waveform: Waveform,
        frequency: ScheduledParam,
        phase: f64,
        running: bool,
    },
    Gain {
        gain: ScheduledParam,
    },
    Filter {
        biquad: Biquad,
        cutoff: ScheduledParam,
    },
    Compressor {
        compressor: Compressor,
    },
    Reverb {
        reverb: Reverb,
    },
}

struct EngineState {
    sample_rate: f64,
    clock_samples: u64,
    next_id: u64,
    nodes: HashMap<u64, NodeKind>,
    /// Audio-rate inputs per node; key 0 is the destination.
    audio_inputs: HashMap<u64, Vec<u64>>,
    /// Modulation inputs into oscillator frequency.
    freq_inputs: HashMap<u64, Vec<u64>>,
}

impl EngineState {
    fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            clock_samples: 0,
            next_id: 1,
            nodes: HashMap::new(),
            audio_inputs: HashMap::new(),
            freq_inputs: HashMap::new(),
        }
    }

    fn now(&self) -> f64 {
        self.clock_samples as f64 / self.sample_rate
    }

    fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, kind);
        NodeId(id)
    }

    /// Evaluate one node's output for the current sample. The node is
    /// temporarily removed from the map while its inputs recurse, which
    /// doubles as a cycle guard (a missing node evaluates to 0).
    fn eval(&mut self, id: u64, t: f64, memo: &mut HashMap<u64, f64>) -> f64 {
        if let Some(&cached) = memo.get(&id) {
            return cached;
        }
        let Some(mut node) = self.nodes.remove(&id) else {
            return 0.0;
        };

        let input: f64 = self
            .audio_inputs
            .get(&id)
            .cloned()
            .unwrap_or_default()
            .iter()
            .map(|&from| self.eval(from, t, memo))
            .sum();

        let out = match &mut node {
            NodeKind::Oscillator {
                waveform,
                frequency,
                phase,
                running,
            } => {
                if *running {
                    let modulation: f64 = self
                        .freq_inputs
                        .get(&id)
                        .cloned()
                        .unwrap_or_default()
                        .iter()
                        .map(|&from| self.eval(from, t, memo))
                        .sum();
                    let freq = frequency.value_at(t) + modulation;
                    let sample = waveform_sample(*waveform, *phase);
                    *phase = (*phase + freq / self.sample_rate).rem_euclid(1.0);
                    sample
                } else {
                    0.0
                }
            }
            NodeKind::Gain { gain } => input * gain.value_at(t),
            NodeKind::Filter { biquad, cutoff } => {
                biquad.set_cutoff(cutoff.value_at(t));
                biquad.process(input)
            }
            NodeKind::Compressor { compressor } => compressor.process(input),
            NodeKind::Reverb { reverb } => reverb.process(input),
        };

        self.nodes.insert(id, node);
        memo.insert(id, out);
        out
    }

    /// Render one mono sample and advance the clock.
    fn render_sample(&mut self) -> f64 {
        let t = self.now();
        let mut memo = HashMap::new();
        let inputs = self
            .audio_inputs
            .get(&DESTINATION.0)
            .cloned()
            .unwrap_or_default();
        let mut sum = 0.0;
        for from in inputs {
            sum += self.eval(from, t, &mut memo);
        }
        self.clock_samples += 1;
        sum.clamp(-1.0, 1.0)
    }

    fn param_of(&mut self, node: NodeId, param: Param) -> GraphResult<&mut ScheduledParam> {
        let kind = self
            .nodes
            .get_mut(&node.0)
            .ok_or_else(|| GraphError(format!("no such node {:?}", node)))?;
        match (kind, param) {
            (NodeKind::Gain { gain }, Param::Gain) => Ok(gain),
            (NodeKind::Oscillator { frequency, .. }, Param::Frequency) => Ok(frequency),
            (NodeKind::Filter { cutoff, .. }, Param::Frequency) => Ok(cutoff),
            _ => Err(GraphError(format!(
                "node {:?} has no {:?} parameter",
                node, param
            ))),
        }
    }
}

/// Shared handle to the synthesis graph. Clones share the same engine;
/// one clone goes to the output sink, the other to the conductor.
#[derive(Clone)]
pub struct DspGraph {
    state: Arc<Mutex<EngineState>>,
}

impl DspGraph {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::new(sample_rate))),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.state.lock().unwrap().sample_rate
    }

    /// Fill a mono buffer, advancing the graph clock one sample per frame.
    pub fn render(&self, out: &mut [f32]) {
        let mut state = self.state.lock().unwrap();
        for frame in out.iter_mut() {
            *frame = state.render_sample() as f32;
        }
    }

    /// Fill an interleaved buffer, duplicating the mono render into every
    /// channel of each frame.
    pub fn render_interleaved(&self, out: &mut [f32], channels: usize) {
        let mut state = self.state.lock().unwrap();
        for frame in out.chunks_exact_mut(channels) {
            let sample = state.render_sample() as f32;
            for ch in frame {
                *ch = sample;
            }
        }
    }
}

impl AudioGraph for DspGraph {
    fn now(&self) -> f64 {
        self.state.lock().unwrap().now()
    }

    fn create_oscillator(&self, waveform: Waveform, frequency: f64) -> GraphResult<NodeId> {
        let mut state = self.state.lock().unwrap();
        Ok(state.add_node(NodeKind::Oscillator {
            waveform,
            frequency: ScheduledParam::new(frequency),
            phase: 0.0,
            running: false,
        }))
    }

    fn create_gain(&self, value: f64) -> GraphResult<NodeId> {
        let mut state = self.state.lock().unwrap();
        Ok(state.add_node(NodeKind::Gain {
            gain: ScheduledParam::new(value),
        }))
    }

    fn create_filter(&self, kind: FilterKind, frequency: f64, q: f64) -> GraphResult<NodeId> {
        let mut state = self.state.lock().unwrap();
        let sample_rate = state.sample_rate;
        Ok(state.add_node(NodeKind::Filter {
            biquad: Biquad::new(kind, frequency, q, sample_rate),
            cutoff: ScheduledParam::new(frequency),
        }))
    }

    fn create_compressor(&self, params: CompressorParams) -> GraphResult<NodeId> {
        let mut state = self.state.lock().unwrap();
        let sample_rate = state.sample_rate;
        Ok(state.add_node(NodeKind::Compressor {
            compressor: Compressor::new(params, sample_rate),
        }))
    }

    fn create_reverb(&self, impulse_secs: f64, dry: f64, wet: f64) -> GraphResult<NodeId> {
        let mut state = self.state.lock().unwrap();
        let sample_rate = state.sample_rate;
        Ok(state.add_node(NodeKind::Reverb {
            reverb: Reverb::new(impulse_secs, dry, wet, sample_rate),
        }))
    }

    fn connect(&self, from: NodeId, to: NodeId) -> GraphResult {
        let mut state = self.state.lock().unwrap();
        state.audio_inputs.entry(to.0).or_default().push(from.0);
        Ok(())
    }

    fn connect_to_frequency(&self, from: NodeId, osc: NodeId) -> GraphResult {
        let mut state = self.state.lock().unwrap();
        if !matches!(state.nodes.get(&osc.0), Some(NodeKind::Oscillator { .. })) {
            return Err(GraphError(format!("{:?} is not an oscillator", osc)));
        }
        state.freq_inputs.entry(osc.0).or_default().push(from.0);
        Ok(())
    }

    fn set_value_at(&self, node: NodeId, param: Param, value: f64, at: f64) -> GraphResult {
        let mut state = self.state.lock().unwrap();
        state.param_of(node, param)?.set_value_at(value, at);
        Ok(())
    }

    fn linear_ramp_to(&self, node: NodeId, param: Param, value: f64, at: f64) -> GraphResult {
        let mut state = self.state.lock().unwrap();
        state.param_of(node, param)?.linear_ramp_to(value, at);
        Ok(())
    }

    fn exponential_ramp_to(&self, node: NodeId, param: Param, value: f64, at: f64) -> GraphResult {
        let mut state = self.state.lock().unwrap();
        state.param_of(node, param)?.exponential_ramp_to(value, at);
        Ok(())
    }

    fn cancel_scheduled(&self, node: NodeId, param: Param) -> GraphResult {
        let mut state = self.state.lock().unwrap();
        let now = state.now();
        // Cancelling on a released node is part of teardown; not an error.
        if let Ok(p) = state.param_of(node, param) {
            p.cancel_after(now);
        }
        Ok(())
    }

    fn start(&self, node: NodeId) -> GraphResult {
        let mut state = self.state.lock().unwrap();
        match state.nodes.get_mut(&node.0) {
            Some(NodeKind::Oscillator { running, .. }) => {
                *running = true;
                Ok(())
            }
            Some(_) => Err(GraphError(format!("{:?} is not startable", node))),
            None => Err(GraphError(format!("no such node {:?}", node))),
        }
    }

    fn stop(&self, node: NodeId) -> GraphResult {
        let mut state = self.state.lock().unwrap();
        // Stopping a missing or non-oscillator node is tolerated.
        if let Some(NodeKind::Oscillator { running, .. }) = state.nodes.get_mut(&node.0) {
            *running = false;
        }
        Ok(())
    }

    fn disconnect(&self, node: NodeId) -> GraphResult {
        let mut state = self.state.lock().unwrap();
        state.nodes.remove(&node.0);
        state.audio_inputs.remove(&node.0);
        state.freq_inputs.remove(&node.0);
        for inputs in state.audio_inputs.values_mut() {
            inputs.retain(|&from| from != node.0);
        }
        for inputs in state.freq_inputs.values_mut() {
            inputs.retain(|&from| from != node.0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f64 = 48_000.0;

    #[test]
    fn clock_advances_with_rendering() {
        let graph = DspGraph::new(RATE);
        assert_eq!(graph.now(), 0.0);
        let mut buf = vec![0.0f32; 4800];
        graph.render(&mut buf);
        assert!((graph.now() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn running_oscillator_reaches_destination() {
        let graph = DspGraph::new(RATE);
        let osc = graph.create_oscillator(Waveform::Sine, 440.0).unwrap();
        let gain = graph.create_gain(0.5).unwrap();
        graph.connect(osc, gain).unwrap();
        graph.connect(gain, graph.destination()).unwrap();
        graph.start(osc).unwrap();

        let mut buf = vec![0.0f32; 4800];
        graph.render(&mut buf);
        let energy: f32 = buf.iter().map(|s| s.abs()).sum();
        assert!(energy > 100.0, "energy {}", energy);
        assert!(buf.iter().all(|s| s.abs() <= 0.51));
    }

    #[test]
    fn stopped_oscillator_is_silent() {
        let graph = DspGraph::new(RATE);
        let osc = graph.create_oscillator(Waveform::Sawtooth, 220.0).unwrap();
        graph.connect(osc, graph.destination()).unwrap();
        // Never started.
        let mut buf = vec![0.0f32; 480];
        graph.render(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn gain_ramp_shapes_output() {
        let graph = DspGraph::new(RATE);
        let osc = graph.create_oscillator(Waveform::Square, 100.0).unwrap();
        let gain = graph.create_gain(0.0).unwrap();
        graph.connect(osc, gain).unwrap();
        graph.connect(gain, graph.destination()).unwrap();
        graph.start(osc).unwrap();
        graph.set_value_at(gain, Param::Gain, 0.0, 0.0).unwrap();
        graph.linear_ramp_to(gain, Param::Gain, 1.0, 0.1).unwrap();

        let mut early = vec![0.0f32; 480];
        graph.render(&mut early);
        let mut late = vec![0.0f32; 480];
        // Skip ahead to the end of the ramp.
        let mut skip = vec![0.0f32; 4320];
        graph.render(&mut skip);
        graph.render(&mut late);

        let early_peak = early.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let late_peak = late.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(late_peak > early_peak * 2.0);
    }

    #[test]
    fn double_stop_and_disconnect_are_tolerated() {
        let graph = DspGraph::new(RATE);
        let osc = graph.create_oscillator(Waveform::Sine, 440.0).unwrap();
        graph.start(osc).unwrap();
        assert!(graph.stop(osc).is_ok());
        assert!(graph.disconnect(osc).is_ok());
        assert!(graph.stop(osc).is_ok());
        assert!(graph.disconnect(osc).is_ok());
    }

    #[test]
    fn fm_modulation_changes_the_waveform() {
        let graph = DspGraph::new(RATE);
        let main = graph.create_oscillator(Waveform::Sine, 200.0).unwrap();
        let fm = graph.create_oscillator(Waveform::Sine, 300.0).unwrap();
        let fm_gain = graph.create_gain(100.0).unwrap();
        graph.connect(fm, fm_gain).unwrap();
        graph.connect_to_frequency(fm_gain, main).unwrap();
        graph.connect(main, graph.destination()).unwrap();
        graph.start(main).unwrap();
        graph.start(fm).unwrap();

        let mut modulated = vec![0.0f32; 4800];
        graph.render(&mut modulated);

        let plain_graph = DspGraph::new(RATE);
        let plain = plain_graph.create_oscillator(Waveform::Sine, 200.0).unwrap();
        plain_graph.connect(plain, plain_graph.destination()).unwrap();
        plain_graph.start(plain).unwrap();
        let mut unmodulated = vec![0.0f32; 4800];
        plain_graph.render(&mut unmodulated);

        assert_ne!(modulated, unmodulated);
    }

    #[test]
    fn connect_to_frequency_requires_an_oscillator() {
        let graph = DspGraph::new(RATE);
        let gain_a = graph.create_gain(1.0).unwrap();
        let gain_b = graph.create_gain(1.0).unwrap();
        assert!(graph.connect_to_frequency(gain_a, gain_b).is_err());
    }
}
