//! Voice lifecycle management: building oscillator chains for chord and
//! arpeggio plans, fading them out, and tearing them down on schedule.
//!
//! Teardown is never immediate: retiring a voice ramps its gains to zero
//! over 100 ms and queues the stop/disconnect work 150 ms further out, as
//! an explicit entry the conductor polls against the graph clock. Node
//! release errors are suppressed per node so one dead node never blocks
//! the rest of its voice.

use std::collections::HashMap;

use cellchord_types::Dimension;

use crate::graph::{AudioGraph, GraphResult, NodeId, Param, Waveform};
use crate::planner::{
    chord_waveform, ArpPlan, ChordPlan, NotePlan, Timbre, REVERB_DRY, REVERB_WET,
    VOICE_COMPRESSOR,
};

/// Fade-out ramp length when a voice is retired.
pub const RELEASE_RAMP_SECS: f64 = 0.1;
/// Extra delay after the ramp before nodes are stopped and disconnected.
pub const TEARDOWN_DELAY_SECS: f64 = 0.15;
/// Chord voices fade in over this window (4D sets the value directly).
pub const CHORD_ATTACK_SECS: f64 = 0.05;
/// Arp voices are torn down this long after their note ends.
pub const NOTE_TAIL_SECS: f64 = 0.05;
/// Filter cutoff ceiling for rich voices.
const FILTER_CEILING_HZ: f64 = 15_000.0;
/// Peak of the arp note envelope; sustain sits at 70% of this.
const ARP_PEAK_GAIN: f64 = 0.5;

/// Nodes owned by one sounding voice.
#[derive(Debug, Clone)]
struct Voice {
    oscillators: Vec<NodeId>,
    gains: Vec<NodeId>,
    aux: Vec<NodeId>,
}

impl Voice {
    fn all_nodes(&self) -> Vec<NodeId> {
        let mut nodes = self.oscillators.clone();
        nodes.extend(&self.gains);
        nodes.extend(&self.aux);
        nodes
    }
}

/// The shared tail of a pipeline: bus gain, limiter, optional reverb.
#[derive(Debug, Clone)]
struct MasterChain {
    input: NodeId,
    gains: Vec<NodeId>,
    aux: Vec<NodeId>,
}

/// A deferred stop/disconnect, polled by the conductor. A teardown carrying
/// a slot also vacates that slot if the same voice still holds it.
#[derive(Debug, Clone)]
struct Teardown {
    due: f64,
    nodes: Vec<NodeId>,
    slot: Option<usize>,
}

/// Owns every live voice and the master chain of the current pipeline.
#[derive(Default)]
pub struct VoiceBank {
    voices: HashMap<usize, Voice>,
    master: Option<MasterChain>,
    pending: Vec<Teardown>,
}

impl VoiceBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn pending_teardowns(&self) -> usize {
        self.pending.len()
    }

    /// Realize a full chord: master chain plus one voice per note, all
    /// starting at the current graph time.
    pub fn realize_chord(
        &mut self,
        graph: &dyn AudioGraph,
        plan: &ChordPlan,
        dimension: Dimension,
    ) -> GraphResult {
        if plan.notes.is_empty() {
            return Ok(());
        }
        let bus = self.build_master(graph, plan.master_gain, &plan.limiter, None)?;
        let now = graph.now();
        for (index, note) in plan.notes.iter().enumerate() {
            let osc = graph.create_oscillator(chord_waveform(dimension, index), note.frequency)?;
            let gain = graph.create_gain(0.0)?;
            graph.connect(osc, gain)?;
            graph.connect(gain, bus)?;
            if dimension == Dimension::Four {
                graph.set_value_at(gain, Param::Gain, plan.voice_gain, now)?;
            } else {
                graph.set_value_at(gain, Param::Gain, 0.0, now)?;
                graph.linear_ramp_to(gain, Param::Gain, plan.voice_gain, now + CHORD_ATTACK_SECS)?;
            }
            graph.start(osc)?;
            self.occupy(
                graph,
                index,
                Voice {
                    oscillators: vec![osc],
                    gains: vec![gain],
                    aux: Vec::new(),
                },
            )?;
        }
        Ok(())
    }

    /// Build the arpeggio bus (gain, limiter, reverb unless the pattern is
    /// large). Must be called once per arp pipeline before any note.
    pub fn realize_arp_master(
        &mut self,
        graph: &dyn AudioGraph,
        plan: &ArpPlan,
        dimension: Dimension,
    ) -> GraphResult {
        let reverb = if plan.large {
            None
        } else {
            Some(crate::planner::reverb_impulse_secs(dimension))
        };
        self.build_master(graph, 1.0, &plan.limiter, reverb)?;
        Ok(())
    }

    /// Realize one arpeggio note into the bus, with its ADSR scheduled and
    /// its own teardown queued at note end plus a short tail.
    pub fn realize_arp_note(
        &mut self,
        graph: &dyn AudioGraph,
        plan: &ArpPlan,
        note: &NotePlan,
        slot: usize,
        dimension: Dimension,
    ) -> GraphResult {
        let bus = match &self.master {
            Some(chain) => chain.input,
            None => {
                log::error!(target: "voices", "arp note realized with no master chain; skipping");
                return Ok(());
            }
        };
        let now = graph.now();
        let simple = plan.large || dimension == Dimension::Four;
        let voice = if simple {
            self.build_simple_voice(graph, note.frequency, bus)?
        } else {
            self.build_rich_voice(graph, note.frequency, bus, dimension, now)?
        };

        // ADSR on the note gain: attack to peak, decay to sustain, release
        // to zero at the end of the note.
        let note_gain = voice.gains[0];
        let env = plan.envelope;
        let attack = plan.note_secs * env.attack_ratio;
        let decay = plan.note_secs * env.decay_ratio;
        let release = plan.note_secs * env.release_ratio;
        graph.set_value_at(note_gain, Param::Gain, 0.0, now)?;
        graph.linear_ramp_to(note_gain, Param::Gain, ARP_PEAK_GAIN, now + attack)?;
        graph.linear_ramp_to(
            note_gain,
            Param::Gain,
            ARP_PEAK_GAIN * env.sustain_level,
            now + attack + decay,
        )?;
        graph.set_value_at(
            note_gain,
            Param::Gain,
            ARP_PEAK_GAIN * env.sustain_level,
            now + plan.note_secs - release,
        )?;
        graph.linear_ramp_to(note_gain, Param::Gain, 0.0, now + plan.note_secs)?;

        for &osc in &voice.oscillators {
            graph.start(osc)?;
        }
        self.pending.push(Teardown {
            due: now + plan.note_secs + NOTE_TAIL_SECS,
            nodes: voice.all_nodes(),
            slot: Some(slot),
        });
        self.occupy(graph, slot, voice)?;
        Ok(())
    }

    /// Retire the voice in `slot`, if any: fade its gains and queue the
    /// teardown. Idempotent; an empty slot is a no-op.
    pub fn retire(&mut self, graph: &dyn AudioGraph, slot: usize) -> GraphResult {
        if let Some(voice) = self.voices.remove(&slot) {
            self.fade_and_queue(graph, voice.gains.clone(), voice.all_nodes())?;
        }
        Ok(())
    }

    /// Retire every voice and release the master chain. Safe to call twice;
    /// the second call finds nothing tracked.
    pub fn stop_all(&mut self, graph: &dyn AudioGraph) -> GraphResult {
        let slots: Vec<usize> = self.voices.keys().copied().collect();
        for slot in slots {
            self.retire(graph, slot)?;
        }
        if let Some(chain) = self.master.take() {
            let mut nodes = chain.gains.clone();
            nodes.extend(&chain.aux);
            nodes.push(chain.input);
            nodes.sort();
            nodes.dedup();
            self.fade_and_queue(graph, chain.gains, nodes)?;
        }
        Ok(())
    }

    /// Execute every teardown whose due time has passed. Release errors are
    /// logged and swallowed per node.
    pub fn poll(&mut self, graph: &dyn AudioGraph) {
        let now = graph.now();
        let mut remaining = Vec::with_capacity(self.pending.len());
        for teardown in self.pending.drain(..) {
            if teardown.due <= now {
                if let Some(slot) = teardown.slot {
                    let same = self
                        .voices
                        .get(&slot)
                        .map(|v| v.all_nodes() == teardown.nodes)
                        .unwrap_or(false);
                    if same {
                        self.voices.remove(&slot);
                    }
                }
                for node in teardown.nodes {
                    if let Err(e) = graph.stop(node) {
                        log::debug!(target: "voices", "stop {:?}: {}", node, e);
                    }
                    if let Err(e) = graph.disconnect(node) {
                        log::debug!(target: "voices", "disconnect {:?}: {}", node, e);
                    }
                }
            } else {
                remaining.push(teardown);
            }
        }
        self.pending = remaining;
    }

    /// Earliest pending teardown, for the conductor's sleep calculation.
    pub fn next_due(&self) -> Option<f64> {
        self.pending
            .iter()
            .map(|t| t.due)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    fn occupy(&mut self, graph: &dyn AudioGraph, slot: usize, voice: Voice) -> GraphResult {
        // A held slot retires its incumbent first.
        self.retire(graph, slot)?;
        self.voices.insert(slot, voice);
        Ok(())
    }

    fn fade_and_queue(
        &mut self,
        graph: &dyn AudioGraph,
        gains: Vec<NodeId>,
        nodes: Vec<NodeId>,
    ) -> GraphResult {
        let now = graph.now();
        for gain in gains {
            graph.cancel_scheduled(gain, Param::Gain)?;
            graph.linear_ramp_to(gain, Param::Gain, 0.0, now + RELEASE_RAMP_SECS)?;
        }
        self.pending.push(Teardown {
            due: now + RELEASE_RAMP_SECS + TEARDOWN_DELAY_SECS,
            nodes,
            slot: None,
        });
        Ok(())
    }

    fn build_master(
        &mut self,
        graph: &dyn AudioGraph,
        gain: f64,
        limiter: &crate::graph::CompressorParams,
        reverb_impulse: Option<f64>,
    ) -> GraphResult<NodeId> {
        // Only one pipeline at a time; a leftover chain means stop_all was
        // skipped somewhere upstream.
        if self.master.is_some() {
            log::warn!(target: "voices", "master chain rebuilt without stop_all");
            self.stop_all(graph)?;
        }
        let bus = graph.create_gain(gain)?;
        let limiter_node = graph.create_compressor(*limiter)?;
        graph.connect(bus, limiter_node)?;
        let mut aux = vec![limiter_node];
        let tail = if let Some(impulse) = reverb_impulse {
            let reverb = graph.create_reverb(impulse, REVERB_DRY, REVERB_WET)?;
            graph.connect(limiter_node, reverb)?;
            aux.push(reverb);
            reverb
        } else {
            limiter_node
        };
        graph.connect(tail, graph.destination())?;
        self.master = Some(MasterChain {
            input: bus,
            gains: vec![bus],
            aux,
        });
        Ok(bus)
    }

    fn build_simple_voice(
        &self,
        graph: &dyn AudioGraph,
        frequency: f64,
        bus: NodeId,
    ) -> GraphResult<Voice> {
        let osc = graph.create_oscillator(Waveform::Sine, frequency)?;
        let gain = graph.create_gain(0.0)?;
        graph.connect(osc, gain)?;
        graph.connect(gain, bus)?;
        Ok(Voice {
            oscillators: vec![osc],
            gains: vec![gain],
            aux: Vec::new(),
        })
    }

    fn build_rich_voice(
        &self,
        graph: &dyn AudioGraph,
        frequency: f64,
        bus: NodeId,
        dimension: Dimension,
        now: f64,
    ) -> GraphResult<Voice> {
        let timbre = Timbre::for_dimension(dimension);

        let main = graph.create_oscillator(timbre.waveform, frequency)?;
        let main_gain = graph.create_gain(timbre.main_level)?;
        let sub = graph.create_oscillator(Waveform::Sine, frequency / 2.0)?;
        let sub_gain = graph.create_gain(timbre.sub_level)?;

        // FM modulator into the main oscillator's frequency.
        let fm = graph.create_oscillator(Waveform::Sine, frequency * 1.5)?;
        let fm_gain = graph.create_gain(frequency * timbre.fm_amount * 0.5)?;
        graph.connect(fm, fm_gain)?;
        graph.connect_to_frequency(fm_gain, main)?;

        // Filter with a slow three-step exponential wobble.
        let cutoff = (frequency * 3.0).min(FILTER_CEILING_HZ);
        let filter = graph.create_filter(timbre.filter, cutoff, timbre.filter_q)?;
        for i in 0..3 {
            let wobble = cutoff * (1.0 + 0.1 * (i as f64).sin());
            graph.exponential_ramp_to(filter, Param::Frequency, wobble, now + i as f64 * 0.3)?;
        }

        let compressor = graph.create_compressor(VOICE_COMPRESSOR)?;
        let note_gain = graph.create_gain(0.0)?;

        graph.connect(main, main_gain)?;
        graph.connect(sub, sub_gain)?;
        graph.connect(main_gain, filter)?;
        graph.connect(sub_gain, filter)?;
        graph.connect(filter, compressor)?;
        graph.connect(compressor, note_gain)?;
        graph.connect(note_gain, bus)?;

        Ok(Voice {
            oscillators: vec![main, sub, fm],
            // Note gain first: the envelope targets gains[0].
            gains: vec![note_gain, main_gain, sub_gain, fm_gain],
            aux: vec![filter, compressor],
        })
    }
}
