//! Audio graph trait: a semantic-level abstraction over audio node operations.
//!
//! `AudioGraph` captures what the sound side *means* to do (create an
//! oscillator, ramp a gain, schedule a value at a future clock time)
//! independently of how it's done (the DSP backend, or nothing at all).
//! This enables unit testing of voice and scheduling logic without any
//! audio output.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Result type for graph operations.
pub type GraphResult<T = ()> = Result<T, GraphError>;

/// Error from a graph operation.
#[derive(Debug, Clone)]
pub struct GraphError(pub String);

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for GraphError {}

impl From<String> for GraphError {
    fn from(s: String) -> Self {
        GraphError(s)
    }
}

impl From<std::io::Error> for GraphError {
    fn from(e: std::io::Error) -> Self {
        GraphError(e.to_string())
    }
}

/// Handle to a node owned by a graph implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Node id reserved for the graph's output destination.
pub const DESTINATION: NodeId = NodeId(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Triangle,
        Waveform::Sawtooth,
        Waveform::Square,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Square => "square",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    BandPass,
}

/// Dynamics compressor settings, WebAudio-shaped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    pub threshold_db: f64,
    pub knee_db: f64,
    pub ratio: f64,
    pub attack_secs: f64,
    pub release_secs: f64,
}

/// Which automatable parameter of a node a schedule call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Gain value of a gain node.
    Gain,
    /// Frequency of an oscillator or cutoff of a filter.
    Frequency,
}

/// Semantic-level audio graph.
///
/// All scheduling is against the graph's own monotonic clock (`now()`, in
/// seconds). Implementations must treat `stop` and `disconnect` on an
/// already-released node as success; double-teardown is part of the
/// contract, not an error.
pub trait AudioGraph: Send {
    /// Monotonic clock in seconds.
    fn now(&self) -> f64;

    fn create_oscillator(&self, waveform: Waveform, frequency: f64) -> GraphResult<NodeId>;
    fn create_gain(&self, value: f64) -> GraphResult<NodeId>;
    fn create_filter(&self, kind: FilterKind, frequency: f64, q: f64) -> GraphResult<NodeId>;
    fn create_compressor(&self, params: CompressorParams) -> GraphResult<NodeId>;
    /// Reverb sized from an impulse length in seconds, with fixed dry/wet.
    fn create_reverb(&self, impulse_secs: f64, dry: f64, wet: f64) -> GraphResult<NodeId>;

    /// Audio-rate connection from a node's output to another node's input.
    fn connect(&self, from: NodeId, to: NodeId) -> GraphResult;
    /// Modulation connection into an oscillator's frequency parameter.
    fn connect_to_frequency(&self, from: NodeId, osc: NodeId) -> GraphResult;

    /// The output node every chain ultimately reaches.
    fn destination(&self) -> NodeId {
        DESTINATION
    }

    fn set_value_at(&self, node: NodeId, param: Param, value: f64, at: f64) -> GraphResult;
    fn linear_ramp_to(&self, node: NodeId, param: Param, value: f64, at: f64) -> GraphResult;
    fn exponential_ramp_to(&self, node: NodeId, param: Param, value: f64, at: f64) -> GraphResult;
    fn cancel_scheduled(&self, node: NodeId, param: Param) -> GraphResult;

    fn start(&self, node: NodeId) -> GraphResult;
    fn stop(&self, node: NodeId) -> GraphResult;
    fn disconnect(&self, node: NodeId) -> GraphResult;
}

/// An operation recorded by `TestGraph` for assertion in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphOp {
    CreateOscillator {
        id: NodeId,
        waveform: Waveform,
        frequency: f64,
    },
    CreateGain {
        id: NodeId,
        value: f64,
    },
    CreateFilter {
        id: NodeId,
        kind: FilterKind,
        frequency: f64,
        q: f64,
    },
    CreateCompressor {
        id: NodeId,
        params: CompressorParams,
    },
    CreateReverb {
        id: NodeId,
        impulse_secs: f64,
        dry: f64,
        wet: f64,
    },
    Connect {
        from: NodeId,
        to: NodeId,
    },
    ConnectToFrequency {
        from: NodeId,
        osc: NodeId,
    },
    SetValueAt {
        node: NodeId,
        param: Param,
        value: f64,
        at: f64,
    },
    LinearRampTo {
        node: NodeId,
        param: Param,
        value: f64,
        at: f64,
    },
    ExponentialRampTo {
        node: NodeId,
        param: Param,
        value: f64,
        at: f64,
    },
    CancelScheduled {
        node: NodeId,
        param: Param,
    },
    Start(NodeId),
    Stop(NodeId),
    Disconnect(NodeId),
}

#[derive(Default)]
struct TestGraphState {
    ops: Vec<GraphOp>,
    next_id: u64,
    clock: f64,
}

/// Records every operation instead of making sound; interior mutability
/// so tests can share it behind `&`. The clock only moves when a test
/// calls `advance_clock`, which keeps scheduling assertions deterministic.
pub struct TestGraph {
    state: Mutex<TestGraphState>,
}

impl TestGraph {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TestGraphState {
                ops: Vec::new(),
                next_id: 1,
                clock: 0.0,
            }),
        }
    }

    pub fn advance_clock(&self, secs: f64) {
        self.state.lock().unwrap().clock += secs;
    }

    pub fn operations(&self) -> Vec<GraphOp> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn clear_operations(&self) {
        self.state.lock().unwrap().ops.clear();
    }

    pub fn count<F: Fn(&GraphOp) -> bool>(&self, f: F) -> usize {
        self.state.lock().unwrap().ops.iter().filter(|op| f(op)).count()
    }

    pub fn find<F: Fn(&GraphOp) -> bool>(&self, f: F) -> Option<GraphOp> {
        self.state.lock().unwrap().ops.iter().find(|op| f(op)).cloned()
    }

    pub fn oscillators_created(&self) -> Vec<GraphOp> {
        self.state
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter(|op| matches!(op, GraphOp::CreateOscillator { .. }))
            .cloned()
            .collect()
    }

    pub fn stopped_nodes(&self) -> Vec<NodeId> {
        self.state
            .lock()
            .unwrap()
            .ops
            .iter()
            .filter_map(|op| match op {
                GraphOp::Stop(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: GraphOp) {
        self.state.lock().unwrap().ops.push(op);
    }

    fn fresh_id(&self) -> NodeId {
        let mut state = self.state.lock().unwrap();
        let id = NodeId(state.next_id);
        state.next_id += 1;
        id
    }
}

impl Default for TestGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioGraph for TestGraph {
    fn now(&self) -> f64 {
        self.state.lock().unwrap().clock
    }

    fn create_oscillator(&self, waveform: Waveform, frequency: f64) -> GraphResult<NodeId> {
        let id = self.fresh_id();
        self.record(GraphOp::CreateOscillator {
            id,
            waveform,
            frequency,
        });
        Ok(id)
    }

    fn create_gain(&self, value: f64) -> GraphResult<NodeId> {
        let id = self.fresh_id();
        self.record(GraphOp::CreateGain { id, value });
        Ok(id)
    }

    fn create_filter(&self, kind: FilterKind, frequency: f64, q: f64) -> GraphResult<NodeId> {
        let id = self.fresh_id();
        self.record(GraphOp::CreateFilter {
            id,
            kind,
            frequency,
            q,
        });
        Ok(id)
    }

    fn create_compressor(&self, params: CompressorParams) -> GraphResult<NodeId> {
        let id = self.fresh_id();
        self.record(GraphOp::CreateCompressor { id, params });
        Ok(id)
    }

    fn create_reverb(&self, impulse_secs: f64, dry: f64, wet: f64) -> GraphResult<NodeId> {
        let id = self.fresh_id();
        self.record(GraphOp::CreateReverb {
            id,
            impulse_secs,
            dry,
            wet,
        });
        Ok(id)
    }

    fn connect(&self, from: NodeId, to: NodeId) -> GraphResult {
        self.record(GraphOp::Connect { from, to });
        Ok(())
    }

    fn connect_to_frequency(&self, from: NodeId, osc: NodeId) -> GraphResult {
        self.record(GraphOp::ConnectToFrequency { from, osc });
        Ok(())
    }

    fn set_value_at(&self, node: NodeId, param: Param, value: f64, at: f64) -> GraphResult {
        self.record(GraphOp::SetValueAt {
            node,
            param,
            value,
            at,
        });
        Ok(())
    }

    fn linear_ramp_to(&self, node: NodeId, param: Param, value: f64, at: f64) -> GraphResult {
        self.record(GraphOp::LinearRampTo {
            node,
            param,
            value,
            at,
        });
        Ok(())
    }

    fn exponential_ramp_to(&self, node: NodeId, param: Param, value: f64, at: f64) -> GraphResult {
        self.record(GraphOp::ExponentialRampTo {
            node,
            param,
            value,
            at,
        });
        Ok(())
    }

    fn cancel_scheduled(&self, node: NodeId, param: Param) -> GraphResult {
        self.record(GraphOp::CancelScheduled { node, param });
        Ok(())
    }

    fn start(&self, node: NodeId) -> GraphResult {
        self.record(GraphOp::Start(node));
        Ok(())
    }

    fn stop(&self, node: NodeId) -> GraphResult {
        // Double-stop is recorded but never an error.
        self.record(GraphOp::Stop(node));
        Ok(())
    }

    fn disconnect(&self, node: NodeId) -> GraphResult {
        self.record(GraphOp::Disconnect(node));
        Ok(())
    }
}

/// Graph that accepts everything and produces nothing. Used for headless
/// runs where the automaton should tick without audio output.
pub struct NullGraph {
    next_id: AtomicU64,
    started: Instant,
}

impl NullGraph {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            started: Instant::now(),
        }
    }

    fn fresh_id(&self) -> NodeId {
        NodeId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NullGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioGraph for NullGraph {
    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn create_oscillator(&self, _waveform: Waveform, _frequency: f64) -> GraphResult<NodeId> {
        Ok(self.fresh_id())
    }

    fn create_gain(&self, _value: f64) -> GraphResult<NodeId> {
        Ok(self.fresh_id())
    }

    fn create_filter(&self, _kind: FilterKind, _frequency: f64, _q: f64) -> GraphResult<NodeId> {
        Ok(self.fresh_id())
    }

    fn create_compressor(&self, _params: CompressorParams) -> GraphResult<NodeId> {
        Ok(self.fresh_id())
    }

    fn create_reverb(&self, _impulse_secs: f64, _dry: f64, _wet: f64) -> GraphResult<NodeId> {
        Ok(self.fresh_id())
    }

    fn connect(&self, _from: NodeId, _to: NodeId) -> GraphResult {
        Ok(())
    }

    fn connect_to_frequency(&self, _from: NodeId, _osc: NodeId) -> GraphResult {
        Ok(())
    }

    fn set_value_at(&self, _node: NodeId, _param: Param, _value: f64, _at: f64) -> GraphResult {
        Ok(())
    }

    fn linear_ramp_to(&self, _node: NodeId, _param: Param, _value: f64, _at: f64) -> GraphResult {
        Ok(())
    }

    fn exponential_ramp_to(&self, _node: NodeId, _param: Param, _value: f64, _at: f64) -> GraphResult {
        Ok(())
    }

    fn cancel_scheduled(&self, _node: NodeId, _param: Param) -> GraphResult {
        Ok(())
    }

    fn start(&self, _node: NodeId) -> GraphResult {
        Ok(())
    }

    fn stop(&self, _node: NodeId) -> GraphResult {
        Ok(())
    }

    fn disconnect(&self, _node: NodeId) -> GraphResult {
        Ok(())
    }
}
