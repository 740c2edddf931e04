//! The conductor: generation timing, arpeggio self-rescheduling, structural
//! transitions, and the glue between reduced state and the audio graph.
//!
//! Everything runs single-threaded and cooperatively. The conductor keeps
//! explicit due times (generation tick, next arp note, transition end) and
//! a voice bank with its own deferred teardowns; `tick` fires whatever is
//! due against the graph clock and `next_due` tells the caller how long it
//! may sleep. Cancellation order on any halt is fixed: the arp reschedule
//! entry is dropped first, then voices are retired.

use cellchord_types::{
    reduce::reduce, Action, ArpMode, EnginePhase, PlaybackAction, SessionState, TransportAction,
};

use crate::graph::{AudioGraph, GraphResult};
use crate::planner::{arp_plan, chord_plan, ArpPlan};
use crate::telemetry::{TickSummary, TickTelemetry};
use crate::voices::VoiceBank;

/// Settle time after a structural grid change before the phase returns to
/// Idle.
pub const TRANSITION_SECS: f64 = 0.3;
/// Tick lateness above this counts as an overrun in telemetry.
const OVERRUN_BUDGET_US: u32 = 10_000;

/// The looping arpeggio: the realized plan plus the next note's due time.
struct ArpRun {
    plan: ArpPlan,
    next_index: usize,
    due: f64,
}

/// Owns the session, the voice bank, and all scheduled work.
pub struct Conductor {
    session: SessionState,
    bank: VoiceBank,
    telemetry: TickTelemetry,
    next_tick_due: Option<f64>,
    transition_end: Option<f64>,
    arp: Option<ArpRun>,
}

impl Conductor {
    pub fn new(session: SessionState) -> Self {
        Self {
            session,
            bank: VoiceBank::new(),
            telemetry: TickTelemetry::new(),
            next_tick_due: None,
            transition_end: None,
            arp: None,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn active_voices(&self) -> usize {
        self.bank.active_voices()
    }

    pub fn telemetry_summary(&mut self) -> TickSummary {
        self.telemetry.take_summary()
    }

    fn period_secs(&self) -> f64 {
        self.session.generation_ms as f64 / 1000.0
    }

    /// Apply a control action and reconcile the audio side with whatever
    /// the reducer changed. Returns true if the state changed.
    pub fn apply(&mut self, graph: &dyn AudioGraph, action: &Action) -> GraphResult<bool> {
        let prior_mode = self.session.arp_mode;
        let changed = reduce(action, &mut self.session);
        if !changed {
            return Ok(false);
        }

        if self.session.phase == EnginePhase::Transitioning {
            // Structural change: silence first, settle later.
            self.halt_audio(graph)?;
            self.next_tick_due = None;
            self.transition_end = Some(graph.now() + TRANSITION_SECS);
            return Ok(true);
        }

        match action {
            Action::Transport(TransportAction::Start) => {
                self.start_pipeline(graph)?;
                self.next_tick_due = Some(graph.now() + self.period_secs());
            }
            Action::Transport(TransportAction::Stop) => {
                self.halt_audio(graph)?;
                self.next_tick_due = None;
            }
            Action::Transport(TransportAction::Step)
            | Action::Transport(TransportAction::Reset) => {
                // Audible only while running; a paused step is silent.
                if self.session.phase == EnginePhase::Running {
                    self.start_pipeline(graph)?;
                }
            }
            Action::Playback(PlaybackAction::SetArpMode(_))
            | Action::Playback(PlaybackAction::CycleArpMode) => {
                if self.session.arp_mode != prior_mode {
                    self.halt_audio(graph)?;
                    if self.session.phase == EnginePhase::Running {
                        self.start_pipeline(graph)?;
                    }
                }
            }
            _ => {}
        }
        Ok(true)
    }

    /// Fire everything that is due: transition settle, generation tick,
    /// next arp note, deferred teardowns.
    pub fn tick(&mut self, graph: &dyn AudioGraph) -> GraphResult {
        let now = graph.now();

        if let Some(end) = self.transition_end {
            if now >= end {
                self.transition_end = None;
                self.session.phase = EnginePhase::Idle;
                log::debug!(target: "conductor", "transition settled");
            }
        }

        if self.session.phase == EnginePhase::Running {
            if let Some(due) = self.next_tick_due {
                if now >= due {
                    self.telemetry.record(now - due, OVERRUN_BUDGET_US);
                    self.session.advance();
                    self.start_pipeline(graph)?;
                    // Schedule from the due time, not from now, so jitter
                    // does not accumulate into drift.
                    self.next_tick_due = Some(due + self.period_secs());
                }
            }
        }

        if let Some(run) = self.arp.as_mut() {
            if now >= run.due {
                let slot = run.next_index;
                let note = run.plan.notes[slot];
                let dimension = self.session.dimension();
                self.bank
                    .realize_arp_note(graph, &run.plan, &note, slot, dimension)?;
                run.due += run.plan.note_secs;
                run.next_index = (run.next_index + 1) % run.plan.notes.len();
            }
        }

        self.bank.poll(graph);
        Ok(())
    }

    /// Earliest future deadline, if any. Callers sleep until then.
    pub fn next_due(&self) -> Option<f64> {
        let mut due = self.transition_end;
        if self.session.phase == EnginePhase::Running {
            due = min_due(due, self.next_tick_due);
        }
        due = min_due(due, self.arp.as_ref().map(|run| run.due));
        min_due(due, self.bank.next_due())
    }

    /// Cancel the arp reschedule, then retire every voice. This exact order
    /// keeps an orphaned timer from firing into a dying pipeline.
    fn halt_audio(&mut self, graph: &dyn AudioGraph) -> GraphResult {
        self.arp = None;
        self.bank.stop_all(graph)
    }

    /// Stop whatever sounded before and realize the current active set as
    /// either a chord or a fresh arpeggio loop.
    fn start_pipeline(&mut self, graph: &dyn AudioGraph) -> GraphResult {
        self.halt_audio(graph)?;
        if self.session.phase != EnginePhase::Running {
            return Ok(());
        }
        let cells = self.session.grid.active_cells();
        if cells.is_empty() {
            return Ok(());
        }
        let dimension = self.session.dimension();
        if self.session.arp_mode == ArpMode::Off || cells.len() <= 1 {
            let plan = chord_plan(
                &cells,
                &self.session.ratios,
                dimension,
                self.session.base_frequency,
            );
            self.bank.realize_chord(graph, &plan, dimension)?;
        } else {
            let mut rng = self.session.rng;
            let plan = arp_plan(
                &cells,
                &self.session.ratios,
                dimension,
                self.session.base_frequency,
                self.session.generation_ms,
                self.session.arp_mode,
                &mut rng,
            );
            self.session.rng = rng;
            if let Some(plan) = plan {
                self.bank.realize_arp_master(graph, &plan, dimension)?;
                self.bank
                    .realize_arp_note(graph, &plan, &plan.notes[0], 0, dimension)?;
                self.arp = Some(ArpRun {
                    due: graph.now() + plan.note_secs,
                    next_index: 1 % plan.notes.len(),
                    plan,
                });
            }
        }
        Ok(())
    }
}

fn min_due(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphOp, TestGraph};
    use cellchord_types::{Dimension, GridAction, PlaybackAction};

    fn conductor_with_cells(cells: &[[usize; 4]]) -> Conductor {
        let mut session = SessionState::new(1);
        let mut grid = cellchord_types::Grid::empty(Dimension::Two, 4);
        for &coord in cells {
            grid.set(coord, cellchord_types::CELL_ALIVE);
        }
        session.grid = grid;
        Conductor::new(session)
    }

    #[test]
    fn start_sounds_current_generation_and_schedules_tick() {
        let graph = TestGraph::new();
        let mut c = conductor_with_cells(&[[0, 0, 0, 0], [1, 0, 0, 0]]);
        c.apply(&graph, &Action::Transport(TransportAction::Start))
            .unwrap();
        assert_eq!(c.session().phase, EnginePhase::Running);
        assert_eq!(c.active_voices(), 2);
        assert!((c.next_due().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn generation_tick_advances_and_restarts_pipeline() {
        let graph = TestGraph::new();
        let mut c = conductor_with_cells(&[[0, 0, 0, 0], [1, 0, 0, 0]]);
        c.apply(&graph, &Action::Transport(TransportAction::Start))
            .unwrap();
        graph.advance_clock(1.0);
        c.tick(&graph).unwrap();
        assert_eq!(c.session().generation, 1);
        // Drain the retirement teardowns from the pipeline swap, then the
        // only deadline left is the next tick, one period after the last due.
        graph.advance_clock(0.3);
        c.tick(&graph).unwrap();
        assert!(c
            .next_due()
            .map(|d| (d - 2.0).abs() < 1e-9)
            .unwrap_or(false));
    }

    #[test]
    fn stop_halts_audio_and_clears_tick() {
        let graph = TestGraph::new();
        let mut c = conductor_with_cells(&[[0, 0, 0, 0], [1, 0, 0, 0]]);
        c.apply(&graph, &Action::Transport(TransportAction::Start))
            .unwrap();
        c.apply(&graph, &Action::Transport(TransportAction::Stop))
            .unwrap();
        assert_eq!(c.session().phase, EnginePhase::Idle);
        assert_eq!(c.active_voices(), 0);
        // Only pending teardowns remain on the schedule.
        graph.advance_clock(1.0);
        c.tick(&graph).unwrap();
        assert_eq!(c.next_due(), None);
    }

    #[test]
    fn arp_mode_loops_notes_and_wraps() {
        let graph = TestGraph::new();
        let mut c = conductor_with_cells(&[[0, 0, 0, 0], [1, 0, 0, 0], [2, 0, 0, 0]]);
        c.apply(
            &graph,
            &Action::Playback(PlaybackAction::SetArpMode(ArpMode::Up)),
        )
        .unwrap();
        // Long period so the loop wraps before the next generation tick.
        c.apply(
            &graph,
            &Action::Playback(PlaybackAction::SetGenerationMs(8000)),
        )
        .unwrap();
        c.apply(&graph, &Action::Transport(TransportAction::Start))
            .unwrap();
        // First note realized immediately; the rest follow one note apart.
        let note_secs = 8.0 * 0.95 / 3.0;
        assert_eq!(c.active_voices(), 1);

        graph.advance_clock(note_secs + 0.001);
        c.tick(&graph).unwrap();
        graph.advance_clock(note_secs);
        c.tick(&graph).unwrap();
        graph.advance_clock(note_secs);
        c.tick(&graph).unwrap();
        // Fourth realization wrapped back to slot 0.
        assert_eq!(graph.count(|op| matches!(op, GraphOp::CreateReverb { .. })), 1);
        assert!(graph.oscillators_created().len() >= 4);
    }

    #[test]
    fn changing_arp_mode_cancels_the_loop_first() {
        let graph = TestGraph::new();
        let mut c = conductor_with_cells(&[[0, 0, 0, 0], [1, 0, 0, 0], [2, 0, 0, 0]]);
        c.apply(
            &graph,
            &Action::Playback(PlaybackAction::SetArpMode(ArpMode::Up)),
        )
        .unwrap();
        c.apply(&graph, &Action::Transport(TransportAction::Start))
            .unwrap();
        c.apply(
            &graph,
            &Action::Playback(PlaybackAction::SetArpMode(ArpMode::Off)),
        )
        .unwrap();
        // The old loop is gone: advancing past a note time fires no new arp
        // notes, and the pipeline is now a chord.
        let before = graph.oscillators_created().len();
        graph.advance_clock(0.5);
        c.tick(&graph).unwrap();
        assert_eq!(graph.oscillators_created().len(), before);
        assert_eq!(c.active_voices(), 3);
    }

    #[test]
    fn structural_change_transitions_then_settles_idle() {
        let graph = TestGraph::new();
        let mut c = conductor_with_cells(&[[0, 0, 0, 0], [1, 0, 0, 0]]);
        c.apply(&graph, &Action::Transport(TransportAction::Start))
            .unwrap();
        c.apply(&graph, &Action::Grid(GridAction::SetDimension(Dimension::Three)))
            .unwrap();
        assert_eq!(c.session().phase, EnginePhase::Transitioning);
        assert_eq!(c.active_voices(), 0);

        // Ticks are suppressed while transitioning.
        graph.advance_clock(0.1);
        c.tick(&graph).unwrap();
        assert_eq!(c.session().generation, 0);

        graph.advance_clock(TRANSITION_SECS);
        c.tick(&graph).unwrap();
        assert_eq!(c.session().phase, EnginePhase::Idle);
    }

    #[test]
    fn step_while_idle_is_silent() {
        let graph = TestGraph::new();
        let mut c = conductor_with_cells(&[[0, 0, 0, 0], [1, 0, 0, 0]]);
        c.apply(&graph, &Action::Transport(TransportAction::Step))
            .unwrap();
        assert_eq!(c.session().generation, 1);
        assert_eq!(c.active_voices(), 0);
        assert_eq!(graph.oscillators_created().len(), 0);
    }

    #[test]
    fn empty_grid_makes_no_sound() {
        let graph = TestGraph::new();
        let mut c = conductor_with_cells(&[]);
        c.apply(&graph, &Action::Transport(TransportAction::Start))
            .unwrap();
        assert_eq!(c.active_voices(), 0);
        assert_eq!(graph.oscillators_created().len(), 0);
    }

    #[test]
    fn single_cell_plays_as_chord_even_in_arp_mode() {
        let graph = TestGraph::new();
        let mut c = conductor_with_cells(&[[2, 2, 0, 0]]);
        c.apply(
            &graph,
            &Action::Playback(PlaybackAction::SetArpMode(ArpMode::Random)),
        )
        .unwrap();
        c.apply(&graph, &Action::Transport(TransportAction::Start))
            .unwrap();
        assert_eq!(c.active_voices(), 1);
        assert!(graph
            .find(|op| matches!(op, GraphOp::CreateReverb { .. }))
            .is_none());
    }
}
