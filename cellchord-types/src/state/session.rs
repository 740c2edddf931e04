//! Whole-session state: the grid plus every user-facing knob.

use serde::{Deserialize, Serialize};

use crate::state::grid::{Dimension, Grid};
use crate::state::harmonics::HarmonicRatios;
use crate::state::rule::RuleCatalog;
use crate::state::step::step;

pub const MIN_BASE_FREQUENCY: f64 = 20.0;
pub const MAX_BASE_FREQUENCY: f64 = 1000.0;
pub const DEFAULT_BASE_FREQUENCY: f64 = 100.0;

pub const MIN_GENERATION_MS: u64 = 100;
pub const MAX_GENERATION_MS: u64 = 8000;
pub const DEFAULT_GENERATION_MS: u64 = 1000;

pub const MIN_GRID_SIZE: usize = 4;
pub const DEFAULT_GRID_SIZE: usize = 8;

/// Ordering applied when active cells are played as an arpeggio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArpMode {
    Off,
    Up,
    Down,
    UpDown,
    Random,
}

impl ArpMode {
    pub const ALL: [ArpMode; 5] = [
        ArpMode::Off,
        ArpMode::Up,
        ArpMode::Down,
        ArpMode::UpDown,
        ArpMode::Random,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArpMode::Off => "off",
            ArpMode::Up => "up",
            ArpMode::Down => "down",
            ArpMode::UpDown => "updown",
            ArpMode::Random => "random",
        }
    }

    pub fn from_name(name: &str) -> Option<ArpMode> {
        ArpMode::ALL.iter().copied().find(|m| m.name() == name)
    }

    pub fn cycle(self) -> ArpMode {
        let idx = ArpMode::ALL.iter().position(|&m| m == self).unwrap_or(0);
        ArpMode::ALL[(idx + 1) % ArpMode::ALL.len()]
    }
}

/// Playback phase of the generation engine.
///
/// Transitioning is entered on structural changes (dimension or grid size)
/// and suppresses ticks and audio until the conductor clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    Idle,
    Running,
    Transitioning,
}

/// Everything the engine and the audio side read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub grid: Grid,
    pub rules: RuleCatalog,
    pub ratios: HarmonicRatios,
    pub base_frequency: f64,
    pub generation_ms: u64,
    pub arp_mode: ArpMode,
    pub phase: EnginePhase,
    pub generation: u64,
    /// Seed/state of the session RNG, advanced by grid seeding and shuffles.
    pub rng: u64,
}

impl SessionState {
    pub fn new(seed: u64) -> Self {
        let mut rng = seed;
        let grid = Grid::random(Dimension::Two, DEFAULT_GRID_SIZE, &mut rng);
        Self {
            grid,
            rules: RuleCatalog::default(),
            ratios: HarmonicRatios::default(),
            base_frequency: DEFAULT_BASE_FREQUENCY,
            generation_ms: DEFAULT_GENERATION_MS,
            arp_mode: ArpMode::Off,
            phase: EnginePhase::Idle,
            generation: 0,
            rng,
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.grid.dimension()
    }

    pub fn grid_size(&self) -> usize {
        self.grid.size()
    }

    /// Clamp a requested side length to what the dimension supports.
    pub fn clamp_grid_size(dimension: Dimension, size: usize) -> usize {
        size.clamp(MIN_GRID_SIZE, dimension.max_grid_size())
    }

    /// Rebuild the grid with a fresh random seed, keeping dimension and size.
    pub fn reseed_grid(&mut self) {
        let mut rng = self.rng;
        self.grid = Grid::random(self.dimension(), self.grid_size(), &mut rng);
        self.rng = rng;
        self.generation = 0;
    }

    /// Replace the grid for a new dimension/size. Caller is responsible for
    /// entering the Transitioning phase around this.
    pub fn rebuild_grid(&mut self, dimension: Dimension, size: usize) {
        let size = Self::clamp_grid_size(dimension, size);
        let mut rng = self.rng;
        self.grid = Grid::random(dimension, size, &mut rng);
        self.rng = rng;
        self.generation = 0;
    }

    /// Advance one generation in place. Does nothing while Transitioning.
    pub fn advance(&mut self) {
        if self.phase == EnginePhase::Transitioning {
            return;
        }
        self.grid = step(&self.grid, self.rules.current());
        self.generation += 1;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(0x5eed_ce11)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_defaults() {
        let session = SessionState::new(7);
        assert_eq!(session.dimension(), Dimension::Two);
        assert_eq!(session.grid_size(), DEFAULT_GRID_SIZE);
        assert_eq!(session.base_frequency, DEFAULT_BASE_FREQUENCY);
        assert_eq!(session.generation_ms, DEFAULT_GENERATION_MS);
        assert_eq!(session.arp_mode, ArpMode::Off);
        assert_eq!(session.phase, EnginePhase::Idle);
        assert_eq!(session.generation, 0);
    }

    #[test]
    fn grid_size_clamps_per_dimension() {
        assert_eq!(SessionState::clamp_grid_size(Dimension::Two, 2), 4);
        assert_eq!(SessionState::clamp_grid_size(Dimension::Two, 99), 16);
        assert_eq!(SessionState::clamp_grid_size(Dimension::Four, 12), 8);
    }

    #[test]
    fn advance_is_suppressed_while_transitioning() {
        let mut session = SessionState::new(7);
        session.phase = EnginePhase::Transitioning;
        let before = session.grid.clone();
        session.advance();
        assert_eq!(session.grid, before);
        assert_eq!(session.generation, 0);
    }

    #[test]
    fn advance_increments_generation() {
        let mut session = SessionState::new(7);
        session.advance();
        session.advance();
        assert_eq!(session.generation, 2);
    }

    #[test]
    fn rebuild_grid_resets_generation_and_advances_rng() {
        let mut session = SessionState::new(7);
        session.advance();
        let rng_before = session.rng;
        session.rebuild_grid(Dimension::Three, 6);
        assert_eq!(session.dimension(), Dimension::Three);
        assert_eq!(session.grid_size(), 6);
        assert_eq!(session.generation, 0);
        assert_ne!(session.rng, rng_before);
    }

    #[test]
    fn arp_mode_cycles_through_all() {
        let mut mode = ArpMode::Off;
        for _ in 0..ArpMode::ALL.len() {
            mode = mode.cycle();
        }
        assert_eq!(mode, ArpMode::Off);
    }
}
