pub mod grid;
pub mod harmonics;
pub mod neighborhood;
pub mod rule;
pub mod session;
pub mod step;

pub use grid::{Cell, Coord, Dimension, Grid, CELL_ALIVE, CELL_DEAD, CELL_DYING};
pub use harmonics::{AxisRatio, HarmonicRatios};
pub use neighborhood::{count_moore, count_von_neumann};
pub use rule::{NeighborSet, RuleCatalog, RuleId, RuleKind, RuleSpec};
pub use session::{ArpMode, EnginePhase, SessionState};
pub use step::{next_cell, step};
