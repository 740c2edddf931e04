//! Generation stepping: rule evaluation per cell and the simultaneous
//! whole-grid update.

use crate::state::grid::{Cell, Coord, Grid, CELL_ALIVE, CELL_DEAD, CELL_DYING};
use crate::state::neighborhood::{count_moore, count_von_neumann};
use crate::state::rule::{RuleKind, RuleSpec};

/// Next state of a single cell under the given rule.
pub fn next_cell(
    rule: RuleSpec,
    grid: &Grid,
    coord: Coord,
    moore: u8,
    von_neumann: u8,
) -> Cell {
    let cell = grid.get(coord);
    match rule.kind {
        RuleKind::Binary { birth, survival } => {
            if cell != CELL_DEAD {
                if survival.contains(moore) {
                    CELL_ALIVE
                } else {
                    CELL_DEAD
                }
            } else if birth.contains(moore) {
                CELL_ALIVE
            } else {
                CELL_DEAD
            }
        }
        RuleKind::ThreeState => match cell {
            CELL_DYING => CELL_DEAD,
            CELL_ALIVE => CELL_DYING,
            _ => {
                if moore == 2 {
                    CELL_ALIVE
                } else {
                    CELL_DEAD
                }
            }
        },
        RuleKind::Vote => {
            let self_vote = if cell != CELL_DEAD { 1 } else { 0 };
            if von_neumann + self_vote >= grid.dimension().vote_threshold() {
                CELL_ALIVE
            } else {
                CELL_DEAD
            }
        }
    }
}

/// Compute the next generation. Every cell is evaluated against the current
/// grid; the result is a fresh buffer, never an in-place update.
pub fn step(grid: &Grid, rule: RuleSpec) -> Grid {
    let mut next = Grid::empty(grid.dimension(), grid.size());
    let needs_vn = matches!(rule.kind, RuleKind::Vote);
    for coord in grid.coords() {
        let moore = count_moore(grid, coord);
        let von_neumann = if needs_vn {
            count_von_neumann(grid, coord)
        } else {
            0
        };
        next.set(coord, next_cell(rule, grid, coord, moore, von_neumann));
    }
    next
}
