//! Neighbor counting over the toroidal grid.
//!
//! Both counters work for any rank by walking delta vectors generically:
//! Moore enumerates every combination of {-1, 0, +1} per active axis with an
//! odometer (skipping the all-zero vector), von Neumann visits the `2 * d`
//! unit offsets. A neighbor counts when it is truthy (non-zero), so the
//! three-state decay rule's dying cells still contribute.

use crate::state::grid::{Coord, Grid, CELL_DEAD};

/// Count truthy cells in the full Moore neighborhood (`3^d - 1` sites).
pub fn count_moore(grid: &Grid, center: Coord) -> u8 {
    let axes = grid.dimension().axis_count();
    let mut deltas = [-1i32; 4];
    let mut count = 0u8;
    loop {
        if deltas[..axes].iter().any(|&d| d != 0) {
            let mut neighbor = [0usize; 4];
            for axis in 0..axes {
                neighbor[axis] = grid.wrap(center[axis], deltas[axis]);
            }
            if grid.get(neighbor) != CELL_DEAD {
                count += 1;
            }
        }
        // Odometer increment over {-1, 0, +1} per axis.
        let mut axis = 0;
        loop {
            if axis == axes {
                return count;
            }
            deltas[axis] += 1;
            if deltas[axis] <= 1 {
                break;
            }
            deltas[axis] = -1;
            axis += 1;
        }
    }
}

/// Count truthy cells in the von Neumann neighborhood (`2 * d` unit offsets).
pub fn count_von_neumann(grid: &Grid, center: Coord) -> u8 {
    let axes = grid.dimension().axis_count();
    let mut count = 0u8;
    for axis in 0..axes {
        for delta in [-1i32, 1] {
            let mut neighbor = center;
            neighbor[axis] = grid.wrap(center[axis], delta);
            if grid.get(neighbor) != CELL_DEAD {
                count += 1;
            }
        }
    }
    count
}
