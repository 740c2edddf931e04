//! Toroidal cell grid for 1 to 4 dimensions.
//!
//! The grid is a pure value array: a flat buffer of `size^d` cells addressed
//! by the linear index `sum(coord[i] * size^i)`. Storing the rank alongside
//! the buffer avoids dimension-specific branching everywhere else; the
//! neighborhood counter iterates delta vectors generically for any rank.

use serde::{Deserialize, Serialize};

/// Cell state. 0 is dead; anything non-zero is "truthy" both for neighbor
/// counting and for the active-cell set fed to the sonifier.
pub type Cell = u8;

pub const CELL_DEAD: Cell = 0;
pub const CELL_ALIVE: Cell = 1;
/// "Dying" state used only by the three-state decay rule.
pub const CELL_DYING: Cell = 2;

/// Coordinate tuple. Axes beyond the active dimension are held at 0.
pub type Coord = [usize; 4];

/// Grid rank, fixed for the lifetime of a `Grid` instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dimension {
    One,
    Two,
    Three,
    Four,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::One,
        Dimension::Two,
        Dimension::Three,
        Dimension::Four,
    ];

    /// Number of axes.
    pub fn axis_count(self) -> usize {
        match self {
            Dimension::One => 1,
            Dimension::Two => 2,
            Dimension::Three => 3,
            Dimension::Four => 4,
        }
    }

    /// `3^d - 1`: full Moore neighborhood size.
    pub fn max_moore_neighbors(self) -> u8 {
        match self {
            Dimension::One => 2,
            Dimension::Two => 8,
            Dimension::Three => 26,
            Dimension::Four => 80,
        }
    }

    /// `2 * d`: von Neumann neighborhood size.
    pub fn max_von_neumann_neighbors(self) -> u8 {
        2 * self.axis_count() as u8
    }

    /// Majority threshold for the vote rule (neighbors + self).
    pub fn vote_threshold(self) -> u8 {
        match self {
            Dimension::One => 2,
            Dimension::Two => 4,
            Dimension::Three => 5,
            Dimension::Four => 7,
        }
    }

    /// Largest supported side length. 4D grids are capped to keep the cell
    /// count (and the 80-neighbor Moore scans) bounded.
    pub fn max_grid_size(self) -> usize {
        match self {
            Dimension::Four => 8,
            _ => 16,
        }
    }

    pub fn from_axis_count(n: usize) -> Option<Dimension> {
        match n {
            1 => Some(Dimension::One),
            2 => Some(Dimension::Two),
            3 => Some(Dimension::Three),
            4 => Some(Dimension::Four),
            _ => None,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}D", self.axis_count())
    }
}

/// Probability that a freshly seeded cell starts alive.
const SEED_ALIVE_DENSITY: f64 = 0.3;

/// An N-dimensional toroidal grid of cells.
///
/// Replacing the whole grid is the only supported resize; `Grid` is cheap to
/// rebuild (at most 16^3 or 8^4 cells) and the generation step already
/// produces a fresh buffer every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    dimension: Dimension,
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an all-dead grid.
    pub fn empty(dimension: Dimension, size: usize) -> Self {
        let len = size.pow(dimension.axis_count() as u32);
        Self {
            dimension,
            size,
            cells: vec![CELL_DEAD; len],
        }
    }

    /// Create a grid seeded with ~30% alive density. Three-state rules start
    /// from the same binary seeding; the dying state never appears at init.
    pub fn random(dimension: Dimension, size: usize, rng: &mut u64) -> Self {
        let mut grid = Self::empty(dimension, size);
        for cell in &mut grid.cells {
            *rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let roll = (*rng >> 33) as f64 / (1u64 << 31) as f64;
            *cell = if roll < SEED_ALIVE_DENSITY {
                CELL_ALIVE
            } else {
                CELL_DEAD
            };
        }
        grid
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Linear index of a coordinate: `sum(coord[i] * size^i)`.
    fn linear_index(&self, coord: Coord) -> usize {
        let mut index = 0;
        let mut stride = 1;
        for axis in 0..self.dimension.axis_count() {
            index += coord[axis] * stride;
            stride *= self.size;
        }
        index
    }

    /// Inverse of `linear_index`; unused axes come back as 0.
    fn coord_of(&self, mut index: usize) -> Coord {
        let mut coord = [0usize; 4];
        for axis in 0..self.dimension.axis_count() {
            coord[axis] = index % self.size;
            index /= self.size;
        }
        coord
    }

    pub fn get(&self, coord: Coord) -> Cell {
        self.cells[self.linear_index(coord)]
    }

    pub fn set(&mut self, coord: Coord, value: Cell) {
        let idx = self.linear_index(coord);
        self.cells[idx] = value;
    }

    /// Coordinates of every truthy (non-zero) cell, in linear-index order.
    pub fn active_cells(&self) -> Vec<Coord> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &cell)| cell != CELL_DEAD)
            .map(|(idx, _)| self.coord_of(idx))
            .collect()
    }

    pub fn alive_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != CELL_DEAD).count()
    }

    /// Iterate every coordinate of the grid in linear-index order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.cells.len()).map(|idx| self.coord_of(idx))
    }

    /// Toroidal offset along one axis: `(value + delta + size) % size`.
    pub fn wrap(&self, value: usize, delta: i32) -> usize {
        let size = self.size as i64;
        ((value as i64 + delta as i64 + size) % size) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_grid_has_size_pow_dimension_cells() {
        for dimension in Dimension::ALL {
            let grid = Grid::empty(dimension, 4);
            assert_eq!(grid.cell_count(), 4usize.pow(dimension.axis_count() as u32));
            assert_eq!(grid.alive_count(), 0);
        }
    }

    #[test]
    fn get_set_round_trip() {
        let mut grid = Grid::empty(Dimension::Three, 5);
        grid.set([1, 2, 3, 0], CELL_ALIVE);
        assert_eq!(grid.get([1, 2, 3, 0]), CELL_ALIVE);
        assert_eq!(grid.get([3, 2, 1, 0]), CELL_DEAD);
    }

    #[test]
    fn wrap_is_toroidal_at_both_edges() {
        let grid = Grid::empty(Dimension::Two, 8);
        assert_eq!(grid.wrap(0, -1), 7);
        assert_eq!(grid.wrap(7, 1), 0);
        assert_eq!(grid.wrap(3, 0), 3);
    }

    #[test]
    fn random_seed_density_is_roughly_thirty_percent() {
        let mut rng = 12345u64;
        let grid = Grid::random(Dimension::Two, 16, &mut rng);
        let density = grid.alive_count() as f64 / grid.cell_count() as f64;
        assert!(density > 0.15 && density < 0.45, "density {}", density);
    }

    #[test]
    fn random_seed_never_produces_dying_cells() {
        let mut rng = 98765u64;
        let grid = Grid::random(Dimension::Three, 8, &mut rng);
        assert!(grid.coords().all(|c| grid.get(c) != CELL_DYING));
    }

    #[test]
    fn active_cells_match_alive_count() {
        let mut rng = 424242u64;
        let grid = Grid::random(Dimension::Four, 4, &mut rng);
        assert_eq!(grid.active_cells().len(), grid.alive_count());
    }

    #[test]
    fn coord_of_inverts_linear_index() {
        let grid = Grid::empty(Dimension::Four, 6);
        for (idx, coord) in grid.coords().enumerate() {
            assert_eq!(grid.linear_index(coord), idx);
        }
    }

    #[test]
    fn dimension_tables() {
        assert_eq!(Dimension::One.max_moore_neighbors(), 2);
        assert_eq!(Dimension::Four.max_moore_neighbors(), 80);
        assert_eq!(Dimension::Three.max_von_neumann_neighbors(), 6);
        assert_eq!(Dimension::Four.max_grid_size(), 8);
        assert_eq!(Dimension::Two.max_grid_size(), 16);
    }
}
