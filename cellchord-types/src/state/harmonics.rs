//! Just-intonation mapping from grid coordinates to frequencies.
//!
//! Each axis carries a frequency ratio; a cell's pitch is the base frequency
//! multiplied by every active axis's ratio raised to the coordinate value on
//! that axis. Axes beyond the current dimension contribute nothing. The map
//! is pure, so planners can sort cells by derived pitch without side effects.

use serde::{Deserialize, Serialize};

use crate::state::grid::{Coord, Dimension};

/// One axis's interval as an integer ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisRatio {
    pub numerator: u32,
    pub denominator: u32,
}

impl AxisRatio {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn value(self) -> f64 {
        if self.denominator == 0 {
            return 1.0;
        }
        self.numerator as f64 / self.denominator as f64
    }
}

impl std::fmt::Display for AxisRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Ratio assignment for all four possible axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmonicRatios {
    pub x: AxisRatio,
    pub y: AxisRatio,
    pub z: AxisRatio,
    pub w: AxisRatio,
}

impl Default for HarmonicRatios {
    fn default() -> Self {
        Self {
            x: AxisRatio::new(8, 7),
            y: AxisRatio::new(3, 2),
            z: AxisRatio::new(6, 5),
            w: AxisRatio::new(11, 12),
        }
    }
}

impl HarmonicRatios {
    pub fn axis(&self, axis: usize) -> AxisRatio {
        match axis {
            0 => self.x,
            1 => self.y,
            2 => self.z,
            _ => self.w,
        }
    }

    pub fn set_axis(&mut self, axis: usize, ratio: AxisRatio) {
        match axis {
            0 => self.x = ratio,
            1 => self.y = ratio,
            2 => self.z = ratio,
            _ => self.w = ratio,
        }
    }

    /// Frequency of a cell: `base * prod(ratio_i ^ coord_i)` over the axes
    /// of the active dimension.
    pub fn frequency(&self, coord: Coord, dimension: Dimension, base: f64) -> f64 {
        let mut freq = base;
        for axis in 0..dimension.axis_count() {
            freq *= self.axis(axis).value().powi(coord[axis] as i32);
        }
        freq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_base_frequency() {
        let ratios = HarmonicRatios::default();
        for dimension in Dimension::ALL {
            let freq = ratios.frequency([0, 0, 0, 0], dimension, 100.0);
            assert!((freq - 100.0).abs() < 1e-9, "{}", dimension);
        }
    }

    #[test]
    fn frequency_is_monotonic_when_ratio_above_one() {
        let ratios = HarmonicRatios::default();
        let mut last = 0.0;
        for x in 0..8 {
            let freq = ratios.frequency([x, 0, 0, 0], Dimension::One, 100.0);
            assert!(freq > last);
            last = freq;
        }
    }

    #[test]
    fn inactive_axes_are_ignored() {
        let ratios = HarmonicRatios::default();
        let a = ratios.frequency([2, 3, 0, 0], Dimension::Two, 100.0);
        let b = ratios.frequency([2, 3, 5, 7], Dimension::Two, 100.0);
        assert_eq!(a, b);
    }

    #[test]
    fn ratio_below_one_lowers_pitch() {
        let ratios = HarmonicRatios::default();
        let base = ratios.frequency([0, 0, 0, 0], Dimension::Four, 100.0);
        let lowered = ratios.frequency([0, 0, 0, 1], Dimension::Four, 100.0);
        assert!(lowered < base);
        assert!((lowered - base * 11.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn axes_multiply_together() {
        let ratios = HarmonicRatios::default();
        let freq = ratios.frequency([1, 1, 0, 0], Dimension::Two, 100.0);
        let want = 100.0 * (8.0 / 7.0) * (3.0 / 2.0);
        assert!((freq - want).abs() < 1e-9);
    }

    #[test]
    fn zero_denominator_is_inert() {
        assert_eq!(AxisRatio::new(5, 0).value(), 1.0);
    }
}
