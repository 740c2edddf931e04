//! Cell colouring for front ends, derived from the harmonic mapping.
//!
//! The hue/saturation/lightness of a cell come from its per-axis ratio
//! multipliers, so cells that sound related also look related. Axes beyond
//! the active dimension contribute a multiplier of 1.

use crate::state::grid::{Coord, Dimension};
use crate::state::harmonics::HarmonicRatios;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellColor {
    /// Degrees, 0..360.
    pub hue: f64,
    /// Percent, 0..100.
    pub saturation: f64,
    /// Percent, 0..100.
    pub lightness: f64,
}

impl CellColor {
    /// Convert to 8-bit RGB for terminal rendering.
    pub fn to_rgb(self) -> (u8, u8, u8) {
        let h = self.hue / 360.0;
        let s = self.saturation / 100.0;
        let l = self.lightness / 100.0;
        if s == 0.0 {
            let v = (l * 255.0).round() as u8;
            return (v, v, v);
        }
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let channel = |t: f64| {
            let t = t.rem_euclid(1.0);
            let v = if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            };
            (v * 255.0).round() as u8
        };
        (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
    }
}

fn axis_multiplier(ratios: &HarmonicRatios, dimension: Dimension, coord: Coord, axis: usize) -> f64 {
    if axis >= dimension.axis_count() {
        return 1.0;
    }
    ratios.axis(axis).value().powi(coord[axis] as i32)
}

/// Colour of a cell at `coord`.
pub fn cell_color(coord: Coord, ratios: &HarmonicRatios, dimension: Dimension) -> CellColor {
    let xm = axis_multiplier(ratios, dimension, coord, 0);
    let ym = axis_multiplier(ratios, dimension, coord, 1);
    let zm = axis_multiplier(ratios, dimension, coord, 2);
    let wm = axis_multiplier(ratios, dimension, coord, 3);
    CellColor {
        hue: (xm * 360.0).rem_euclid(360.0),
        saturation: (ym * 100.0).min(100.0),
        lightness: (zm * wm * 70.0 + 20.0).min(90.0),
    }
}
