//! Reducer for base frequency and axis ratios.

use crate::action::TuningAction;
use crate::state::session::{SessionState, MAX_BASE_FREQUENCY, MIN_BASE_FREQUENCY};

pub fn reduce(action: &TuningAction, session: &mut SessionState) -> bool {
    match action {
        TuningAction::SetBaseFrequency(freq) => {
            let freq = freq.clamp(MIN_BASE_FREQUENCY, MAX_BASE_FREQUENCY);
            if (freq - session.base_frequency).abs() < f64::EPSILON {
                return false;
            }
            session.base_frequency = freq;
            true
        }
        TuningAction::SetAxisRatio(axis, ratio) => {
            if *axis > 3 || ratio.denominator == 0 || ratio.numerator == 0 {
                return false;
            }
            if session.ratios.axis(*axis) == *ratio {
                return false;
            }
            session.ratios.set_axis(*axis, *ratio);
            true
        }
    }
}
