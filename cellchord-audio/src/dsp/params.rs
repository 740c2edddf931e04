//! Time-scheduled parameter values: set, linear ramp, exponential ramp.
//!
//! Semantics follow the scheduling model the graph trait exposes: a ramp
//! event interpolates from the previous event's value (or the initial
//! value) to its own target over the interval between the two times.

/// Kind of a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SegmentKind {
    Set,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    at: f64,
    value: f64,
    kind: SegmentKind,
}

/// A parameter with a current value and a sorted schedule of future events.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledParam {
    initial: f64,
    segments: Vec<Segment>,
}

impl ScheduledParam {
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            segments: Vec::new(),
        }
    }

    fn push(&mut self, segment: Segment) {
        let idx = self
            .segments
            .partition_point(|s| s.at <= segment.at);
        self.segments.insert(idx, segment);
    }

    pub fn set_value_at(&mut self, value: f64, at: f64) {
        self.push(Segment {
            at,
            value,
            kind: SegmentKind::Set,
        });
    }

    pub fn linear_ramp_to(&mut self, value: f64, at: f64) {
        self.push(Segment {
            at,
            value,
            kind: SegmentKind::Linear,
        });
    }

    pub fn exponential_ramp_to(&mut self, value: f64, at: f64) {
        self.push(Segment {
            at,
            value,
            kind: SegmentKind::Exponential,
        });
    }

    /// Drop every event scheduled after `now`, freezing the parameter at
    /// its value at that time.
    pub fn cancel_after(&mut self, now: f64) {
        let frozen = self.value_at(now);
        self.initial = frozen;
        self.segments.clear();
    }

    /// Value at time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        let mut prev_at = f64::NEG_INFINITY;
        let mut prev_value = self.initial;
        for segment in &self.segments {
            if segment.at <= t {
                prev_at = segment.at;
                prev_value = segment.value;
                continue;
            }
            // First future event: ramps interpolate from the last value.
            return match segment.kind {
                SegmentKind::Set => prev_value,
                SegmentKind::Linear => {
                    let start = if prev_at.is_finite() { prev_at } else { segment.at };
                    if segment.at <= start {
                        segment.value
                    } else {
                        let frac = ((t - start) / (segment.at - start)).clamp(0.0, 1.0);
                        prev_value + (segment.value - prev_value) * frac
                    }
                }
                SegmentKind::Exponential => {
                    let start = if prev_at.is_finite() { prev_at } else { segment.at };
                    if segment.at <= start || prev_value <= 0.0 || segment.value <= 0.0 {
                        segment.value
                    } else {
                        let frac = ((t - start) / (segment.at - start)).clamp(0.0, 1.0);
                        prev_value * (segment.value / prev_value).powf(frac)
                    }
                }
            };
        }
        prev_value
    }
}
