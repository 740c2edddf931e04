//! Generation-tick telemetry for jitter monitoring.
//!
//! Collects how late each generation tick fired relative to its due time,
//! in a fixed-size ring buffer with no allocation on the record path.

/// Ring buffer size for tick lateness samples.
const TICK_BUFFER_SIZE: usize = 256;

/// Tick jitter collector.
pub struct TickTelemetry {
    /// Ring buffer of tick lateness in microseconds.
    lateness_us: [u32; TICK_BUFFER_SIZE],
    idx: usize,
    max_us: u32,
    /// Ticks that fired later than the overrun budget.
    overrun_count: u64,
    /// Saturates at TICK_BUFFER_SIZE.
    sample_count: usize,
}

/// Summary over the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub avg_us: u32,
    pub max_us: u32,
    pub p95_us: u32,
    pub overruns: u64,
}

impl Default for TickTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TickTelemetry {
    pub fn new() -> Self {
        Self {
            lateness_us: [0; TICK_BUFFER_SIZE],
            idx: 0,
            max_us: 0,
            overrun_count: 0,
            sample_count: 0,
        }
    }

    /// Record how late a tick fired. `budget_us` is the lateness above
    /// which the tick counts as an overrun.
    #[inline]
    pub fn record(&mut self, lateness_secs: f64, budget_us: u32) {
        let us = (lateness_secs.max(0.0) * 1_000_000.0).min(u32::MAX as f64) as u32;

        self.lateness_us[self.idx] = us;
        self.idx = (self.idx + 1) % TICK_BUFFER_SIZE;

        if self.sample_count < TICK_BUFFER_SIZE {
            self.sample_count += 1;
        }
        if us > self.max_us {
            self.max_us = us;
        }
        if us > budget_us {
            self.overrun_count += 1;
        }
    }

    /// Summarize the window and reset the max for the next one.
    pub fn take_summary(&mut self) -> TickSummary {
        if self.sample_count == 0 {
            return TickSummary {
                avg_us: 0,
                max_us: 0,
                p95_us: 0,
                overruns: 0,
            };
        }

        let sum: u64 = self.lateness_us[..self.sample_count]
            .iter()
            .map(|&x| x as u64)
            .sum();
        let avg = (sum / self.sample_count as u64) as u32;

        let mut sorted = self.lateness_us;
        sorted[..self.sample_count].sort_unstable();
        let p95_idx = (self.sample_count * 95 / 100).max(1) - 1;
        let p95 = sorted[p95_idx.min(self.sample_count - 1)];

        let summary = TickSummary {
            avg_us: avg,
            max_us: self.max_us,
            p95_us: p95,
            overruns: self.overrun_count,
        };
        self.max_us = 0;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_summary_is_zero() {
        let mut t = TickTelemetry::new();
        let s = t.take_summary();
        assert_eq!(s.avg_us, 0);
        assert_eq!(s.overruns, 0);
    }

    #[test]
    fn records_and_summarizes() {
        let mut t = TickTelemetry::new();
        t.record(0.001, 5_000);
        t.record(0.003, 5_000);
        t.record(0.010, 5_000);
        let s = t.take_summary();
        assert_eq!(s.max_us, 10_000);
        assert_eq!(s.overruns, 1);
        assert!(s.avg_us >= 4_000 && s.avg_us <= 5_000);
    }

    #[test]
    fn max_resets_between_windows() {
        let mut t = TickTelemetry::new();
        t.record(0.010, 50_000);
        assert_eq!(t.take_summary().max_us, 10_000);
        t.record(0.001, 50_000);
        assert_eq!(t.take_summary().max_us, 1_000);
    }

    #[test]
    fn early_ticks_clamp_to_zero_lateness() {
        let mut t = TickTelemetry::new();
        t.record(-0.5, 1_000);
        let s = t.take_summary();
        assert_eq!(s.max_us, 0);
        assert_eq!(s.overruns, 0);
    }

    #[test]
    fn ring_buffer_saturates() {
        let mut t = TickTelemetry::new();
        for _ in 0..(TICK_BUFFER_SIZE * 2) {
            t.record(0.001, 5_000);
        }
        let s = t.take_summary();
        assert_eq!(s.avg_us, 1_000);
    }
}
