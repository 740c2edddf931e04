//! Sample-level building blocks for the DSP graph: oscillator waveforms,
//! RBJ biquad filters, a feed-forward compressor, and a Schroeder reverb.

use crate::graph::{CompressorParams, FilterKind, Waveform};

/// One sample of a waveform at the given phase (0..1).
pub fn waveform_sample(waveform: Waveform, phase: f64) -> f64 {
    let phase = phase.rem_euclid(1.0);
    match waveform {
        Waveform::Sine => (phase * std::f64::consts::TAU).sin(),
        Waveform::Triangle => {
            if phase < 0.5 {
                4.0 * phase - 1.0
            } else {
                3.0 - 4.0 * phase
            }
        }
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
    }
}

/// RBJ biquad, direct form I. Coefficients are recomputed only when the
/// cutoff moves, so scheduled wobbles stay cheap.
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,
    q: f64,
    sample_rate: f64,
    cutoff: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    pub fn new(kind: FilterKind, cutoff: f64, q: f64, sample_rate: f64) -> Self {
        let mut biquad = Self {
            kind,
            q: q.max(0.1),
            sample_rate,
            cutoff: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        biquad.set_cutoff(cutoff);
        biquad
    }

    pub fn set_cutoff(&mut self, cutoff: f64) {
        let cutoff = cutoff.clamp(10.0, self.sample_rate * 0.45);
        if (cutoff - self.cutoff).abs() < 1e-6 {
            return;
        }
        self.cutoff = cutoff;
        let omega = std::f64::consts::TAU * cutoff / self.sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();
        let alpha = sin_w / (2.0 * self.q);
        let a0 = 1.0 + alpha;
        match self.kind {
            FilterKind::LowPass => {
                self.b0 = (1.0 - cos_w) / 2.0 / a0;
                self.b1 = (1.0 - cos_w) / a0;
                self.b2 = (1.0 - cos_w) / 2.0 / a0;
            }
            FilterKind::BandPass => {
                self.b0 = alpha / a0;
                self.b1 = 0.0;
                self.b2 = -alpha / a0;
            }
        }
        self.a1 = -2.0 * cos_w / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Feed-forward compressor with a one-pole envelope follower and a soft
/// knee around the threshold.
#[derive(Debug, Clone)]
pub struct Compressor {
    params: CompressorParams,
    attack_coeff: f64,
    release_coeff: f64,
    envelope: f64,
}

impl Compressor {
    pub fn new(params: CompressorParams, sample_rate: f64) -> Self {
        let coeff = |secs: f64| {
            if secs <= 0.0 {
                1.0
            } else {
                1.0 - (-1.0 / (secs * sample_rate)).exp()
            }
        };
        Self {
            attack_coeff: coeff(params.attack_secs),
            release_coeff: coeff(params.release_secs),
            params,
            envelope: 0.0,
        }
    }

    pub fn process(&mut self, x: f64) -> f64 {
        let level = x.abs();
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope += (level - self.envelope) * coeff;

        let env_db = 20.0 * self.envelope.max(1e-10).log10();
        let over = env_db - self.params.threshold_db;
        let knee = self.params.knee_db;
        let reduction_db = if over <= -knee / 2.0 {
            0.0
        } else if knee > 0.0 && over < knee / 2.0 {
            let t = over + knee / 2.0;
            (1.0 - 1.0 / self.params.ratio) * t * t / (2.0 * knee)
        } else {
            (1.0 - 1.0 / self.params.ratio) * over
        };
        x * 10f64.powf(-reduction_db / 20.0)
    }
}

const COMB_DELAYS: [f64; 4] = [0.0297, 0.0371, 0.0411, 0.0437];
const ALLPASS_DELAYS: [f64; 2] = [0.005, 0.0017];
const ALLPASS_GAIN: f64 = 0.7;

struct Comb {
    buffer: Vec<f64>,
    idx: usize,
    feedback: f64,
}

impl Comb {
    fn new(delay_secs: f64, decay_secs: f64, sample_rate: f64) -> Self {
        let len = ((delay_secs * sample_rate) as usize).max(1);
        // Feedback chosen so the tail decays 60 dB over the decay length.
        let feedback = 10f64.powf(-3.0 * delay_secs / decay_secs.max(0.01));
        Self {
            buffer: vec![0.0; len],
            idx: 0,
            feedback,
        }
    }

    fn process(&mut self, x: f64) -> f64 {
        let out = self.buffer[self.idx];
        self.buffer[self.idx] = x + out * self.feedback;
        self.idx = (self.idx + 1) % self.buffer.len();
        out
    }
}

struct Allpass {
    buffer: Vec<f64>,
    idx: usize,
}

impl Allpass {
    fn new(delay_secs: f64, sample_rate: f64) -> Self {
        let len = ((delay_secs * sample_rate) as usize).max(1);
        Self {
            buffer: vec![0.0; len],
            idx: 0,
        }
    }

    fn process(&mut self, x: f64) -> f64 {
        let delayed = self.buffer[self.idx];
        let out = -ALLPASS_GAIN * x + delayed;
        self.buffer[self.idx] = x + delayed * ALLPASS_GAIN;
        self.idx = (self.idx + 1) % self.buffer.len();
        out
    }
}

/// Schroeder reverb: four parallel combs into two series allpasses, sized
/// from the requested impulse (decay) length, with a fixed dry/wet mix.
pub struct Reverb {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
    dry: f64,
    wet: f64,
}

impl Reverb {
    pub fn new(impulse_secs: f64, dry: f64, wet: f64, sample_rate: f64) -> Self {
        Self {
            combs: COMB_DELAYS
                .iter()
                .map(|&d| Comb::new(d, impulse_secs, sample_rate))
                .collect(),
            allpasses: ALLPASS_DELAYS
                .iter()
                .map(|&d| Allpass::new(d, sample_rate))
                .collect(),
            dry,
            wet,
        }
    }

    pub fn process(&mut self, x: f64) -> f64 {
        let mut sum = 0.0;
        for comb in &mut self.combs {
            sum += comb.process(x);
        }
        let mut wet = sum / self.combs.len() as f64;
        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }
        self.dry * x + self.wet * wet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f64 = 48_000.0;

    #[test]
    fn sine_period_matches_phase() {
        assert!((waveform_sample(Waveform::Sine, 0.0)).abs() < 1e-12);
        assert!((waveform_sample(Waveform::Sine, 0.25) - 1.0).abs() < 1e-12);
        assert!((waveform_sample(Waveform::Sine, 0.75) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn waveforms_stay_in_unit_range() {
        for waveform in Waveform::ALL {
            for i in 0..100 {
                let s = waveform_sample(waveform, i as f64 / 100.0);
                assert!((-1.0..=1.0).contains(&s), "{} at {}", waveform.name(), i);
            }
        }
    }

    #[test]
    fn lowpass_attenuates_high_frequency() {
        let mut filter = Biquad::new(FilterKind::LowPass, 500.0, 1.0, RATE);
        // 10 kHz input, well above the 500 Hz cutoff.
        let freq = 10_000.0;
        let mut peak = 0.0f64;
        for n in 0..4800 {
            let x = (std::f64::consts::TAU * freq * n as f64 / RATE).sin();
            let y = filter.process(x);
            if n > 2400 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.05, "peak {}", peak);
    }

    #[test]
    fn lowpass_passes_low_frequency() {
        let mut filter = Biquad::new(FilterKind::LowPass, 5000.0, 1.0, RATE);
        let freq = 100.0;
        let mut peak = 0.0f64;
        for n in 0..4800 {
            let x = (std::f64::consts::TAU * freq * n as f64 / RATE).sin();
            let y = filter.process(x);
            if n > 2400 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak > 0.9, "peak {}", peak);
    }

    #[test]
    fn compressor_reduces_loud_signals() {
        let params = CompressorParams {
            threshold_db: -24.0,
            knee_db: 0.0,
            ratio: 4.0,
            attack_secs: 0.001,
            release_secs: 0.05,
        };
        let mut comp = Compressor::new(params, RATE);
        let mut out = 0.0;
        for _ in 0..4800 {
            out = comp.process(0.9);
        }
        assert!(out < 0.9);
        assert!(out > 0.0);
    }

    #[test]
    fn compressor_leaves_quiet_signals_alone() {
        let params = CompressorParams {
            threshold_db: -6.0,
            knee_db: 0.0,
            ratio: 20.0,
            attack_secs: 0.001,
            release_secs: 0.05,
        };
        let mut comp = Compressor::new(params, RATE);
        let mut out = 0.0;
        for _ in 0..4800 {
            out = comp.process(0.01);
        }
        assert!((out - 0.01).abs() < 1e-4);
    }

    #[test]
    fn reverb_produces_a_tail() {
        let mut reverb = Reverb::new(1.0, 0.0, 1.0, RATE);
        // One impulse, then silence.
        reverb.process(1.0);
        let mut energy = 0.0;
        for _ in 0..(RATE as usize / 2) {
            energy += reverb.process(0.0).abs();
        }
        assert!(energy > 0.1, "energy {}", energy);
    }

    #[test]
    fn reverb_dry_mix_passes_input() {
        let mut reverb = Reverb::new(0.5, 0.9, 0.1, RATE);
        let y = reverb.process(1.0);
        assert!((y - 0.9).abs() < 1e-9);
    }
}
