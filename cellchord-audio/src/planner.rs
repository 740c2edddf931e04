//! Sound event planner: turns the unordered active-cell set into concrete
//! voice requests, either one simultaneous chord or an ordered arpeggio.
//!
//! Everything here is pure; realizing a plan against an audio graph is the
//! voice bank's job, and timing it is the conductor's.

use cellchord_types::{ArpMode, Coord, Dimension, HarmonicRatios};

use crate::graph::{CompressorParams, FilterKind, Waveform};

/// Floor below which per-note durations are flagged (never clamped).
pub const MIN_NOTE_SECS: f64 = 0.040;
/// Fraction of the generation period an arpeggio pattern fills.
pub const PATTERN_FILL: f64 = 0.95;
/// Note count above which a pattern drops to the simple sine timbre.
pub const LARGE_PATTERN: usize = 100;

/// Limiter on the chord master gain: heavy ratio, fast attack.
pub const CHORD_LIMITER: CompressorParams = CompressorParams {
    threshold_db: -3.0,
    knee_db: 0.0,
    ratio: 20.0,
    attack_secs: 0.001,
    release_secs: 0.1,
};

/// Gentler limiter on the arpeggio bus.
pub const ARP_LIMITER: CompressorParams = CompressorParams {
    threshold_db: -6.0,
    knee_db: 4.0,
    ratio: 12.0,
    attack_secs: 0.002,
    release_secs: 0.05,
};

/// Per-voice dynamics compressor for rich arp voices.
pub const VOICE_COMPRESSOR: CompressorParams = CompressorParams {
    threshold_db: -24.0,
    knee_db: 10.0,
    ratio: 4.0,
    attack_secs: 0.005,
    release_secs: 0.1,
};

pub const REVERB_DRY: f64 = 0.9;
pub const REVERB_WET: f64 = 0.1;

/// Reverb impulse length. Shorter at 4D where voices are already dense.
pub fn reverb_impulse_secs(dimension: Dimension) -> f64 {
    if dimension == Dimension::Four {
        0.5
    } else {
        1.0
    }
}

/// One sounding cell: its coordinate and derived frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotePlan {
    pub coord: Coord,
    pub frequency: f64,
}

/// ADSR expressed as fractions of the note duration, each capped so very
/// short notes degrade toward a short linear ramp instead of clicking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack_ratio: f64,
    pub decay_ratio: f64,
    pub release_ratio: f64,
    pub sustain_level: f64,
}

impl Envelope {
    /// Ratios derived from the absolute note length: attack capped at the
    /// 10 ms equivalent, decay at 8 ms, release at 15 ms.
    pub fn for_note(note_secs: f64) -> Self {
        let note_ms = note_secs * 1000.0;
        Self {
            attack_ratio: (10.0 / note_ms).min(0.15),
            decay_ratio: (8.0 / note_ms).min(0.1),
            release_ratio: (15.0 / note_ms).min(0.3),
            sustain_level: 0.7,
        }
    }
}

/// Per-dimension timbre for rich arpeggio voices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timbre {
    pub waveform: Waveform,
    pub filter: FilterKind,
    pub filter_q: f64,
    pub main_level: f64,
    pub sub_level: f64,
    pub fm_amount: f64,
}

impl Timbre {
    pub fn for_dimension(dimension: Dimension) -> Self {
        match dimension {
            Dimension::One => Timbre {
                waveform: Waveform::Sawtooth,
                filter: FilterKind::LowPass,
                filter_q: 2.0,
                main_level: 0.7,
                sub_level: 0.3,
                fm_amount: 0.5,
            },
            Dimension::Two => Timbre {
                waveform: Waveform::Triangle,
                filter: FilterKind::LowPass,
                filter_q: 3.0,
                main_level: 0.6,
                sub_level: 0.4,
                fm_amount: 1.0,
            },
            Dimension::Three => Timbre {
                waveform: Waveform::Square,
                filter: FilterKind::BandPass,
                filter_q: 4.0,
                main_level: 0.5,
                sub_level: 0.5,
                fm_amount: 1.5,
            },
            Dimension::Four => Timbre {
                waveform: Waveform::Sine,
                filter: FilterKind::LowPass,
                filter_q: 2.0,
                main_level: 0.7,
                sub_level: 0.3,
                fm_amount: 0.7,
            },
        }
    }
}

/// Waveform for chord voice `index` at the given dimension. Higher
/// dimensions use fewer, purer waveforms to keep the stack listenable.
pub fn chord_waveform(dimension: Dimension, index: usize) -> Waveform {
    let table: &[Waveform] = match dimension {
        Dimension::One => &Waveform::ALL,
        Dimension::Two => &[Waveform::Sine, Waveform::Triangle, Waveform::Sawtooth],
        Dimension::Three => &[Waveform::Sine, Waveform::Triangle],
        Dimension::Four => &[Waveform::Sine],
    };
    table[index % table.len()]
}

/// Loudness law shared by per-voice and master gains: shrinks
/// logarithmically with the number of simultaneous voices.
fn crowd_factor(count: usize, dimension: Dimension) -> f64 {
    let base = (2 * dimension.axis_count()).max(4) as f64;
    1.0 + ((count as f64) + 1.0).ln() / base.ln()
}

pub fn voice_gain(count: usize, dimension: Dimension) -> f64 {
    0.4 / crowd_factor(count, dimension)
}

pub fn master_gain(count: usize, dimension: Dimension) -> f64 {
    0.5 / crowd_factor(count, dimension)
}

/// Simultaneous chord: every active cell sounds at once.
#[derive(Debug, Clone, PartialEq)]
pub struct ChordPlan {
    pub notes: Vec<NotePlan>,
    pub voice_gain: f64,
    pub master_gain: f64,
    pub limiter: CompressorParams,
}

/// Ordered arpeggio looping over the active cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ArpPlan {
    pub notes: Vec<NotePlan>,
    pub note_secs: f64,
    pub envelope: Envelope,
    pub limiter: CompressorParams,
    /// Set when the per-note time fell below [`MIN_NOTE_SECS`]; the plan
    /// still proceeds unmodified.
    pub below_min_note: bool,
    /// Large patterns (and 4D) drop to a single sine per note.
    pub large: bool,
}

fn note_plans(
    cells: &[Coord],
    ratios: &HarmonicRatios,
    dimension: Dimension,
    base_frequency: f64,
) -> Vec<NotePlan> {
    cells
        .iter()
        .map(|&coord| NotePlan {
            coord,
            frequency: ratios.frequency(coord, dimension, base_frequency),
        })
        .collect()
}

/// Plan a simultaneous chord over the active set. An empty set yields an
/// empty plan, which realizes to silence.
pub fn chord_plan(
    cells: &[Coord],
    ratios: &HarmonicRatios,
    dimension: Dimension,
    base_frequency: f64,
) -> ChordPlan {
    let notes = note_plans(cells, ratios, dimension, base_frequency);
    let count = notes.len();
    ChordPlan {
        notes,
        voice_gain: voice_gain(count, dimension),
        master_gain: master_gain(count, dimension),
        limiter: CHORD_LIMITER,
    }
}

/// Plan an arpeggio over the active set. Returns `None` (logged) when there
/// is nothing to arpeggiate; the caller falls back to chord planning for
/// 0 or 1 cells before reaching here.
pub fn arp_plan(
    cells: &[Coord],
    ratios: &HarmonicRatios,
    dimension: Dimension,
    base_frequency: f64,
    generation_ms: u64,
    mode: ArpMode,
    rng: &mut u64,
) -> Option<ArpPlan> {
    if cells.len() < 2 || mode == ArpMode::Off {
        log::error!(
            target: "planner",
            "arp plan requested for {} cells in mode {}; skipping",
            cells.len(),
            mode.name()
        );
        return None;
    }

    let mut notes = note_plans(cells, ratios, dimension, base_frequency);
    order_notes(&mut notes, mode, rng);

    let pattern_secs = generation_ms as f64 / 1000.0 * PATTERN_FILL;
    let note_secs = pattern_secs / notes.len() as f64;
    let below_min_note = note_secs < MIN_NOTE_SECS;
    if below_min_note {
        log::warn!(
            target: "planner",
            "note time {:.1} ms below {:.0} ms floor ({} notes in {} ms); proceeding",
            note_secs * 1000.0,
            MIN_NOTE_SECS * 1000.0,
            notes.len(),
            generation_ms
        );
    }

    let large = notes.len() > LARGE_PATTERN;
    Some(ArpPlan {
        envelope: Envelope::for_note(note_secs),
        notes,
        note_secs,
        limiter: ARP_LIMITER,
        below_min_note,
        large,
    })
}

fn order_notes(notes: &mut Vec<NotePlan>, mode: ArpMode, rng: &mut u64) {
    match mode {
        ArpMode::Off => {}
        ArpMode::Up => sort_by_frequency(notes, false),
        ArpMode::Down => sort_by_frequency(notes, true),
        ArpMode::UpDown => {
            sort_by_frequency(notes, false);
            if notes.len() > 2 {
                // Ascending pass plus the interior reversed, endpoints once.
                let interior: Vec<NotePlan> =
                    notes[1..notes.len() - 1].iter().rev().copied().collect();
                notes.extend(interior);
            }
        }
        ArpMode::Random => {
            // Fisher-Yates with the session LCG.
            for i in (1..notes.len()).rev() {
                *rng = rng
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let j = (*rng >> 33) as usize % (i + 1);
                notes.swap(i, j);
            }
        }
    }
}

fn sort_by_frequency(notes: &mut [NotePlan], descending: bool) {
    notes.sort_by(|a, b| {
        let ord = a
            .frequency
            .partial_cmp(&b.frequency)
            .unwrap_or(std::cmp::Ordering::Equal);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
}
