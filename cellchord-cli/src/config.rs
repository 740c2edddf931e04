//! Startup configuration: embedded defaults merged with an optional user
//! config file. The file only supplies initial values; nothing is written
//! back.

use std::path::PathBuf;

use serde::Deserialize;

use cellchord_types::{ArpMode, Dimension, RuleId, SessionState};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    audio: AudioConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    dimension: Option<usize>,
    grid_size: Option<usize>,
    base_frequency: Option<f64>,
    generation_ms: Option<u64>,
    arp_mode: Option<String>,
    rule: Option<String>,
}

#[derive(Deserialize, Default)]
struct AudioConfig {
    wav_sample_rate: Option<u32>,
}

pub struct Config {
    defaults: DefaultsConfig,
    audio: AudioConfig,
}

impl Config {
    pub fn load() -> Self {
        let mut base: ConfigFile = match toml::from_str(DEFAULT_CONFIG) {
            Ok(file) => file,
            Err(e) => {
                log::warn!(target: "config", "embedded config is malformed: {}", e);
                ConfigFile::default()
            }
        };

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => {
                            merge_defaults(&mut base.defaults, user.defaults);
                            merge_audio(&mut base.audio, user.audio);
                        }
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            defaults: base.defaults,
            audio: base.audio,
        }
    }

    /// Build the initial session from the merged defaults. Out-of-range
    /// values clamp; unparseable names warn and fall back.
    pub fn session(&self, seed: u64) -> SessionState {
        let mut session = SessionState::new(seed);

        let dimension = self
            .defaults
            .dimension
            .and_then(|n| {
                let d = Dimension::from_axis_count(n);
                if d.is_none() {
                    log::warn!(target: "config", "dimension {} out of range, using 2D", n);
                }
                d
            })
            .unwrap_or(Dimension::Two);
        let size = SessionState::clamp_grid_size(
            dimension,
            self.defaults.grid_size.unwrap_or(session.grid_size()),
        );
        session.rebuild_grid(dimension, size);

        if let Some(freq) = self.defaults.base_frequency {
            session.base_frequency = freq.clamp(
                cellchord_types::state::session::MIN_BASE_FREQUENCY,
                cellchord_types::state::session::MAX_BASE_FREQUENCY,
            );
        }
        if let Some(ms) = self.defaults.generation_ms {
            session.generation_ms = ms.clamp(
                cellchord_types::state::session::MIN_GENERATION_MS,
                cellchord_types::state::session::MAX_GENERATION_MS,
            );
        }
        if let Some(name) = self.defaults.arp_mode.as_deref() {
            match ArpMode::from_name(name) {
                Some(mode) => session.arp_mode = mode,
                None => log::warn!(target: "config", "unknown arp mode {:?}", name),
            }
        }
        if let Some(name) = self.defaults.rule.as_deref() {
            match RuleId::from_name(name) {
                Some(id) => session.rules.select(id),
                None => log::warn!(target: "config", "unknown rule {:?}", name),
            }
        }
        session.rules.sanitize();
        session
    }

    pub fn wav_sample_rate(&self) -> u32 {
        self.audio.wav_sample_rate.unwrap_or(44_100)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cellchord").join("config.toml"))
}

fn merge_defaults(base: &mut DefaultsConfig, user: DefaultsConfig) {
    if user.dimension.is_some() {
        base.dimension = user.dimension;
    }
    if user.grid_size.is_some() {
        base.grid_size = user.grid_size;
    }
    if user.base_frequency.is_some() {
        base.base_frequency = user.base_frequency;
    }
    if user.generation_ms.is_some() {
        base.generation_ms = user.generation_ms;
    }
    if user.arp_mode.is_some() {
        base.arp_mode = user.arp_mode;
    }
    if user.rule.is_some() {
        base.rule = user.rule;
    }
}

fn merge_audio(base: &mut AudioConfig, user: AudioConfig) {
    if user.wav_sample_rate.is_some() {
        base.wav_sample_rate = user.wav_sample_rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let file: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(file.defaults.dimension, Some(2));
        assert_eq!(file.defaults.rule.as_deref(), Some("conway"));
        assert_eq!(file.audio.wav_sample_rate, Some(44_100));
    }

    #[test]
    fn session_applies_defaults_with_clamping() {
        let config = Config {
            defaults: DefaultsConfig {
                dimension: Some(4),
                grid_size: Some(16),
                base_frequency: Some(5000.0),
                generation_ms: Some(50),
                arp_mode: Some("updown".to_string()),
                rule: Some("seeds".to_string()),
            },
            audio: AudioConfig::default(),
        };
        let session = config.session(1);
        assert_eq!(session.dimension(), Dimension::Four);
        // 4D caps the side length at 8.
        assert_eq!(session.grid_size(), 8);
        assert_eq!(session.base_frequency, 1000.0);
        assert_eq!(session.generation_ms, 100);
        assert_eq!(session.arp_mode, ArpMode::UpDown);
        assert_eq!(session.rules.selected(), RuleId::Seeds);
    }

    #[test]
    fn unknown_names_fall_back() {
        let config = Config {
            defaults: DefaultsConfig {
                dimension: Some(9),
                arp_mode: Some("sideways".to_string()),
                rule: Some("nope".to_string()),
                ..Default::default()
            },
            audio: AudioConfig::default(),
        };
        let session = config.session(1);
        assert_eq!(session.dimension(), Dimension::Two);
        assert_eq!(session.arp_mode, ArpMode::Off);
        assert_eq!(session.rules.selected(), RuleId::Conway);
    }
}
