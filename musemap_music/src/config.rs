// Composer configuration.
//
// All tunable behavior of a compose run that is not part of the request
// itself: fallback tempo, the tempo range results are kept in, optional
// quantization, and how the MIDI file is laid out. Every field has a
// default, so an empty JSON object (or no file at all) is a valid config.
// Values from the command line are applied on top by the binary.

use crate::error::ConfigError;
use crate::idea::{DEFAULT_TEMPO_BPM, MAX_TEMPO_BPM, MIN_TEMPO_BPM};
use crate::midi::{DEFAULT_TICKS_PER_QUARTER, TrackLayout};
use crate::profile::Instrumentation;
use crate::quantize::QuantizeOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposerConfig {
    /// Tempo used when neither the request nor the knowledge base has one.
    pub default_tempo: f64,
    pub tempo_min: f64,
    pub tempo_max: f64,
    /// Quantize generated notes before encoding.
    pub quantize: Option<QuantizeOptions>,
    pub layout: TrackLayout,
    pub ticks_per_quarter: u16,
    /// Fixed programs for every genre; per-genre table when unset.
    pub instrumentation: Option<Instrumentation>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        ComposerConfig {
            default_tempo: DEFAULT_TEMPO_BPM,
            tempo_min: MIN_TEMPO_BPM,
            tempo_max: MAX_TEMPO_BPM,
            quantize: None,
            layout: TrackLayout::SplitByVoice,
            ticks_per_quarter: DEFAULT_TICKS_PER_QUARTER,
            instrumentation: None,
        }
    }
}

impl ComposerConfig {
    /// Parse and validate a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ComposerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        ComposerConfig::from_json(&json)
    }

    /// Check the tempo settings are usable together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let range_ok = self.tempo_min.is_finite()
            && self.tempo_max.is_finite()
            && self.tempo_min > 0.0
            && self.tempo_min <= self.tempo_max;
        let default_ok = (self.tempo_min..=self.tempo_max).contains(&self.default_tempo);
        if !range_ok || !default_ok {
            return Err(ConfigError::TempoRange {
                min: self.tempo_min,
                max: self.tempo_max,
            });
        }
        Ok(())
    }

    /// Clamp a tempo into the configured range.
    pub fn clamp_tempo(&self, tempo: f64) -> f64 {
        tempo.max(self.tempo_min).min(self.tempo_max)
    }
}
