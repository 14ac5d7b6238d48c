//! Decoder configuration
//!
//! All tunables of the pipeline live in one [`DecodeConfig`] value that is passed
//! explicitly into every stage. It can be loaded from a JSON file; missing keys
//! fall back to the defaults that work for most DW-8000 tape recordings.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TapeError};

/// Sample rate the demodulator timings are calibrated for
pub const DEFAULT_MIN_SAMPLE_RATE: u32 = 44000;

/// Run lengths below this many samples are a 1 bit, everything else a 0 bit
pub const DEFAULT_MIDDLE_LENGTH: usize = 21;

/// Run lengths above this many samples are reported as anomalies
pub const DEFAULT_TOO_LONG: usize = 100;

/// Hysteresis for unclipped, filtered recordings
pub const DEFAULT_HYSTERESIS_THRESHOLD: f64 = 0.05;

/// Hysteresis for clipped recordings, which are treated as nearly rectangular
pub const CLIPPED_HYSTERESIS_THRESHOLD: f64 = 0.8;

/// Low-pass corner frequency applied before thresholding
pub const DEFAULT_LOWPASS_CUTOFF_HZ: f64 = 3125.0;

/// Butterworth filter order
pub const DEFAULT_LOWPASS_ORDER: usize = 5;

/// Configuration threaded through every pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Low-pass filter unclipped recordings before thresholding
    pub lowpass: bool,
    /// Schmitt trigger threshold (symmetric, 0 < t < 1) for unclipped recordings
    pub hysteresis_threshold: f64,
    /// Schmitt trigger threshold used when the recording is clipped
    pub clipped_threshold: f64,
    /// Low-pass corner frequency in Hz
    pub lowpass_cutoff_hz: f64,
    /// Low-pass filter order (1 to 8)
    pub lowpass_order: usize,
    /// Recordings below this rate are upsampled by sample repetition
    pub min_sample_rate: u32,
    /// Bit decision boundary in samples
    pub middle_length: usize,
    /// Run length above which a diagnostic is emitted
    pub too_long: usize,
    /// Append a store-to-slot command after every program dump
    pub store: bool,
    /// MIDI channel (0-15) used in the sysex status byte
    pub midi_channel: u8,
    /// Emit detailed per-stage diagnostics
    pub verbose: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            lowpass: true,
            hysteresis_threshold: DEFAULT_HYSTERESIS_THRESHOLD,
            clipped_threshold: CLIPPED_HYSTERESIS_THRESHOLD,
            lowpass_cutoff_hz: DEFAULT_LOWPASS_CUTOFF_HZ,
            lowpass_order: DEFAULT_LOWPASS_ORDER,
            min_sample_rate: DEFAULT_MIN_SAMPLE_RATE,
            middle_length: DEFAULT_MIDDLE_LENGTH,
            too_long: DEFAULT_TOO_LONG,
            store: false,
            midi_channel: 0,
            verbose: false,
        }
    }
}

impl DecodeConfig {
    /// Load a configuration from a JSON file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TapeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| TapeError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: DecodeConfig =
            serde_json::from_str(&content).map_err(|e| TapeError::InvalidConfig {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate parameters are within their working ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.hysteresis_threshold > 0.0 && self.hysteresis_threshold < 1.0) {
            return Err(invalid(
                "hysteresis_threshold",
                self.hysteresis_threshold,
                "0 < threshold < 1",
            ));
        }
        if !(self.clipped_threshold > 0.0 && self.clipped_threshold < 1.0) {
            return Err(invalid(
                "clipped_threshold",
                self.clipped_threshold,
                "0 < threshold < 1",
            ));
        }
        if !(self.lowpass_cutoff_hz > 0.0) {
            return Err(invalid(
                "lowpass_cutoff_hz",
                self.lowpass_cutoff_hz,
                "a positive frequency",
            ));
        }
        if self.lowpass_cutoff_hz >= self.min_sample_rate as f64 / 2.0 {
            return Err(invalid(
                "lowpass_cutoff_hz",
                self.lowpass_cutoff_hz,
                "below half of min_sample_rate",
            ));
        }
        if !(1..=8).contains(&self.lowpass_order) {
            return Err(invalid("lowpass_order", self.lowpass_order, "1 to 8"));
        }
        if self.min_sample_rate == 0 {
            return Err(invalid("min_sample_rate", self.min_sample_rate, "> 0 Hz"));
        }
        if self.middle_length < 2 {
            return Err(invalid("middle_length", self.middle_length, ">= 2 samples"));
        }
        if self.too_long <= self.middle_length {
            return Err(invalid(
                "too_long",
                self.too_long,
                "greater than middle_length",
            ));
        }
        if self.midi_channel > 15 {
            return Err(invalid("midi_channel", self.midi_channel, "0 to 15"));
        }
        Ok(())
    }
}

fn invalid(param: &str, value: impl ToString, expected: &str) -> TapeError {
    TapeError::InvalidParameter {
        param: param.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = DecodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.middle_length, 21);
        assert_eq!(config.too_long, 100);
        assert!(config.lowpass);
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let config = DecodeConfig {
            hysteresis_threshold: 1.5,
            ..Default::default()
        };
        match config.validate() {
            Err(TapeError::InvalidParameter { param, .. }) => {
                assert_eq!(param, "hysteresis_threshold")
            }
            other => panic!("Expected InvalidParameter, got: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_channel() {
        let config = DecodeConfig {
            midi_channel: 16,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "hysteresis_threshold": 0.1, "store": true }}"#).unwrap();

        let config = DecodeConfig::load(file.path()).unwrap();
        assert_eq!(config.hysteresis_threshold, 0.1);
        assert!(config.store);
        assert_eq!(config.middle_length, DEFAULT_MIDDLE_LENGTH);
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        match DecodeConfig::load(file.path()) {
            Err(TapeError::InvalidConfig { .. }) => {}
            other => panic!("Expected InvalidConfig, got: {:?}", other),
        }
    }
}
