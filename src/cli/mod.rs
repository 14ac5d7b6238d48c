//! CLI Module
//!
//! Command-line interface for the DW-8000 tape decoder.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DecodeConfig;
use crate::error::Result;

/// DW-8000 tape decoder - recover program banks from cassette recordings
#[derive(Parser, Debug)]
#[command(name = "dw8000")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON file with decoder settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// MIDI channel (0-15) for the sysex messages
    #[arg(long, global = true)]
    pub channel: Option<u8>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Signal conditioning overrides shared by the commands that read audio
#[derive(Args, Debug, Clone, Default)]
pub struct SignalArgs {
    /// Do not low-pass filter the recording
    #[arg(long)]
    pub no_lowpass: bool,

    /// Schmitt trigger threshold for unclipped recordings (0 < t < 1)
    #[arg(short, long)]
    pub threshold: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a tape recording into a tape byte file
    #[command(name = "wav2bin")]
    WavToBin {
        /// Input recording (.wav)
        wav: PathBuf,

        /// Output tape byte file
        bin: PathBuf,

        #[command(flatten)]
        signal: SignalArgs,
    },

    /// Convert a tape byte file into a sysex bank
    #[command(name = "bin2syx")]
    BinToSyx {
        /// Input tape byte file
        bin: PathBuf,

        /// Output sysex file (.syx)
        syx: PathBuf,

        /// Follow every dump with a store-to-slot command
        #[arg(short, long)]
        store: bool,
    },

    /// Decode a tape recording straight into a sysex bank
    #[command(name = "wav2syx")]
    WavToSyx {
        /// Input recording (.wav)
        wav: PathBuf,

        /// Output sysex file (.syx)
        syx: PathBuf,

        /// Follow every dump with a store-to-slot command
        #[arg(short, long)]
        store: bool,

        #[command(flatten)]
        signal: SignalArgs,
    },

    /// Compare a tape byte file with a known-good sysex bank
    #[command(name = "check")]
    Check {
        /// Tape byte file
        bin: PathBuf,

        /// Reference sysex file (.syx)
        known: PathBuf,
    },

    /// Decode every .wav below a directory into <name>.auto.bin files
    #[command(name = "batch")]
    Batch {
        /// Directory to search
        dir: PathBuf,

        #[command(flatten)]
        signal: SignalArgs,
    },
}

impl Cli {
    /// Configuration from the optional file with the global flags applied
    pub fn base_config(&self) -> Result<DecodeConfig> {
        let mut config = match &self.config {
            Some(path) => DecodeConfig::load(path)?,
            None => DecodeConfig::default(),
        };
        if self.verbose {
            config.verbose = true;
        }
        if let Some(channel) = self.channel {
            config.midi_channel = channel;
        }
        Ok(config)
    }
}

impl SignalArgs {
    /// Apply the overrides to a configuration
    pub fn apply(&self, config: &mut DecodeConfig) {
        if self.no_lowpass {
            config.lowpass = false;
        }
        if let Some(threshold) = self.threshold {
            config.hysteresis_threshold = threshold;
        }
    }
}
