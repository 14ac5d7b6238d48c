//! DW-8000 tape decoder
//!
//! Recovers Korg DW-8000 program banks from cassette recordings and turns them
//! into MIDI System Exclusive messages the synthesizer can load.
//!
//! # Architecture
//!
//! Every stage owns its output and hands it to the next one:
//! - Signal conditioning: upsampling, normalization, clip detection, low-pass
//! - Demodulation: Schmitt trigger, run lengths, one bit per half-cycle
//! - Framing: 11-bit frames with resynchronization after errors
//! - Patch stream: header search and 64 checksummed 30-byte patches
//! - Remapping: tape layout to the 51-parameter sysex layout
//! - Sysex: program dumps and optional store-to-slot commands
//!
//! [`pipeline`] chains the stages; [`DecodeConfig`] carries every tunable.

pub mod audio;
pub mod cli;
pub mod config;
pub mod decode;
pub mod dsp;
pub mod error;
pub mod pipeline;
pub mod sysex;
pub mod tape;

pub use config::DecodeConfig;
pub use error::{Result, TapeError};
