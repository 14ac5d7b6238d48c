//! Audio Module
//!
//! Getting tape recordings in and out of the crate:
//! - Sample buffer type
//! - WAV file import/export
//! - Synthesis of tape signals for fixtures

pub mod buffer;
pub mod io;
pub mod synth;

pub use buffer::SampleBuffer;
pub use io::{export_samples, import_samples};
pub use synth::{render_bits, render_tape, TapeSignal};
