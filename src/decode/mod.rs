//! Tape Decoding
//!
//! From conditioned samples to bytes:
//! - Binary demodulation (Schmitt trigger, run lengths, bits)
//! - Frame synchronization with single-bit resync

pub mod demodulator;
pub mod framing;

pub use demodulator::{
    classify_runs, demodulate, run_lengths, schmitt_trigger, Demodulated, LogicLevel,
    OverlongRun, RunLengthHistogram, SchmittTrigger,
};
pub use framing::{
    assemble_byte, encode_frame, encode_frames, is_valid_frame, synchronize, Framed,
    FramingError, FRAME_BITS,
};
