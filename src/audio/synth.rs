//! Tape signal synthesis
//!
//! Renders a byte stream the way the DW-8000 writes it to cassette: every bit
//! is one half-cycle of a square wave, short for a 1 and long for a 0. Used to
//! produce known-good recordings for self-tests and fixture generation.

use crate::audio::buffer::SampleBuffer;
use crate::decode::framing::encode_frames;

/// Timing and level of a synthesized tape signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapeSignal {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Half-cycle length in samples of a 1 bit
    pub short_run: usize,
    /// Half-cycle length in samples of a 0 bit
    pub long_run: usize,
    /// Peak amplitude of the square wave
    pub amplitude: i32,
    /// Idle 1 bits written before the first frame
    pub lead_in_bits: usize,
}

impl Default for TapeSignal {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            short_run: 10,
            long_run: 40,
            amplitude: 16000,
            lead_in_bits: 64,
        }
    }
}

/// Render a bit sequence as alternating half-cycles, starting with a positive one
///
/// A closing half-cycle is appended so the last bit ends in a level change and is
/// seen by the demodulator.
pub fn render_bits(bits: &[u8], signal: &TapeSignal) -> SampleBuffer {
    let total: usize = bits
        .iter()
        .map(|&bit| run_for(bit, signal))
        .sum::<usize>()
        + signal.short_run;
    let mut samples = Vec::with_capacity(total);

    let mut level = signal.amplitude;
    for &bit in bits {
        samples.extend(std::iter::repeat(level).take(run_for(bit, signal)));
        level = -level;
    }
    samples.extend(std::iter::repeat(level).take(signal.short_run));

    SampleBuffer::new(signal.sample_rate, samples)
}

/// Render bytes as a framed tape signal with an idle lead-in and lead-out
pub fn render_tape(bytes: &[u8], signal: &TapeSignal) -> SampleBuffer {
    let mut bits = vec![1u8; signal.lead_in_bits];
    bits.extend(encode_frames(bytes));
    bits.extend([1u8; 11]);
    render_bits(&bits, signal)
}

fn run_for(bit: u8, signal: &TapeSignal) -> usize {
    if bit == 0 {
        signal.long_run
    } else {
        signal.short_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_bits_lengths() {
        let signal = TapeSignal {
            short_run: 2,
            long_run: 5,
            amplitude: 100,
            ..Default::default()
        };
        let buffer = render_bits(&[1, 0], &signal);

        assert_eq!(
            buffer.samples,
            vec![100, 100, -100, -100, -100, -100, -100, 100, 100]
        );
        assert_eq!(buffer.sample_rate, 44100);
    }

    #[test]
    fn test_render_tape_has_lead_in() {
        let signal = TapeSignal::default();
        let buffer = render_tape(&[0x42], &signal);

        let frame_bits = 11;
        let expected_runs = signal.lead_in_bits + frame_bits + 11;
        assert!(buffer.len() > expected_runs * signal.short_run);
        assert!(buffer.samples[..signal.short_run]
            .iter()
            .all(|&s| s == signal.amplitude));
    }
}
