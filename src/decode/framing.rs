//! Frame Synchronizer
//!
//! Bytes travel in 11-bit frames: a 0 start bit, eight data bits least
//! significant first, and two 1 stop bits. The synchronizer slides over the bit
//! sequence one position at a time until a frame fits, takes it, and jumps past
//! it. After a bad frame it hunts bit by bit again, so one damaged half-cycle
//! costs at most the frames around it instead of the rest of the tape.

use log::debug;

use crate::config::DecodeConfig;

/// Bits per frame: start + 8 data + 2 stop
pub const FRAME_BITS: usize = 11;

/// A window that failed framing right after a good byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramingError {
    /// Bit offset of the rejected window
    pub bit_position: usize,
    /// The rejected window
    pub window: Vec<u8>,
}

impl FramingError {
    /// Rough byte position of the failure (bit offset / 8)
    pub fn byte_position(&self) -> usize {
        self.bit_position >> 3
    }
}

/// Synchronizer state between two windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    /// Previous window was not a frame
    Hunting,
    /// Previous window produced a byte
    Locked,
}

/// Output of the synchronizer
#[derive(Debug, Clone, Default)]
pub struct Framed {
    /// Decoded bytes in stream order
    pub bytes: Vec<u8>,
    /// Bit offset of the start bit of each decoded byte
    pub positions: Vec<usize>,
    /// Loss-of-lock events
    pub errors: Vec<FramingError>,
}

/// True if `window` holds a start bit at 0 and stop bits at 9 and 10
pub fn is_valid_frame(window: &[u8]) -> bool {
    window.len() >= FRAME_BITS && window[0] == 0 && window[9] == 1 && window[10] == 1
}

/// Assemble eight data bits, least significant first
///
/// Each bit enters at the top and is shifted down by every later bit, so the
/// first bit ends up as bit 0.
pub fn assemble_byte(data_bits: &[u8]) -> u8 {
    data_bits.iter().take(8).fold(0u8, |value, &bit| {
        let value = value >> 1;
        if bit == 1 {
            value | 0x80
        } else {
            value
        }
    })
}

/// Extract framed bytes from a bit sequence
pub fn synchronize(bits: &[u8], config: &DecodeConfig) -> Framed {
    let mut framed = Framed::default();
    let mut state = SyncState::Hunting;
    let mut position = 0;

    while position + FRAME_BITS <= bits.len() {
        let window = &bits[position..position + FRAME_BITS];
        if is_valid_frame(window) {
            framed.bytes.push(assemble_byte(&window[1..9]));
            framed.positions.push(position);
            position += FRAME_BITS;
            state = SyncState::Locked;
        } else {
            if state == SyncState::Locked {
                let error = FramingError {
                    bit_position: position,
                    window: window.to_vec(),
                };
                if config.verbose {
                    debug!(
                        "Bad byte at byte {:04x} {:?}",
                        error.byte_position(),
                        error.window
                    );
                }
                framed.errors.push(error);
            }
            state = SyncState::Hunting;
            position += 1;
        }
    }

    debug!(
        "Framed {} bytes, {} loss(es) of lock",
        framed.bytes.len(),
        framed.errors.len()
    );
    framed
}

/// Encode one byte as an 11-bit frame
pub fn encode_frame(byte: u8) -> [u8; FRAME_BITS] {
    let mut frame = [0u8; FRAME_BITS];
    for (i, bit) in frame[1..9].iter_mut().enumerate() {
        *bit = (byte >> i) & 1;
    }
    frame[9] = 1;
    frame[10] = 1;
    frame
}

/// Encode a byte stream as back-to-back frames
pub fn encode_frames(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().flat_map(|&b| encode_frame(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(&[0, 0, 0, 0, 0, 0, 0, 0], 0x00 ; "all zero")]
    #[test_case(&[1, 0, 0, 0, 0, 0, 0, 0], 0x01 ; "first bit is lsb")]
    #[test_case(&[0, 0, 0, 0, 0, 0, 0, 1], 0x80 ; "last bit is msb")]
    #[test_case(&[1, 0, 1, 0, 0, 1, 0, 1], 0xA5 ; "mixed")]
    #[test_case(&[1, 1, 1, 1, 1, 1, 1, 1], 0xFF ; "all one")]
    fn test_assemble_byte_lsb_first(bits: &[u8], expected: u8) {
        assert_eq!(assemble_byte(bits), expected);
    }

    #[test]
    fn test_zero_byte_frame() {
        let bits = [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1];
        let framed = synchronize(&bits, &DecodeConfig::default());
        assert_eq!(framed.bytes, vec![0]);
        assert!(framed.errors.is_empty());
    }

    #[test]
    fn test_encode_frame_layout() {
        assert_eq!(encode_frame(0x42), [0, 0, 1, 0, 0, 0, 0, 1, 0, 1, 1]);
    }

    #[test]
    fn test_encoded_stream_decodes() {
        let bytes = vec![0xFF, 0xFF, 0x42, 0x03, 0x00, 0x7F, 0x80];
        let framed = synchronize(&encode_frames(&bytes), &DecodeConfig::default());
        assert_eq!(framed.bytes, bytes);
        assert!(framed.errors.is_empty());
    }

    #[test]
    fn test_leading_garbage_is_skipped_silently() {
        let mut bits = vec![1, 1, 0, 1];
        bits.extend(encode_frames(&[0x12, 0x34]));
        let framed = synchronize(&bits, &DecodeConfig::default());
        assert_eq!(framed.bytes, vec![0x12, 0x34]);
        assert!(framed.errors.is_empty());
    }

    #[test]
    fn test_short_input_yields_nothing() {
        let framed = synchronize(&[0, 0, 0, 0, 0, 0, 0, 0, 0, 1], &DecodeConfig::default());
        assert!(framed.bytes.is_empty());
    }

    #[test]
    fn test_invalid_windows_never_emit_bytes() {
        // Stop bit missing everywhere: no window can satisfy the framing rule
        let bits = vec![0u8; 64];
        let framed = synchronize(&bits, &DecodeConfig::default());
        assert!(framed.bytes.is_empty());
        assert!(framed.errors.is_empty());
    }

    #[test]
    fn test_resync_after_corrupted_start_bit() {
        let bytes = vec![0xFF; 6];
        let mut bits = encode_frames(&bytes);
        bits[2 * FRAME_BITS] = 1;

        let framed = synchronize(&bits, &DecodeConfig::default());

        assert_eq!(framed.bytes, vec![0xFF; 5]);
        assert_eq!(framed.errors.len(), 1);
        assert_eq!(framed.errors[0].bit_position, 2 * FRAME_BITS);
        assert!(framed.positions[2] - 2 * FRAME_BITS <= FRAME_BITS);
        assert_eq!(framed.errors[0].byte_position(), 2);
    }

    #[test]
    fn test_resync_after_corrupted_stop_bit() {
        let bytes = vec![0x00; 6];
        let mut bits = encode_frames(&bytes);
        let corrupted = 2 * FRAME_BITS + 9;
        bits[corrupted] = 0;

        let framed = synchronize(&bits, &DecodeConfig::default());

        // The damaged frame is lost, the next one is found again within 11 bits
        assert_eq!(framed.bytes, vec![0x00; 5]);
        assert_eq!(framed.errors.len(), 1);
        let recovered = framed.positions[2];
        assert!(recovered > corrupted);
        assert!(recovered - corrupted <= FRAME_BITS);
        assert_eq!(framed.positions[3..].to_vec(), vec![4 * FRAME_BITS, 5 * FRAME_BITS]);
    }

    #[test]
    fn test_corrupted_data_bit_keeps_alignment() {
        let bytes = vec![0x10, 0x20, 0x30];
        let mut bits = encode_frames(&bytes);
        bits[FRAME_BITS + 1] ^= 1;

        let framed = synchronize(&bits, &DecodeConfig::default());
        assert_eq!(framed.bytes, vec![0x10, 0x21, 0x30]);
        assert!(framed.errors.is_empty());
    }
}
