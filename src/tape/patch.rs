//! Tape-layout patches
//!
//! On tape every program is a packed 30-byte block followed by a checksum
//! byte. A full dump is a run of 0xFF header bytes, the two intro bytes
//! (manufacturer and device ID) and 64 such blocks.

/// Korg manufacturer ID, also the first intro byte on tape
pub const MANUFACTURER_ID: u8 = 0x42;

/// DW-8000 device ID, the second intro byte on tape
pub const DEVICE_ID: u8 = 0x03;

/// Header marker repeated before the intro
pub const HEADER_MARKER: u8 = 0xFF;

/// Data bytes per tape patch (checksum not included)
pub const PATCH_SIZE: usize = 30;

/// Patches in a complete tape dump
pub const PATCH_COUNT: usize = 64;

/// Checksum over a block of patch bytes: their sum modulo 256
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// One program in tape layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Patch {
    bytes: [u8; PATCH_SIZE],
}

impl Patch {
    /// Wrap 30 tape bytes
    pub fn new(bytes: [u8; PATCH_SIZE]) -> Self {
        Self { bytes }
    }

    /// Build a patch from a slice, `None` unless it is exactly 30 bytes long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; PATCH_SIZE] = bytes.try_into().ok()?;
        Some(Self { bytes })
    }

    /// The raw tape bytes
    pub fn as_bytes(&self) -> &[u8; PATCH_SIZE] {
        &self.bytes
    }

    /// Checksum byte that belongs after this patch on tape
    pub fn checksum(&self) -> u8 {
        checksum(&self.bytes)
    }
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            bytes: [0; PATCH_SIZE],
        }
    }
}

/// Build the byte image of a tape dump
///
/// Writes `header_len` header markers (at least one), the intro, and every patch
/// followed by its checksum.
pub fn build_tape_image(patches: &[Patch], header_len: usize) -> Vec<u8> {
    let header_len = header_len.max(1);
    let mut image = Vec::with_capacity(header_len + 2 + patches.len() * (PATCH_SIZE + 1));

    image.extend(std::iter::repeat(HEADER_MARKER).take(header_len));
    image.push(MANUFACTURER_ID);
    image.push(DEVICE_ID);
    for patch in patches {
        image.extend_from_slice(patch.as_bytes());
        image.push(patch.checksum());
    }
    image
}
