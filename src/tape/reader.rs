//! Patch Stream Reader
//!
//! Finds the tape header and intro in a byte stream and reads the 64
//! checksummed patch blocks that follow. Bad checksums are recorded and
//! reading carries on; a stream that ends early stops the read. Either way the
//! caller gets every complete patch that was found.

use std::fmt;
use std::io::{self, Read};

use log::{debug, info, warn};

use crate::config::DecodeConfig;
use crate::error::Result;
use crate::tape::patch::{
    checksum, Patch, DEVICE_ID, HEADER_MARKER, MANUFACTURER_ID, PATCH_COUNT, PATCH_SIZE,
};

/// Reader state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Looking for the first header marker
    SeekHeader,
    /// Skipping header markers, expecting the intro
    SeekIntro,
    /// Reading patch blocks
    ReadPatches,
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderState::SeekHeader => write!(f, "searching for header"),
            ReaderState::SeekIntro => write!(f, "searching for intro"),
            ReaderState::ReadPatches => write!(f, "reading patches"),
        }
    }
}

/// A patch whose checksum byte does not match its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumError {
    /// Index of the patch on tape
    pub patch_index: usize,
    /// Checksum computed from the patch bytes
    pub computed: u8,
    /// Checksum byte read from tape
    pub stored: u8,
}

/// The stream ended before the dump was complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrematureEof {
    /// What the reader was doing
    pub state: ReaderState,
    /// Patch that was being read (equals the number of complete patches)
    pub patch_index: usize,
    /// Bytes of that patch block that were available, checksum included
    pub bytes_read: usize,
}

/// Result of reading a tape byte stream
#[derive(Debug, Clone, Default)]
pub struct PatchStreamReport {
    /// Complete patches in tape order, including those with bad checksums
    pub patches: Vec<Patch>,
    /// Every checksum mismatch
    pub checksum_errors: Vec<ChecksumError>,
    /// Set if the stream ran out early
    pub premature_eof: Option<PrematureEof>,
    /// Intro candidates rejected because of a foreign device ID
    pub foreign_device_ids: Vec<u8>,
}

impl PatchStreamReport {
    /// All 64 patches read, no checksum errors, no early end of stream
    pub fn success(&self) -> bool {
        self.patches.len() == PATCH_COUNT
            && self.checksum_errors.is_empty()
            && self.premature_eof.is_none()
    }

    /// Human-readable description of everything that went wrong
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Some(eof) = &self.premature_eof {
            problems.push(format!(
                "Premature end of stream while {} (patch {}, {} of {} bytes available)",
                eof.state,
                eof.patch_index,
                eof.bytes_read,
                PATCH_SIZE + 1
            ));
        }
        for error in &self.checksum_errors {
            problems.push(format!(
                "Checksum error in patch {}: got {:02x} but expected {:02x}",
                error.patch_index, error.computed, error.stored
            ));
        }
        if self.patches.len() != PATCH_COUNT {
            problems.push(format!(
                "Found {} patches, expected {}",
                self.patches.len(),
                PATCH_COUNT
            ));
        }
        problems
    }
}

/// Read a tape dump from a byte stream
///
/// Only I/O failures other than end of stream are errors.
pub fn read_patches<R: Read>(mut reader: R, config: &DecodeConfig) -> Result<PatchStreamReport> {
    let mut report = PatchStreamReport::default();
    let mut state = ReaderState::SeekHeader;

    while report.patches.len() < PATCH_COUNT {
        match state {
            ReaderState::SeekHeader => match read_byte(&mut reader)? {
                None => return Ok(early_end(report, state, 0)),
                Some(HEADER_MARKER) => state = ReaderState::SeekIntro,
                Some(_) => {}
            },
            ReaderState::SeekIntro => match read_byte(&mut reader)? {
                None => return Ok(early_end(report, state, 0)),
                Some(HEADER_MARKER) => {}
                Some(MANUFACTURER_ID) => match read_byte(&mut reader)? {
                    None => return Ok(early_end(report, state, 0)),
                    Some(DEVICE_ID) => {
                        debug!("Found tape intro");
                        state = ReaderState::ReadPatches;
                    }
                    Some(other) => {
                        warn!(
                            "Are you sure this is a DW-8000 tape? Found device ID {:02x}",
                            other
                        );
                        report.foreign_device_ids.push(other);
                        state = ReaderState::SeekHeader;
                    }
                },
                Some(_) => state = ReaderState::SeekHeader,
            },
            ReaderState::ReadPatches => {
                let mut block = [0u8; PATCH_SIZE + 1];
                let available = read_up_to(&mut reader, &mut block)?;
                if available < block.len() {
                    return Ok(early_end(report, state, available));
                }

                let patch_index = report.patches.len();
                let (data, stored) = block.split_at(PATCH_SIZE);
                let computed = checksum(data);
                if computed != stored[0] {
                    warn!(
                        "Checksum error in patch {}: got {:02x} but expected {:02x}",
                        patch_index, computed, stored[0]
                    );
                    report.checksum_errors.push(ChecksumError {
                        patch_index,
                        computed,
                        stored: stored[0],
                    });
                }

                // split_at guarantees the length
                if let Some(patch) = Patch::from_slice(data) {
                    if config.verbose {
                        debug!("Patch {} {:02x?}", patch_index, patch.as_bytes());
                    }
                    report.patches.push(patch);
                }
            }
        }
    }

    info!(
        "Read {} patches, {} checksum error(s)",
        report.patches.len(),
        report.checksum_errors.len()
    );
    Ok(report)
}

fn early_end(
    mut report: PatchStreamReport,
    state: ReaderState,
    bytes_read: usize,
) -> PatchStreamReport {
    warn!("Premature end of stream while {}", state);
    report.premature_eof = Some(PrematureEof {
        state,
        patch_index: report.patches.len(),
        bytes_read,
    });
    report
}

fn read_byte<R: Read>(reader: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    Ok(match read_up_to(reader, &mut byte)? {
        0 => None,
        _ => Some(byte[0]),
    })
}

/// Fill `buf` as far as the stream allows, returning the number of bytes read
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tape::patch::build_tape_image;

    fn ones_image() -> Vec<u8> {
        build_tape_image(&vec![Patch::new([0x01; PATCH_SIZE]); PATCH_COUNT], 1)
    }

    #[test]
    fn test_complete_dump_succeeds() {
        let report = read_patches(ones_image().as_slice(), &DecodeConfig::default()).unwrap();

        assert!(report.success());
        assert_eq!(report.patches.len(), 64);
        assert!(report.checksum_errors.is_empty());
        assert!(report.problems().is_empty());
    }

    #[test]
    fn test_last_checksum_off_by_one() {
        let mut image = ones_image();
        let last = image.len() - 1;
        image[last] += 1;

        let report = read_patches(image.as_slice(), &DecodeConfig::default()).unwrap();

        assert!(!report.success());
        assert_eq!(report.patches.len(), 64);
        assert_eq!(
            report.checksum_errors,
            vec![ChecksumError {
                patch_index: 63,
                computed: 30,
                stored: 31
            }]
        );
    }

    #[test]
    fn test_garbage_before_header_is_skipped() {
        let mut image = vec![0x00, 0x42, 0x03, 0x17];
        image.extend(ones_image());

        let report = read_patches(image.as_slice(), &DecodeConfig::default()).unwrap();
        assert!(report.success());
    }

    #[test]
    fn test_wrong_intro_restarts_header_search() {
        let mut image = vec![0xFF, 0xFF, 0x41, 0x03];
        image.extend(ones_image());

        let report = read_patches(image.as_slice(), &DecodeConfig::default()).unwrap();
        assert!(report.success());
        assert!(report.foreign_device_ids.is_empty());
    }

    #[test]
    fn test_foreign_device_id_is_reported() {
        let mut image = vec![0xFF, 0x42, 0x05];
        image.extend(ones_image());

        let report = read_patches(image.as_slice(), &DecodeConfig::default()).unwrap();
        assert!(report.success());
        assert_eq!(report.foreign_device_ids, vec![0x05]);
    }

    #[test]
    fn test_truncated_stream() {
        let image = ones_image();
        let truncated = &image[..3 + 10 * 31 + 12];

        let report = read_patches(truncated, &DecodeConfig::default()).unwrap();

        assert!(!report.success());
        assert_eq!(report.patches.len(), 10);
        assert_eq!(
            report.premature_eof,
            Some(PrematureEof {
                state: ReaderState::ReadPatches,
                patch_index: 10,
                bytes_read: 12
            })
        );
        assert!(report.problems().iter().any(|p| p.contains("Premature")));
    }

    #[test]
    fn test_missing_header() {
        let report = read_patches(&[0x00u8, 0x01, 0x02][..], &DecodeConfig::default()).unwrap();

        assert!(!report.success());
        assert!(report.patches.is_empty());
        assert_eq!(
            report.premature_eof.map(|e| e.state),
            Some(ReaderState::SeekHeader)
        );
    }

    #[test]
    fn test_empty_stream() {
        let report = read_patches(io::empty(), &DecodeConfig::default()).unwrap();
        assert!(!report.success());
        assert!(report.premature_eof.is_some());
    }

    #[test]
    fn test_extra_data_after_dump_is_ignored() {
        let mut image = ones_image();
        image.extend([0xAA; 100]);

        let report = read_patches(image.as_slice(), &DecodeConfig::default()).unwrap();
        assert!(report.success());
        assert_eq!(report.patches.len(), 64);
    }
}
