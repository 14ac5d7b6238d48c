//! `.syx` container I/O
//!
//! A `.syx` file is a plain concatenation of system exclusive messages, each
//! framed by `F0` and `F7` with 7-bit data bytes in between.

use std::fs;
use std::path::Path;

use log::info;

use crate::error::{Result, TapeError};

/// Start of system exclusive
pub const SOX: u8 = 0xF0;

/// End of system exclusive
pub const EOX: u8 = 0xF7;

/// Frame payloads into one byte image
pub fn encode_syx(payloads: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut image = Vec::with_capacity(payloads.iter().map(|p| p.len() + 2).sum());
    for (index, payload) in payloads.iter().enumerate() {
        if let Some(&byte) = payload.iter().find(|&&b| b & 0x80 != 0) {
            return Err(TapeError::MalformedSysex {
                reason: format!("message {} contains status byte {:02x}", index, byte),
            });
        }
        image.push(SOX);
        image.extend_from_slice(payload);
        image.push(EOX);
    }
    Ok(image)
}

/// Split a byte image into payloads
pub fn decode_syx(image: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut payloads = Vec::new();
    let mut current: Option<Vec<u8>> = None;

    for (offset, &byte) in image.iter().enumerate() {
        match (byte, current.as_mut()) {
            (SOX, None) => {}
            (EOX, Some(_)) => {}
            (b, Some(payload)) if b & 0x80 == 0 => {
                payload.push(b);
                continue;
            }
            (b, _) => {
                return Err(TapeError::MalformedSysex {
                    reason: format!("unexpected byte {:02x} at offset {}", b, offset),
                })
            }
        }
        // Only start and end of a message reach this point
        match current.take() {
            Some(payload) => payloads.push(payload),
            None => current = Some(Vec::new()),
        }
    }

    if current.is_some() {
        return Err(TapeError::MalformedSysex {
            reason: "last message is not terminated".to_string(),
        });
    }
    Ok(payloads)
}

/// Write payloads to a `.syx` file
pub fn write_syx(path: &Path, payloads: &[Vec<u8>]) -> Result<Vec<u8>> {
    let image = encode_syx(payloads)?;
    fs::write(path, &image).map_err(|e| TapeError::FileWriteError {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!("Wrote {} message(s) to {}", payloads.len(), path.display());
    Ok(image)
}

/// Read all payloads from a `.syx` file
pub fn read_syx(path: &Path) -> Result<Vec<Vec<u8>>> {
    if !path.exists() {
        return Err(TapeError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let image = fs::read(path).map_err(|e| TapeError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    decode_syx(&image)
}
