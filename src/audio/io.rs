//! WAV file I/O
//!
//! Reads tape recordings into a [`SampleBuffer`]. Only integer PCM is accepted;
//! multi-channel files are reduced to their first channel since tape decks
//! record the same signal on both sides.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info};

use crate::audio::buffer::SampleBuffer;
use crate::error::{Result, TapeError};

/// Import a WAV file as single-channel integer samples
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file cannot be parsed as WAV
/// * `UnsupportedFormat` - If the samples are float or of an unusual width
/// * `EmptyAudio` - If the file holds no samples
pub fn import_samples(path: &Path) -> Result<SampleBuffer> {
    if !path.exists() {
        return Err(TapeError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    info!("Reading file {}", path.display());

    let reader = WavReader::open(path).map_err(|e| TapeError::InvalidAudio {
        reason: format!("Failed to open WAV file {}: {}", path.display(), e),
        source: Some(e),
    })?;

    let spec = reader.spec();
    debug!(
        "Read {} samples at {} Hz sample rate, {} channel(s), {} bits per sample",
        reader.duration(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );

    if spec.sample_rate == 0 {
        return Err(TapeError::InvalidAudio {
            reason: format!("{} declares a sample rate of 0 Hz", path.display()),
            source: None,
        });
    }
    if spec.sample_format == SampleFormat::Float {
        return Err(TapeError::UnsupportedFormat {
            format: format!("{}-bit float", spec.bits_per_sample),
        });
    }
    if !matches!(spec.bits_per_sample, 8 | 16 | 24 | 32) {
        return Err(TapeError::UnsupportedFormat {
            format: format!("{}-bit integer", spec.bits_per_sample),
        });
    }

    let channels = spec.channels.max(1) as usize;
    if channels > 1 {
        debug!("File has {} channels, using only the first", channels);
    }

    let samples = first_channel(reader, channels)?;
    if samples.is_empty() {
        return Err(TapeError::EmptyAudio);
    }

    let buffer = SampleBuffer::new(spec.sample_rate, samples);
    info!(
        "Loaded {} samples at {} Hz ({:.1}s)",
        buffer.len(),
        buffer.sample_rate,
        buffer.duration_secs()
    );

    Ok(buffer)
}

/// Export a buffer as a mono integer PCM WAV file
///
/// Samples must fit the requested bit depth.
pub fn export_samples(buffer: &SampleBuffer, path: &Path, bits_per_sample: u16) -> Result<()> {
    if !matches!(bits_per_sample, 8 | 16 | 24 | 32) {
        return Err(TapeError::UnsupportedFormat {
            format: format!("{}-bit integer", bits_per_sample),
        });
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate,
        bits_per_sample,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| write_error(path, e))?;
    for &sample in &buffer.samples {
        writer
            .write_sample(sample)
            .map_err(|e| write_error(path, e))?;
    }
    writer.finalize().map_err(|e| write_error(path, e))?;

    Ok(())
}

// ============================================================================
// Internal helper functions
// ============================================================================

/// Collect every `channels`-th sample starting at the first one
fn first_channel<R: std::io::Read>(mut reader: WavReader<R>, channels: usize) -> Result<Vec<i32>> {
    reader
        .samples::<i32>()
        .step_by(channels)
        .collect::<std::result::Result<Vec<i32>, _>>()
        .map_err(|e| TapeError::InvalidAudio {
            reason: format!("Failed to read samples: {}", e),
            source: Some(e),
        })
}

fn write_error(path: &Path, e: hound::Error) -> TapeError {
    let source = match e {
        hound::Error::IoError(io) => io,
        other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
    };
    TapeError::FileWriteError {
        path: path.to_path_buf(),
        source,
    }
}

// ============================================================================
// Tests
// ============================================================================
