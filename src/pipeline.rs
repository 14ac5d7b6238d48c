//! Pipeline orchestration
//!
//! Chains the stages into the conversions the command line offers. Stage
//! failures never abort a conversion: whatever was recovered is written out and
//! the outcome tells the caller whether it is complete. Only fatal errors (bad
//! input files, I/O) are returned as `Err`.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::audio::{import_samples, SampleBuffer};
use crate::config::DecodeConfig;
use crate::decode::{demodulate, synchronize, RunLengthHistogram};
use crate::dsp::condition;
use crate::error::{Result, TapeError};
use crate::sysex::{
    build_messages, compare_programs, read_syx, reference_programs, remap_all, write_syx,
    GroundTruthReport, SysexBuild,
};
use crate::tape::{read_patches, PatchStreamReport};

/// Suffix given to files written by [`batch_convert`]
pub const BATCH_SUFFIX: &str = "auto.bin";

/// What the audio stages recovered from a recording
#[derive(Debug, Clone)]
pub struct TapeDecode {
    /// The recording was treated as clipped
    pub clipped: bool,
    /// The low-pass filter was applied
    pub filtered: bool,
    /// Number of demodulated bits
    pub bit_count: usize,
    /// Runs above `too_long`
    pub overlong_runs: usize,
    /// Run-length histogram, for diagnosing threshold trouble
    pub histogram: RunLengthHistogram,
    /// Times the frame synchronizer lost lock
    pub framing_errors: usize,
    /// Framed bytes in stream order
    pub bytes: Vec<u8>,
}

impl TapeDecode {
    fn log_failure(&self) {
        warn!(
            "Decoding failed: {} bits, {} bytes, {} framing error(s), {} overlong run(s)",
            self.bit_count,
            self.bytes.len(),
            self.framing_errors,
            self.overlong_runs
        );
        warn!("Histogram of run lengths:\n{}", self.histogram);
    }
}

/// Run the audio stages over a recording
pub fn decode_samples(buffer: SampleBuffer, config: &DecodeConfig) -> TapeDecode {
    let signal = condition(buffer, config);
    let (clipped, filtered) = (signal.clipped, signal.filtered);

    let demodulated = demodulate(signal, config);
    let framed = synchronize(&demodulated.bits, config);

    TapeDecode {
        clipped,
        filtered,
        bit_count: demodulated.bits.len(),
        overlong_runs: demodulated.overlong.len(),
        histogram: demodulated.histogram,
        framing_errors: framed.errors.len(),
        bytes: framed.bytes,
    }
}

/// Outcome of a recording-to-bytes conversion
#[derive(Debug, Clone)]
pub struct BinOutcome {
    pub decode: TapeDecode,
    /// The written file, read back as a patch stream
    pub verification: PatchStreamReport,
    /// SHA-256 of the written file
    pub digest: String,
}

impl BinOutcome {
    pub fn success(&self) -> bool {
        self.verification.success()
    }
}

/// Decode a recording into a tape byte file and verify it
pub fn wav_to_bin(wav: &Path, bin: &Path, config: &DecodeConfig) -> Result<BinOutcome> {
    info!("Decoding {} to {}", wav.display(), bin.display());
    let buffer = import_samples(wav)?;
    let decode = decode_samples(buffer, config);

    let digest = write_output(bin, &decode.bytes)?;
    info!(
        "Wrote {} bytes to {} (sha256 {})",
        decode.bytes.len(),
        bin.display(),
        digest
    );

    let verification = read_bin(bin, config)?;
    report_stream(&verification);
    if !verification.success() {
        decode.log_failure();
    }

    Ok(BinOutcome {
        decode,
        verification,
        digest,
    })
}

/// Outcome of a conversion that ends in a sysex file
#[derive(Debug, Clone)]
pub struct SyxOutcome {
    /// Audio stage results, for conversions that start from a recording
    pub decode: Option<TapeDecode>,
    pub stream: PatchStreamReport,
    pub build: SysexBuild,
    /// SHA-256 of the written file
    pub digest: String,
}

impl SyxOutcome {
    pub fn success(&self) -> bool {
        self.stream.success() && self.build.success()
    }
}

/// Convert a tape byte file into a sysex file
pub fn bin_to_syx(bin: &Path, syx: &Path, config: &DecodeConfig) -> Result<SyxOutcome> {
    info!("Converting {} to {}", bin.display(), syx.display());
    let stream = read_bin(bin, config)?;
    report_stream(&stream);
    export_syx(stream, None, syx, config)
}

/// Decode a recording straight into a sysex file
pub fn wav_to_syx(wav: &Path, syx: &Path, config: &DecodeConfig) -> Result<SyxOutcome> {
    info!("Converting {} to {}", wav.display(), syx.display());
    let buffer = import_samples(wav)?;
    let decode = decode_samples(buffer, config);

    let stream = read_patches(decode.bytes.as_slice(), config)?;
    report_stream(&stream);
    if !stream.success() {
        decode.log_failure();
    }
    export_syx(stream, Some(decode), syx, config)
}

fn export_syx(
    stream: PatchStreamReport,
    decode: Option<TapeDecode>,
    syx: &Path,
    config: &DecodeConfig,
) -> Result<SyxOutcome> {
    let programs = remap_all(&stream.patches);
    let build = build_messages(&programs, config);

    let image = write_syx(syx, &build.payloads())?;
    let digest = sha256_hex(&image);
    info!("{} sha256 {}", syx.display(), digest);

    Ok(SyxOutcome {
        decode,
        stream,
        build,
        digest,
    })
}

/// Outcome of comparing a tape byte file with a known-good bank
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub stream: PatchStreamReport,
    pub comparison: GroundTruthReport,
}

impl CheckOutcome {
    pub fn success(&self) -> bool {
        self.stream.success() && self.comparison.success()
    }
}

/// Compare the programs in a tape byte file with a reference `.syx` bank
pub fn check_against(bin: &Path, known_syx: &Path, config: &DecodeConfig) -> Result<CheckOutcome> {
    info!("Checking {} against {}", bin.display(), known_syx.display());
    let stream = read_bin(bin, config)?;
    report_stream(&stream);

    let reference = reference_programs(&read_syx(known_syx)?);
    debug!("Reference bank holds {} program(s)", reference.len());
    let comparison = compare_programs(&remap_all(&stream.patches), &reference);

    Ok(CheckOutcome { stream, comparison })
}

/// Result of converting one file in a batch
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Written and verified
    pub verified: bool,
    /// Set if the file could not be converted at all
    pub error: Option<String>,
}

/// Summary of a batch conversion
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub entries: Vec<BatchEntry>,
}

impl BatchSummary {
    pub fn verified(&self) -> usize {
        self.entries.iter().filter(|e| e.verified).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.verified()
    }

    pub fn success(&self) -> bool {
        self.failed() == 0
    }
}

/// Path a batch conversion writes for `wav`
pub fn batch_output_path(wav: &Path) -> PathBuf {
    let stem = wav.file_stem().unwrap_or_default().to_string_lossy();
    wav.with_file_name(format!("{}.{}", stem, BATCH_SUFFIX))
}

/// Convert every `.wav` file below `dir` to a tape byte file next to it
///
/// A file that cannot be converted is recorded and the batch moves on.
pub fn batch_convert(dir: &Path, config: &DecodeConfig) -> Result<BatchSummary> {
    if !dir.is_dir() {
        return Err(TapeError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut recordings: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("wav"))
                .unwrap_or(false)
        })
        .map(|entry| entry.path().to_path_buf())
        .collect();
    recordings.sort();
    info!("Found {} recording(s) in {}", recordings.len(), dir.display());

    let mut summary = BatchSummary::default();
    for input in recordings {
        let output = batch_output_path(&input);
        let entry = match wav_to_bin(&input, &output, config) {
            Ok(outcome) => BatchEntry {
                input,
                output,
                verified: outcome.success(),
                error: None,
            },
            Err(e) => {
                warn!("Skipping {}: {}", input.display(), e);
                BatchEntry {
                    input,
                    output,
                    verified: false,
                    error: Some(e.to_string()),
                }
            }
        };
        summary.entries.push(entry);
    }

    info!(
        "Batch done: {} verified, {} failed",
        summary.verified(),
        summary.failed()
    );
    Ok(summary)
}

/// Hex SHA-256 of a byte slice
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn read_bin(path: &Path, config: &DecodeConfig) -> Result<PatchStreamReport> {
    if !path.exists() {
        return Err(TapeError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|e| TapeError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    read_patches(BufReader::new(file), config)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<String> {
    fs::write(path, bytes).map_err(|e| TapeError::FileWriteError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(sha256_hex(bytes))
}

fn report_stream(stream: &PatchStreamReport) {
    if stream.success() {
        info!("Found all {} patches, checksums OK", stream.patches.len());
    } else {
        for problem in stream.problems() {
            warn!("{}", problem);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{render_tape, TapeSignal};
    use crate::tape::{build_tape_image, Patch, PATCH_COUNT, PATCH_SIZE};

    fn bank() -> Vec<Patch> {
        (0..PATCH_COUNT)
            .map(|i| Patch::new([i as u8; PATCH_SIZE]))
            .collect()
    }

    #[test]
    fn test_decode_samples_recovers_bytes() {
        let bytes = vec![0xFF, 0xFF, 0x42, 0x03, 0x10, 0xEF];
        let decode = decode_samples(
            render_tape(&bytes, &TapeSignal::default()),
            &DecodeConfig::default(),
        );

        assert!(decode.clipped);
        assert!(!decode.filtered);
        // Only the idle lead-out after the last frame fails framing
        assert_eq!(decode.framing_errors, 1);
        assert_eq!(decode.bytes, bytes);
    }

    #[test]
    fn test_bin_to_syx_writes_all_dumps() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("tape.bin");
        let syx = dir.path().join("tape.syx");
        fs::write(&bin, build_tape_image(&bank(), 4)).unwrap();

        let outcome = bin_to_syx(&bin, &syx, &DecodeConfig::default()).unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.build.messages.len(), 64);
        let written = fs::read(&syx).unwrap();
        assert_eq!(written.len(), 64 * (55 + 2));
        assert_eq!(outcome.digest, sha256_hex(&written));
    }

    #[test]
    fn test_bin_to_syx_writes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("short.bin");
        let syx = dir.path().join("short.syx");
        let image = build_tape_image(&bank()[..10], 1);
        fs::write(&bin, image).unwrap();

        let outcome = bin_to_syx(&bin, &syx, &DecodeConfig::default()).unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.stream.patches.len(), 10);
        assert!(syx.exists());
        assert_eq!(read_syx(&syx).unwrap().len(), 10);
    }

    #[test]
    fn test_missing_bin_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = bin_to_syx(
            &dir.path().join("absent.bin"),
            &dir.path().join("out.syx"),
            &DecodeConfig::default(),
        );
        assert!(matches!(result, Err(TapeError::FileNotFound { .. })));
    }

    #[test]
    fn test_batch_output_path() {
        assert_eq!(
            batch_output_path(Path::new("/tapes/side_a.WAV")),
            PathBuf::from("/tapes/side_a.auto.bin")
        );
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
