//! CLI Command Implementations
//!
//! Each command returns `Ok(true)` when the conversion is complete and verified,
//! `Ok(false)` when output was written but something is missing or wrong.

use std::path::Path;

use log::info;

use crate::config::DecodeConfig;
use crate::error::Result;
use crate::pipeline::{self, SyxOutcome};

/// Decode a recording into a tape byte file.
pub fn wav_to_bin(wav: &Path, bin: &Path, config: &DecodeConfig) -> Result<bool> {
    config.validate()?;
    let outcome = pipeline::wav_to_bin(wav, bin, config)?;

    println!(
        "Wrote {} bytes to {} ({} signal{})",
        outcome.decode.bytes.len(),
        bin.display(),
        if outcome.decode.clipped { "clipped" } else { "unclipped" },
        if outcome.decode.filtered { ", filtered" } else { "" }
    );
    print_stream_summary(outcome.verification.patches.len(), outcome.success());
    for problem in outcome.verification.problems() {
        println!("  {}", problem);
    }

    Ok(outcome.success())
}

/// Convert a tape byte file into a sysex bank.
pub fn bin_to_syx(bin: &Path, syx: &Path, config: &DecodeConfig) -> Result<bool> {
    config.validate()?;
    let outcome = pipeline::bin_to_syx(bin, syx, config)?;
    print_syx_outcome(&outcome, syx);
    Ok(outcome.success())
}

/// Decode a recording straight into a sysex bank.
pub fn wav_to_syx(wav: &Path, syx: &Path, config: &DecodeConfig) -> Result<bool> {
    config.validate()?;
    let outcome = pipeline::wav_to_syx(wav, syx, config)?;
    print_syx_outcome(&outcome, syx);
    Ok(outcome.success())
}

/// Compare a tape byte file with a known-good bank.
pub fn check(bin: &Path, known: &Path, config: &DecodeConfig) -> Result<bool> {
    config.validate()?;
    let outcome = pipeline::check_against(bin, known, config)?;

    print_stream_summary(outcome.stream.patches.len(), outcome.stream.success());
    let comparison = &outcome.comparison;
    if comparison.success() {
        println!("All {} programs match {}", comparison.compared, known.display());
    } else {
        println!(
            "{} of {} programs compared, {} parameter mismatch(es)",
            comparison.compared,
            comparison.compared + comparison.missing + comparison.unmatched,
            comparison.mismatches.len()
        );
        for mismatch in &comparison.mismatches {
            println!("  {}", mismatch);
        }
    }

    Ok(outcome.success())
}

/// Decode every recording below a directory.
pub fn batch(dir: &Path, config: &DecodeConfig) -> Result<bool> {
    config.validate()?;
    let summary = pipeline::batch_convert(dir, config)?;

    println!("Batch Results:");
    println!("{:-<60}", "");
    for entry in &summary.entries {
        let status = match (&entry.error, entry.verified) {
            (Some(error), _) => format!("ERROR {}", error),
            (None, true) => "OK".to_string(),
            (None, false) => "FAILED".to_string(),
        };
        println!("{:<8} {}", status, entry.input.display());
    }
    println!("{:-<60}", "");
    println!(
        "{} verified, {} failed",
        summary.verified(),
        summary.failed()
    );
    info!("Batch over {} finished", dir.display());

    Ok(summary.success())
}

fn print_stream_summary(patches: usize, success: bool) {
    if success {
        println!("Found all {} patches, checksums OK", patches);
    } else {
        println!("Verification FAILED: {} patch(es) recovered", patches);
    }
}

fn print_syx_outcome(outcome: &SyxOutcome, syx: &Path) {
    print_stream_summary(outcome.stream.patches.len(), outcome.stream.success());
    for problem in outcome.stream.problems() {
        println!("  {}", problem);
    }
    for index in &outcome.build.unslotted {
        println!("  Too many patches: no store slot for patch {}", index);
    }
    println!(
        "Wrote {} message(s) to {} (sha256 {})",
        outcome.build.messages.len(),
        syx.display(),
        outcome.digest
    );
}
