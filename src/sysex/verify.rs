//! Ground-truth comparison
//!
//! Checks decoded programs against a known-good sysex bank, parameter by
//! parameter. Useful for tuning the decoder on a tape whose contents are known.

use std::fmt;

use log::{info, warn};

use crate::sysex::mapping::SysexParameterSet;
use crate::sysex::message::SysexMessage;

/// A parameter that differs from the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterMismatch {
    pub program: usize,
    pub param: usize,
    pub expected: u8,
    pub actual: u8,
}

impl fmt::Display for ParameterMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "program {} parameter {}: expected {}, got {}",
            self.program, self.param, self.expected, self.actual
        )
    }
}

/// Outcome of a ground-truth comparison
#[derive(Debug, Clone, Default)]
pub struct GroundTruthReport {
    /// Programs compared against a reference
    pub compared: usize,
    /// Decoded programs beyond the end of the reference bank
    pub unmatched: usize,
    /// Reference programs with no decoded counterpart
    pub missing: usize,
    pub mismatches: Vec<ParameterMismatch>,
}

impl GroundTruthReport {
    /// Every program present on both sides and identical
    pub fn success(&self) -> bool {
        self.mismatches.is_empty() && self.unmatched == 0 && self.missing == 0
    }
}

/// Program dumps among a list of payloads, other messages skipped
pub fn reference_programs(payloads: &[Vec<u8>]) -> Vec<SysexParameterSet> {
    payloads
        .iter()
        .filter_map(|p| SysexMessage::parse(p))
        .filter_map(|m| m.params().copied())
        .collect()
}

/// Compare decoded programs with reference programs at the same index
pub fn compare_programs(
    decoded: &[SysexParameterSet],
    reference: &[SysexParameterSet],
) -> GroundTruthReport {
    let mut report = GroundTruthReport {
        compared: decoded.len().min(reference.len()),
        unmatched: decoded.len().saturating_sub(reference.len()),
        missing: reference.len().saturating_sub(decoded.len()),
        ..Default::default()
    };

    for (program, (actual, expected)) in decoded.iter().zip(reference).enumerate() {
        for (param, (&a, &e)) in actual.iter().zip(expected.iter()).enumerate() {
            if a != e {
                report.mismatches.push(ParameterMismatch {
                    program,
                    param,
                    expected: e,
                    actual: a,
                });
            }
        }
    }

    if report.success() {
        info!("All {} programs match the reference", report.compared);
    } else {
        for mismatch in &report.mismatches {
            warn!("Mismatch in {}", mismatch);
        }
        warn!(
            "{} mismatching parameter(s), {} unmatched and {} missing program(s)",
            report.mismatches.len(),
            report.unmatched,
            report.missing
        );
    }
    report
}
