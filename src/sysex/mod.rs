//! DW-8000 System Exclusive
//!
//! Tape-to-sysex parameter remapping, message building, `.syx` file I/O and
//! comparison against a known-good bank.

pub mod mapping;
pub mod message;
pub mod syx;
pub mod verify;

pub use mapping::{
    remap, remap_all, validate_table, MappingRule, SysexParameterSet, TableDefect,
    MAPPING_TABLE, SYSEX_PARAM_COUNT,
};
pub use message::{build_messages, is_program_dump, SysexBuild, SysexMessage};
pub use syx::{decode_syx, encode_syx, read_syx, write_syx};
pub use verify::{compare_programs, reference_programs, GroundTruthReport, ParameterMismatch};
