//! Parameter Remapper
//!
//! The tape packs the 51 program parameters of the DW-8000 into 30 bytes. The
//! sysex layout gives every parameter its own byte. [`MAPPING_TABLE`] lists the
//! bit-field copies that convert one layout into the other; the table is data,
//! not code, and [`validate_table`] checks it mechanically.

use std::fmt;

use crate::tape::{Patch, PATCH_SIZE};

/// Parameters in a DW-8000 program dump
pub const SYSEX_PARAM_COUNT: usize = 51;

/// One program in sysex layout
pub type SysexParameterSet = [u8; SYSEX_PARAM_COUNT];

/// Copy of one bit-field from a tape byte into a sysex parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingRule {
    /// Tape byte holding the field (0-29)
    pub source_byte: usize,
    /// Position of the field's lowest bit in the tape byte
    pub source_shift: u8,
    /// Field width in bits (1-6)
    pub bit_width: u8,
    /// Sysex parameter receiving the field (0-50)
    pub dest_param: usize,
    /// Position of the field's lowest bit in the parameter
    pub dest_left_shift: u8,
}

impl MappingRule {
    const fn new(source_byte: usize, bit_width: u8, dest_param: usize, source_shift: u8) -> Self {
        Self {
            source_byte,
            source_shift,
            bit_width,
            dest_param,
            dest_left_shift: 0,
        }
    }

    const fn shifted_into(mut self, dest_left_shift: u8) -> Self {
        self.dest_left_shift = dest_left_shift;
        self
    }

    /// Mask of the field, right-aligned
    pub fn mask(&self) -> u8 {
        ((1u16 << self.bit_width) - 1) as u8
    }

    /// Bits this rule reads in its tape byte
    pub fn source_bits(&self) -> u16 {
        (self.mask() as u16) << self.source_shift
    }

    /// Bits this rule writes in its parameter
    pub fn dest_bits(&self) -> u16 {
        (self.mask() as u16) << self.dest_left_shift
    }

    /// Apply the rule to one tape patch
    pub fn apply(&self, tape: &[u8; PATCH_SIZE], dest: &mut SysexParameterSet) {
        let value = (tape[self.source_byte] >> self.source_shift) & self.mask();
        dest[self.dest_param] |= value << self.dest_left_shift;
    }
}

/// Tape-to-sysex bit-field table, ordered by destination parameter
///
/// Parameter 32 is split over two tape bytes: its high three bits sit in the
/// low bits of byte 18 and its low two bits in the top of byte 19.
pub const MAPPING_TABLE: [MappingRule; 52] = [
    MappingRule::new(1, 2, 0, 5),
    MappingRule::new(0, 4, 1, 0),
    MappingRule::new(1, 5, 2, 0),
    MappingRule::new(3, 2, 3, 5),
    MappingRule::new(3, 1, 4, 7),
    MappingRule::new(19, 5, 5, 0),
    MappingRule::new(3, 5, 6, 0),
    MappingRule::new(2, 2, 7, 5),
    MappingRule::new(0, 4, 8, 4),
    MappingRule::new(2, 5, 9, 0),
    MappingRule::new(4, 3, 10, 0),
    MappingRule::new(6, 3, 11, 0),
    MappingRule::new(4, 5, 12, 3),
    MappingRule::new(26, 2, 13, 0),
    MappingRule::new(29, 6, 14, 0),
    MappingRule::new(5, 6, 15, 2),
    MappingRule::new(6, 5, 16, 3),
    MappingRule::new(5, 2, 17, 0),
    MappingRule::new(1, 1, 18, 7),
    MappingRule::new(7, 5, 19, 3),
    MappingRule::new(8, 5, 20, 0),
    MappingRule::new(9, 5, 21, 0),
    MappingRule::new(10, 5, 22, 0),
    MappingRule::new(11, 5, 23, 0),
    MappingRule::new(12, 5, 24, 0),
    MappingRule::new(13, 5, 25, 0),
    MappingRule::new(7, 3, 26, 0),
    MappingRule::new(14, 5, 27, 0),
    MappingRule::new(15, 5, 28, 0),
    MappingRule::new(16, 5, 29, 0),
    MappingRule::new(17, 5, 30, 0),
    MappingRule::new(18, 5, 31, 3),
    MappingRule::new(18, 3, 32, 0).shifted_into(2),
    MappingRule::new(19, 2, 32, 6),
    MappingRule::new(20, 3, 33, 0),
    MappingRule::new(27, 2, 34, 0),
    MappingRule::new(20, 5, 35, 3),
    MappingRule::new(23, 5, 36, 3),
    MappingRule::new(24, 5, 37, 3),
    MappingRule::new(25, 5, 38, 3),
    MappingRule::new(22, 4, 39, 0),
    MappingRule::new(2, 1, 40, 7),
    MappingRule::new(21, 3, 41, 0),
    MappingRule::new(22, 4, 42, 4),
    MappingRule::new(28, 4, 43, 4),
    MappingRule::new(27, 5, 44, 3),
    MappingRule::new(21, 5, 45, 3),
    MappingRule::new(28, 4, 46, 0),
    MappingRule::new(26, 5, 47, 3),
    MappingRule::new(23, 2, 48, 0),
    MappingRule::new(24, 2, 49, 0),
    MappingRule::new(25, 2, 50, 0),
];

/// A defect found by [`validate_table`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableDefect {
    /// Rule refers to a tape byte or parameter that does not exist
    OutOfRange { rule: usize },
    /// Bit width outside 1-6
    BadWidth { rule: usize, width: u8 },
    /// Field extends past bit 7 of its tape byte
    SourceOverflow { rule: usize },
    /// Parameter value would reach bit 7, which sysex data bytes cannot carry
    DestOverflow { rule: usize },
    /// Two rules read the same tape bit
    SourceOverlap { rule: usize, byte: usize },
    /// Two rules write the same parameter bit
    DestOverlap { rule: usize, param: usize },
    /// Parameter bits do not form a range starting at bit 0
    NotContiguous { param: usize, bits: u16 },
}

impl fmt::Display for TableDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableDefect::OutOfRange { rule } => write!(f, "rule {} is out of range", rule),
            TableDefect::BadWidth { rule, width } => {
                write!(f, "rule {} has bit width {}", rule, width)
            }
            TableDefect::SourceOverflow { rule } => {
                write!(f, "rule {} reads past the end of its tape byte", rule)
            }
            TableDefect::DestOverflow { rule } => {
                write!(f, "rule {} writes into bit 7 of its parameter", rule)
            }
            TableDefect::SourceOverlap { rule, byte } => {
                write!(f, "rule {} reads bits of tape byte {} already used", rule, byte)
            }
            TableDefect::DestOverlap { rule, param } => {
                write!(f, "rule {} writes bits of parameter {} already set", rule, param)
            }
            TableDefect::NotContiguous { param, bits } => {
                write!(f, "parameter {} covers bits {:07b}", param, bits)
            }
        }
    }
}

/// Check a mapping table for structural defects
///
/// Every parameter must be covered, its bits contiguous from bit 0, and no two
/// rules may share a source or destination bit.
pub fn validate_table(table: &[MappingRule]) -> Result<(), TableDefect> {
    let mut source_used = [0u16; PATCH_SIZE];
    let mut dest_used = [0u16; SYSEX_PARAM_COUNT];

    for (rule_ref, rule) in table.iter().enumerate() {
        if rule.source_byte >= PATCH_SIZE || rule.dest_param >= SYSEX_PARAM_COUNT {
            return Err(TableDefect::OutOfRange { rule: rule_ref });
        }
        if !(1..=6).contains(&rule.bit_width) {
            return Err(TableDefect::BadWidth {
                rule: rule_ref,
                width: rule.bit_width,
            });
        }
        if rule.source_shift + rule.bit_width > 8 {
            return Err(TableDefect::SourceOverflow { rule: rule_ref });
        }
        if rule.dest_left_shift + rule.bit_width > 7 {
            return Err(TableDefect::DestOverflow { rule: rule_ref });
        }

        let source = &mut source_used[rule.source_byte];
        if *source & rule.source_bits() != 0 {
            return Err(TableDefect::SourceOverlap {
                rule: rule_ref,
                byte: rule.source_byte,
            });
        }
        *source |= rule.source_bits();

        let dest = &mut dest_used[rule.dest_param];
        if *dest & rule.dest_bits() != 0 {
            return Err(TableDefect::DestOverlap {
                rule: rule_ref,
                param: rule.dest_param,
            });
        }
        *dest |= rule.dest_bits();
    }

    for (param, &bits) in dest_used.iter().enumerate() {
        // Contiguous from bit 0 means bits + 1 is a power of two
        if bits == 0 || (bits & (bits + 1)) != 0 {
            return Err(TableDefect::NotContiguous { param, bits });
        }
    }
    Ok(())
}

/// Convert one tape patch to sysex layout
pub fn remap(patch: &Patch) -> SysexParameterSet {
    // The constant table is validated by test_table_is_valid; debug builds recheck it here
    debug_assert!(validate_table(&MAPPING_TABLE).is_ok());

    let mut params = [0u8; SYSEX_PARAM_COUNT];
    for rule in MAPPING_TABLE.iter() {
        rule.apply(patch.as_bytes(), &mut params);
    }
    params
}

/// Convert a sequence of tape patches, preserving order
pub fn remap_all(patches: &[Patch]) -> Vec<SysexParameterSet> {
    patches.iter().map(remap).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_is_valid() {
        assert_eq!(validate_table(&MAPPING_TABLE), Ok(()));
    }

    #[test]
    fn test_all_ones_sets_every_bit() {
        let params = remap(&Patch::new([0xFF; PATCH_SIZE]));

        let mut widths = [0u8; SYSEX_PARAM_COUNT];
        for rule in MAPPING_TABLE.iter() {
            widths[rule.dest_param] += rule.bit_width;
        }
        for (param, &value) in params.iter().enumerate() {
            assert_eq!(value, ((1u16 << widths[param]) - 1) as u8, "param {}", param);
            assert!(value < 0x80);
        }
        assert_eq!(params[32], 0x1F);
    }

    #[test]
    fn test_all_zero_patch() {
        assert_eq!(remap(&Patch::default()), [0u8; SYSEX_PARAM_COUNT]);
    }

    #[test]
    fn test_split_parameter() {
        let mut bytes = [0u8; PATCH_SIZE];
        bytes[18] = 0b0000_0101;
        bytes[19] = 0b1000_0000;

        let params = remap(&Patch::new(bytes));
        assert_eq!(params[32], 0b10110);
        assert_eq!(params[31], 0);
        assert_eq!(params[5], 0);
    }

    #[test]
    fn test_fields_are_extracted_independently() {
        let mut bytes = [0u8; PATCH_SIZE];
        // Byte 0 carries param 1 in its low nibble and param 8 in its high nibble
        bytes[0] = 0x9C;
        // Byte 1: param 18 (bit 7), param 0 (bits 5-6), param 2 (bits 0-4)
        bytes[1] = 0b1_01_00110;

        let params = remap(&Patch::new(bytes));
        assert_eq!(params[1], 0x0C);
        assert_eq!(params[8], 0x09);
        assert_eq!(params[18], 1);
        assert_eq!(params[0], 1);
        assert_eq!(params[2], 6);
    }

    #[test]
    fn test_validator_catches_overlapping_source() {
        let mut table = MAPPING_TABLE;
        table[1] = MappingRule::new(1, 4, 1, 0);
        assert_eq!(
            validate_table(&table),
            Err(TableDefect::SourceOverlap { rule: 2, byte: 1 })
        );
    }

    #[test]
    fn test_validator_catches_bit_seven() {
        let mut table = MAPPING_TABLE;
        table[0] = MappingRule::new(1, 2, 0, 5).shifted_into(6);
        assert_eq!(
            validate_table(&table),
            Err(TableDefect::DestOverflow { rule: 0 })
        );
    }

    #[test]
    fn test_validator_catches_gap() {
        let mut table = MAPPING_TABLE;
        table[33] = MappingRule::new(19, 1, 32, 6);
        assert_eq!(
            validate_table(&table),
            Err(TableDefect::NotContiguous {
                param: 32,
                bits: 0b11101
            })
        );
    }

    #[test]
    fn test_remap_all_keeps_order() {
        let patches = vec![Patch::default(), Patch::new([0xFF; PATCH_SIZE])];
        let sets = remap_all(&patches);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0][1], 0);
        assert_eq!(sets[1][1], 0x0F);
    }
}
