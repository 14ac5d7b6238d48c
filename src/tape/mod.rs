//! Tape byte streams
//!
//! Layout of a DW-8000 tape dump and the reader that recovers patches from it.

pub mod patch;
pub mod reader;

pub use patch::{
    build_tape_image, checksum, Patch, DEVICE_ID, HEADER_MARKER, MANUFACTURER_ID, PATCH_COUNT,
    PATCH_SIZE,
};
pub use reader::{read_patches, ChecksumError, PatchStreamReport, PrematureEof, ReaderState};
