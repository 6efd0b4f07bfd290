//! Error type for the loader pipeline

use std::io;

#[derive(thiserror::Error, Debug)]
/// Everything that can abort a load: I/O, parse shape, allocation,
/// unresolved symbol, unknown relocation type, and missing entry point.
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("not an ELF32 little-endian ARM relocatable object: {0}")]
    InvalidHeader(&'static str),

    #[error("missing mandatory section(s): {0}")]
    ParseShape(&'static str),

    #[error("allocator returned no memory for a {size}-byte, align-{align} region")]
    Alloc {
        /// requested size in bytes
        size: usize,
        /// requested alignment in bytes
        align: usize,
    },

    #[error("unresolved symbol `{0}`")]
    Unresolved(String),

    #[error("unknown relocation type {0}")]
    UnknownRelocType(u8),

    #[error("relocation offset {offset:#x} is out of bounds for section of size {size:#x}")]
    RelocOutOfBounds {
        /// the r_offset that was out of bounds
        offset: u32,
        /// the size of the section the relocation targeted
        size: u32,
    },

    #[error("displacement {0:#x} does not fit in a 25-bit signed Thumb-2 branch")]
    DisplacementOverflow(i32),

    #[error("no entry point: e_entry is 0 or falls outside the .text section")]
    NoEntry,
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
