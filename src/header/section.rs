//! The ELF32 section header (`Elf32_Shdr`, 40 bytes)

use super::le_u32;
use crate::error::Result;
use crate::reader::ByteSource;

pub(crate) const SHDR_SIZE: usize = 40;

/// Marks a section as `SHT_NOBITS` (`.bss`): it occupies no file space and
/// is logically zero-initialized.
pub(crate) const SHT_NOBITS: u32 = 8;

/// A single ELF32 section header.
#[derive(Debug, Clone, Copy)]
pub struct ElfSectionHeader {
    /// Offset into the section header string table
    pub sh_name: u32,
    /// Section type (`SHT_*`)
    pub sh_type: u32,
    /// File offset of this section's data
    pub sh_offset: u32,
    /// Size in bytes of this section's data
    pub sh_size: u32,
    /// Required alignment of this section's in-memory image
    pub sh_addralign: u32,
}

impl ElfSectionHeader {
    /// Read the section header at absolute file offset `at`.
    pub fn read_at(source: &mut impl ByteSource, at: u64) -> Result<Self> {
        let mut buf = [0u8; SHDR_SIZE];
        source.read_at(at, &mut buf)?;

        Ok(Self {
            sh_name: le_u32(&buf[0..4]),
            sh_type: le_u32(&buf[4..8]),
            sh_offset: le_u32(&buf[16..20]),
            sh_size: le_u32(&buf[20..24]),
            sh_addralign: le_u32(&buf[32..36]),
        })
    }

    /// File offset of the `n`-th entry of the section header table which
    /// starts at `shoff`.
    pub fn offset_of(shoff: u32, n: u16) -> u64 {
        shoff as u64 + n as u64 * SHDR_SIZE as u64
    }
}
