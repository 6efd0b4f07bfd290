//! ELF32 little-endian structures specific to the object formats this loader
//! understands: the file header, section headers, symbol table entries, and
//! REL relocation entries.
//!
//! Only what the loader actually consumes is modeled. Program headers,
//! dynamic sections, note sections, and every other part of the ELF format
//! that applies to `ET_DYN`/`ET_EXEC` images is out of scope (§1 Non-goals).

pub mod elf;
pub mod relocation;
pub mod section;
pub mod symbol;

pub(crate) fn le_u16(buf: &[u8]) -> u16 {
    u16::from_le_bytes([buf[0], buf[1]])
}

pub(crate) fn le_u32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}
