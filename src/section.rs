//! Section directory construction: scan the section header table once,
//! classify sections by exact name match, and stop early once every
//! recognized role has been found.

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::header::elf::ElfHeader;
use crate::header::section::{ElfSectionHeader, SHDR_SIZE};
use crate::reader::ByteSource;

bitflags! {
    /// Which recognized roles have been found while scanning the section
    /// header table. Each `.rel.X` sibling gets its own bit, distinct from
    /// its payload section's bit, so `ALL` is actually reachable and the
    /// early-exit short circuit works correctly for every combination of
    /// present sections.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FoundRoles: u32 {
        const SYMTAB    = 1 << 0;
        const STRTAB    = 1 << 1;
        const TEXT      = 1 << 2;
        const RODATA    = 1 << 3;
        const DATA      = 1 << 4;
        const BSS       = 1 << 5;
        const REL_TEXT  = 1 << 6;
        const REL_RODATA = 1 << 7;
        const REL_DATA  = 1 << 8;
        const REL_BSS   = 1 << 9;

        const VALID = Self::SYMTAB.bits() | Self::STRTAB.bits();
        const EXEC  = Self::VALID.bits() | Self::TEXT.bits();
        const ALL   = Self::VALID.bits()
            | Self::TEXT.bits() | Self::RODATA.bits() | Self::DATA.bits() | Self::BSS.bits()
            | Self::REL_TEXT.bits() | Self::REL_RODATA.bits() | Self::REL_DATA.bits() | Self::REL_BSS.bits();
    }
}

/// One of the four payload sections the loader knows how to load and
/// relocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// `.text`
    Text,
    /// `.rodata`
    Rodata,
    /// `.data`
    Data,
    /// `.bss`
    Bss,
}

impl SectionKind {
    /// All four, in the fixed order used throughout the loader.
    pub const ALL: [SectionKind; 4] = [Self::Text, Self::Rodata, Self::Data, Self::Bss];

    /// The conventional section name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => ".text",
            Self::Rodata => ".rodata",
            Self::Data => ".data",
            Self::Bss => ".bss",
        }
    }
}

/// Bookkeeping for one payload section: its ELF section index, where to
/// re-read its header, and where its relocation sibling's header is (if
/// any). The section's loaded bytes live in [`crate::image::LoadedImage`]
/// once loading begins; this struct only tracks where to find them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionRecord {
    /// ELF section index, or 0 if this role was not found in the object
    pub index: u16,
    /// File offset of this section's own header, or 0 if not found
    pub header_off: u64,
    /// File offset of the matching `.rel.X` section's header, or 0 if none
    pub rel_header_off: u64,
}

impl SectionRecord {
    fn found(&self) -> bool {
        self.index != 0 && self.header_off != 0
    }
}

/// The result of scanning an object's section header table: locations of
/// the symbol/string tables and the four payload sections, by role.
#[derive(Debug, Clone, Default)]
pub struct SectionDirectory {
    /// File offset of `.symtab`'s data
    pub symtab_off: u64,
    /// Number of entries in `.symtab`
    pub symtab_count: u32,
    /// File offset of `.strtab`'s data (symbol names)
    pub strtab_off: u64,
    /// File offset of the section header string table's data (used to name
    /// section symbols)
    pub shstrtab_off: u64,
    /// The four payload section records, indexed by [`SectionKind`]
    pub sections: [SectionRecord; 4],
    found: FoundRoles,
}

impl SectionDirectory {
    /// Record for `kind`.
    pub fn section(&self, kind: SectionKind) -> &SectionRecord {
        &self.sections[kind as usize]
    }

    fn section_mut(&mut self, kind: SectionKind) -> &mut SectionRecord {
        &mut self.sections[kind as usize]
    }

    /// A load is *valid* iff both `.symtab` and `.strtab` were found, and
    /// additionally *executable* iff `.text` was also found.
    pub fn is_valid(&self) -> bool {
        self.found.contains(FoundRoles::VALID)
    }

    /// See [`Self::is_valid`].
    pub fn is_executable(&self) -> bool {
        self.found.contains(FoundRoles::EXEC)
    }

    /// Parse the ELF header and scan the section header table, classifying
    /// sections by exact name match.
    pub fn scan(source: &mut impl ByteSource) -> Result<(ElfHeader, Self)> {
        let header = ElfHeader::read(source)?;

        let shstrtab_hdr_off = ElfSectionHeader::offset_of(header.e_shoff, header.e_shstrndx);
        let shstrtab_hdr = ElfSectionHeader::read_at(source, shstrtab_hdr_off)?;

        let mut dir = SectionDirectory {
            shstrtab_off: shstrtab_hdr.sh_offset as u64,
            ..Default::default()
        };

        for n in 1..header.e_shnum {
            let hdr_off = ElfSectionHeader::offset_of(header.e_shoff, n);
            let hdr = ElfSectionHeader::read_at(source, hdr_off)?;

            let name = if hdr.sh_name != 0 {
                source.read_cstr_at(dir.shstrtab_off + hdr.sh_name as u64, 64)?
            } else {
                String::new()
            };

            log::trace!("examining section {n} {name:?}");

            let role = match name.as_str() {
                ".symtab" => Some(FoundRoles::SYMTAB),
                ".strtab" => Some(FoundRoles::STRTAB),
                ".text" => Some(FoundRoles::TEXT),
                ".rodata" => Some(FoundRoles::RODATA),
                ".data" => Some(FoundRoles::DATA),
                ".bss" => Some(FoundRoles::BSS),
                ".rel.text" => Some(FoundRoles::REL_TEXT),
                ".rel.rodata" => Some(FoundRoles::REL_RODATA),
                ".rel.data" => Some(FoundRoles::REL_DATA),
                ".rel.bss" => Some(FoundRoles::REL_BSS),
                _ => None,
            };

            if let Some(role) = role {
                if dir.found.contains(role) {
                    return Err(Error::ParseShape("duplicate section"));
                }
                dir.found |= role;
            }

            match name.as_str() {
                ".symtab" => {
                    dir.symtab_off = hdr.sh_offset as u64;
                    dir.symtab_count = hdr.sh_size / SYM_ENTRY_SIZE;
                }
                ".strtab" => {
                    dir.strtab_off = hdr.sh_offset as u64;
                }
                ".text" => {
                    dir.section_mut(SectionKind::Text).index = n;
                    dir.section_mut(SectionKind::Text).header_off = hdr_off;
                }
                ".rodata" => {
                    dir.section_mut(SectionKind::Rodata).index = n;
                    dir.section_mut(SectionKind::Rodata).header_off = hdr_off;
                }
                ".data" => {
                    dir.section_mut(SectionKind::Data).index = n;
                    dir.section_mut(SectionKind::Data).header_off = hdr_off;
                }
                ".bss" => {
                    dir.section_mut(SectionKind::Bss).index = n;
                    dir.section_mut(SectionKind::Bss).header_off = hdr_off;
                }
                ".rel.text" => {
                    dir.section_mut(SectionKind::Text).rel_header_off = hdr_off;
                }
                ".rel.rodata" => {
                    dir.section_mut(SectionKind::Rodata).rel_header_off = hdr_off;
                }
                ".rel.data" => {
                    dir.section_mut(SectionKind::Data).rel_header_off = hdr_off;
                }
                ".rel.bss" => {
                    dir.section_mut(SectionKind::Bss).rel_header_off = hdr_off;
                }
                _ => {}
            }

            if dir.found.contains(FoundRoles::ALL) {
                break;
            }
        }

        if !dir.is_valid() {
            return Err(Error::ParseShape("missing .symtab or .strtab"));
        }

        Ok((header, dir))
    }

    /// Look up the payload section whose ELF section index is `shndx`,
    /// among the four tracked roles. `None` if the symbol lives in a
    /// section this loader does not track.
    pub fn kind_of_index(&self, shndx: u16) -> Option<SectionKind> {
        SectionKind::ALL
            .into_iter()
            .find(|&kind| self.section(kind).index == shndx && self.section(kind).found())
    }
}

const SYM_ENTRY_SIZE: u32 = 16;

const _: () = assert!(SHDR_SIZE == 40);
