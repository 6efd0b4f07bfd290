//! The load pipeline: section loading, the relocation walk, and entry
//! dispatch, glued into one `Loader`/`LoadedImage` pair so the unsafe call
//! itself can be isolated and deferred by callers that want to inspect a
//! load before executing it.

use crate::arch::arm32::{self, RelocationType};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::header::relocation::ElfRel;
use crate::header::section::{ElfSectionHeader, SHT_NOBITS};
use crate::memory::{ExecAllocator, ExecRegion};
use crate::reader::ByteSource;
use crate::section::{SectionDirectory, SectionKind};
use crate::symbol;
use crate::symbol::ExportedSymbols;

/// Loads one object file end to end, up to (but not including) entry
/// dispatch. Split out from [`LoadedImage::execute`] so tests and hosts
/// that want more control can inspect a load without invoking untrusted
/// code.
pub struct Loader;

/// A fully loaded and relocated object, ready to run. Exclusively owns the
/// four section allocations for its lifetime; dropping it without calling
/// [`Self::execute`] simply frees the sections without ever transferring
/// control.
#[derive(Debug)]
pub struct LoadedImage {
    sections: [ExecRegion; 4],
    entry_offset: u32,
}

impl Loader {
    /// Parse the section directory, load the four payload sections into
    /// memory, and apply every relocation. Does not touch the entry point.
    pub fn load(
        source: &mut impl ByteSource,
        exported: &impl ExportedSymbols,
        alloc: &impl ExecAllocator,
        config: &Config,
    ) -> Result<LoadedImage> {
        let (header, dir) = SectionDirectory::scan(source)?;

        if !dir.is_executable() {
            return Err(Error::ParseShape(".text not found"));
        }

        symbol::dump_symbols(source, &dir)?;

        let mut sections = load_sections(source, &dir, alloc)?;

        relocate_sections(source, &dir, exported, &mut sections, config)?;

        let text_len = sections[SectionKind::Text as usize].len() as u32;
        if header.e_entry == 0 || header.e_entry >= text_len {
            return Err(Error::NoEntry);
        }

        Ok(LoadedImage {
            sections,
            entry_offset: header.e_entry,
        })
    }
}

fn load_sections(
    source: &mut impl ByteSource,
    dir: &SectionDirectory,
    alloc: &impl ExecAllocator,
) -> Result<[ExecRegion; 4]> {
    let mut regions: Vec<ExecRegion> = Vec::with_capacity(4);

    for kind in SectionKind::ALL {
        let record = dir.section(kind);
        if record.index == 0 || record.header_off == 0 {
            // Section absent: an empty region is silently skipped by every
            // downstream stage.
            regions.push(alloc.alloc(0, 1)?);
            continue;
        }

        let hdr = ElfSectionHeader::read_at(source, record.header_off)?;
        log::debug!("loading section {} ({} bytes)", kind.name(), hdr.sh_size);

        let mut region = alloc.alloc(hdr.sh_size as usize, hdr.sh_addralign.max(1) as usize)?;

        if hdr.sh_type == SHT_NOBITS {
            // `.bss`: zero-initialized, nothing to read from the file.
            region.as_mut_slice().fill(0);
        } else {
            source.read_at(hdr.sh_offset as u64, region.as_mut_slice())?;
        }

        dump_section(kind, region.as_mut_slice());

        regions.push(region);
    }

    regions
        .try_into()
        .map_err(|_| Error::ParseShape("unreachable: exactly 4 payload sections"))
}

/// Trace-log a loaded section's raw bytes as hex, 16 bytes per line. A
/// no-op unless `trace`-level logging is enabled.
fn dump_section(kind: SectionKind, bytes: &[u8]) {
    if !log::log_enabled!(log::Level::Trace) {
        return;
    }
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        log::trace!("{} +{:#06x}: {}", kind.name(), i * 16, hex.join(" "));
    }
}

fn relocate_sections(
    source: &mut impl ByteSource,
    dir: &SectionDirectory,
    exported: &impl ExportedSymbols,
    sections: &mut [ExecRegion; 4],
    config: &Config,
) -> Result<()> {
    let bases: [u32; 4] = std::array::from_fn(|i| sections[i].base());

    for kind in SectionKind::ALL {
        let rel_header_off = dir.section(kind).rel_header_off;
        if rel_header_off == 0 {
            continue; // no relocation sibling for this section; not an error
        }

        let rel_hdr = ElfSectionHeader::read_at(source, rel_header_off)?;
        let count = rel_hdr.sh_size / 8;
        log::trace!("relocating section {} ({count} entries)", kind.name());

        let section_size = sections[kind as usize].len() as u32;

        for n in 0..count {
            let rel = ElfRel::read(source, rel_hdr.sh_offset as u64, n)?;

            let in_bounds = matches!(rel.r_offset.checked_add(4), Some(end) if end <= section_size);
            if !in_bounds {
                return Err(Error::RelocOutOfBounds {
                    offset: rel.r_offset,
                    size: section_size,
                });
            }

            let kind_enum = RelocationType::from_raw(rel.kind())?;

            let s = symbol::resolve_address(
                source,
                dir,
                exported,
                |k| bases[k as usize],
                rel.sym(),
            )?;
            let p = bases[kind as usize] + rel.r_offset;

            log::trace!(" {kind_enum} offset={:#x} S={s:#x} P={p:#x}", rel.r_offset);

            let patch = &mut sections[kind as usize].as_mut_slice()
                [rel.r_offset as usize..rel.r_offset as usize + 4];
            arm32::apply(kind_enum, patch, s, p, config.strict_relocation_range)?;
        }
    }

    Ok(())
}

impl LoadedImage {
    /// The entry pointer: `.text` base plus `e_entry`.
    pub fn entry_address(&self) -> u32 {
        self.sections[SectionKind::Text as usize].base() + self.entry_offset
    }

    /// The loaded, relocated bytes of one payload section. Useful for
    /// inspecting a load's result without dispatching into it.
    pub fn section(&mut self, kind: SectionKind) -> &[u8] {
        self.sections[kind as usize].as_mut_slice()
    }

    /// Switch every section's memory to read+execute, flush the
    /// instruction cache, and transfer control to the entry point. This is
    /// the crate's one inherently `unsafe` operation: it calls into memory
    /// this crate patched as raw machine code with no further type safety.
    ///
    /// Returns when the loaded code returns, and tears down every section
    /// allocation on the way out whether or not the call succeeds. This is
    /// a single call then teardown: any pointer the loaded code retained
    /// into its sections is dangling after this returns.
    pub fn execute(mut self) -> Result<()> {
        for region in &mut self.sections {
            region.make_executable()?;
        }

        let entry = self.entry_address();
        log::debug!("dispatching entry at {entry:#010x}");

        // SAFETY: `entry` points into the `.text` region we just made
        // read+execute, at an offset checked to be `< text.size` in
        // `Loader::load`. The caller is trusted to have supplied a
        // well-formed object; we call it exactly once and tear down
        // immediately after.
        unsafe {
            let entry_fn: extern "C" fn() = std::mem::transmute(entry as usize);
            entry_fn();
        }

        Ok(())
    }
}
