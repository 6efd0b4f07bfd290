//! Symbol name resolution and the host-exported symbol table.

use crate::error::{Error, Result};
use crate::header::symbol::{ElfSymbol, SHN_UNDEF};
use crate::reader::ByteSource;
use crate::section::SectionDirectory;

/// A `(name, address)` pair the host firmware exposes to loaded objects.
#[derive(Debug, Clone, Copy)]
pub struct ExportedSymbol {
    /// The symbol name as it appears in the object's relocations
    pub name: &'static str,
    /// The absolute address the host resolves it to
    pub address: u32,
}

/// The host-exported symbol table: the set of names a loaded object may
/// reference. Lookup is a linear, byte-exact scan, matching the
/// array-with-sentinel format of a firmware-supplied `(name, address)`
/// table terminated by a null-address entry.
pub trait ExportedSymbols {
    /// Resolve `name` to an address, or `None` if the host does not export
    /// it.
    fn resolve(&self, name: &str) -> Option<u32>;
}

/// The default [`ExportedSymbols`] implementation: a static slice of
/// [`ExportedSymbol`], searched linearly.
impl ExportedSymbols for &[ExportedSymbol] {
    fn resolve(&self, name: &str) -> Option<u32> {
        self.iter()
            .find(|sym| sym.name == name)
            .map(|sym| sym.address)
    }
}

/// Read symbol `k` from the object's `.symtab` and resolve its name.
///
/// A symbol's name is read from the symbol string table when `st_name !=
/// 0`; otherwise it is a section symbol and its name comes from the
/// section header string table of the section named by `st_shndx`.
pub fn read_symbol(
    source: &mut impl ByteSource,
    dir: &SectionDirectory,
    k: u32,
) -> Result<(ElfSymbol, String)> {
    let sym = ElfSymbol::read(source, dir.symtab_off, k)?;

    let name = if sym.st_name != 0 {
        source.read_cstr_at(dir.strtab_off + sym.st_name as u64, 64)?
    } else {
        name_of_section(source, dir, sym.st_shndx)?
    };

    Ok((sym, name))
}

fn name_of_section(
    source: &mut impl ByteSource,
    dir: &SectionDirectory,
    shndx: u16,
) -> Result<String> {
    // Section headers are addressed by index; re-derive the header offset
    // the same way the directory scan did, by re-reading the section
    // header table. We only have the stashed offsets for the four payload
    // roles, so fall back through those; any other index yields a
    // best-effort placeholder name.
    for kind in crate::section::SectionKind::ALL {
        let record = dir.section(kind);
        if record.index == shndx && record.header_off != 0 {
            let hdr = crate::header::section::ElfSectionHeader::read_at(source, record.header_off)?;
            if hdr.sh_name != 0 {
                return source.read_cstr_at(dir.shstrtab_off + hdr.sh_name as u64, 64);
            }
            return Ok(kind.name().to_string());
        }
    }
    Ok(String::from("<unnamed>"))
}

/// Trace-log every entry in `.symtab`: index, name, value, and defining
/// section index. A no-op unless `trace`-level logging is enabled.
pub fn dump_symbols(source: &mut impl ByteSource, dir: &SectionDirectory) -> Result<()> {
    if !log::log_enabled!(log::Level::Trace) {
        return Ok(());
    }
    for k in 0..dir.symtab_count {
        let (sym, name) = read_symbol(source, dir, k)?;
        log::trace!(
            "symtab[{k}] {name:?} st_value={:#x} st_shndx={}",
            sym.st_value,
            sym.st_shndx
        );
    }
    Ok(())
}

/// Resolve the runtime address of symbol `k`: either from the host table
/// (if `SHN_UNDEF`) or `section_base(st_shndx) + st_value` otherwise.
pub fn resolve_address(
    source: &mut impl ByteSource,
    dir: &SectionDirectory,
    exported: &impl ExportedSymbols,
    section_base: impl Fn(crate::section::SectionKind) -> u32,
    k: u32,
) -> Result<u32> {
    let (sym, name) = read_symbol(source, dir, k)?;

    if sym.st_shndx == SHN_UNDEF {
        exported.resolve(&name).ok_or(Error::Unresolved(name))
    } else {
        dir.kind_of_index(sym.st_shndx)
            .map(|kind| section_base(kind) + sym.st_value)
            .ok_or(Error::Unresolved(name))
    }
}
