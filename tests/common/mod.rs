//! A from-scratch ELF32 little-endian ARM object builder for integration
//! tests. Real `.o` fixtures would need a cross toolchain this crate has no
//! business depending on, so tests synthesize the exact bytes the loader is
//! meant to parse instead.

const EHDR_SIZE: usize = 52;
const SHDR_SIZE: usize = 40;
const SYM_SIZE: usize = 16;
const REL_SIZE: usize = 8;

const SHT_PROGBITS: u32 = 1;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;
const SHT_REL: u32 = 9;
const SHT_NOBITS: u32 = 8;

/// Where a symbol is defined, for building one `.symtab` entry.
#[derive(Clone, Copy)]
#[allow(dead_code)]
pub enum Shndx {
    Undef,
    Text,
    Rodata,
    Data,
    Bss,
}

struct Symbol {
    name: String,
    value: u32,
    shndx: Shndx,
}

struct Reloc {
    offset: u32,
    sym_index: u32,
    kind: u8,
}

/// Which payload section a relocation entry's `.rel.X` sibling targets.
#[derive(Clone, Copy)]
#[allow(dead_code)]
pub enum Target {
    Text,
    Rodata,
    Data,
    Bss,
}

#[derive(Default)]
pub struct ObjectBuilder {
    text: Option<Vec<u8>>,
    rodata: Option<Vec<u8>>,
    data: Option<Vec<u8>>,
    bss_size: Option<u32>,
    symbols: Vec<Symbol>,
    rel_text: Vec<Reloc>,
    rel_rodata: Vec<Reloc>,
    rel_data: Vec<Reloc>,
    rel_bss: Vec<Reloc>,
    e_entry: u32,
    with_symtab: bool,
    duplicate_text: bool,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self {
            with_symtab: true,
            ..Default::default()
        }
    }

    pub fn text(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.text = Some(bytes.into());
        self
    }

    #[allow(dead_code)]
    pub fn rodata(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.rodata = Some(bytes.into());
        self
    }

    pub fn data(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.data = Some(bytes.into());
        self
    }

    pub fn bss(mut self, size: u32) -> Self {
        self.bss_size = Some(size);
        self
    }

    pub fn entry(mut self, e_entry: u32) -> Self {
        self.e_entry = e_entry;
        self
    }

    pub fn symbol(mut self, name: &str, value: u32, shndx: Shndx) -> Self {
        self.symbols.push(Symbol {
            name: name.to_string(),
            value,
            shndx,
        });
        self
    }

    pub fn reloc(mut self, target: Target, offset: u32, sym_index: u32, kind: u8) -> Self {
        let list = match target {
            Target::Text => &mut self.rel_text,
            Target::Rodata => &mut self.rel_rodata,
            Target::Data => &mut self.rel_data,
            Target::Bss => &mut self.rel_bss,
        };
        list.push(Reloc {
            offset,
            sym_index,
            kind,
        });
        self
    }

    /// Omit `.symtab`/`.strtab`: used for the "empty object" scenario where
    /// neither mandatory section is present.
    pub fn without_symtab(mut self) -> Self {
        self.with_symtab = false;
        self
    }

    /// Emit a second `.text` section header after the first, to exercise
    /// duplicate-section rejection.
    pub fn duplicate_text(mut self) -> Self {
        self.duplicate_text = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        // Fixed section order: NULL, .shstrtab, [.symtab, .strtab],
        // payload sections that were supplied, then their .rel.X siblings.
        let mut names: Vec<&str> = vec!["", ".shstrtab"];
        if self.with_symtab {
            names.push(".symtab");
            names.push(".strtab");
        }

        let text_idx = self.text.as_ref().map(|_| {
            names.push(".text");
            (names.len() - 1) as u16
        });
        if self.duplicate_text {
            names.push(".text");
        }
        let rodata_idx = self.rodata.as_ref().map(|_| {
            names.push(".rodata");
            (names.len() - 1) as u16
        });
        let data_idx = self.data.as_ref().map(|_| {
            names.push(".data");
            (names.len() - 1) as u16
        });
        let bss_idx = self.bss_size.map(|_| {
            names.push(".bss");
            (names.len() - 1) as u16
        });

        let rel_text_pos = (!self.rel_text.is_empty()).then(|| {
            names.push(".rel.text");
            names.len() - 1
        });
        let rel_rodata_pos = (!self.rel_rodata.is_empty()).then(|| {
            names.push(".rel.rodata");
            names.len() - 1
        });
        let rel_data_pos = (!self.rel_data.is_empty()).then(|| {
            names.push(".rel.data");
            names.len() - 1
        });
        let rel_bss_pos = (!self.rel_bss.is_empty()).then(|| {
            names.push(".rel.bss");
            names.len() - 1
        });

        let shndx_of = |s: Shndx| -> u16 {
            match s {
                Shndx::Undef => 0,
                Shndx::Text => text_idx.expect("symbol references absent .text"),
                Shndx::Rodata => rodata_idx.expect("symbol references absent .rodata"),
                Shndx::Data => data_idx.expect("symbol references absent .data"),
                Shndx::Bss => bss_idx.expect("symbol references absent .bss"),
            }
        };

        // .shstrtab: every section name, NUL-terminated, offsets recorded
        // in the same order as `names`.
        let mut shstrtab = vec![0u8];
        let mut name_off = Vec::with_capacity(names.len());
        for n in &names {
            name_off.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(n.as_bytes());
            shstrtab.push(0);
        }

        // .strtab + .symtab, if present.
        let mut strtab = vec![0u8];
        let mut symtab = Vec::new();
        for sym in &self.symbols {
            let off = strtab.len() as u32;
            strtab.extend_from_slice(sym.name.as_bytes());
            strtab.push(0);

            let mut entry = [0u8; SYM_SIZE];
            entry[0..4].copy_from_slice(&off.to_le_bytes());
            entry[4..8].copy_from_slice(&sym.value.to_le_bytes());
            entry[14..16].copy_from_slice(&shndx_of(sym.shndx).to_le_bytes());
            symtab.extend_from_slice(&entry);
        }

        let rel_bytes = |relocs: &[Reloc]| -> Vec<u8> {
            let mut out = Vec::with_capacity(relocs.len() * REL_SIZE);
            for r in relocs {
                let r_info = (r.sym_index << 8) | r.kind as u32;
                out.extend_from_slice(&r.offset.to_le_bytes());
                out.extend_from_slice(&r_info.to_le_bytes());
            }
            out
        };

        // Lay out section data sequentially after the ELF header, then the
        // section header table after all data.
        let mut file = vec![0u8; EHDR_SIZE];
        let mut shdrs: Vec<[u8; SHDR_SIZE]> = Vec::with_capacity(names.len());

        let push_section = |file: &mut Vec<u8>,
                             shdrs: &mut Vec<[u8; SHDR_SIZE]>,
                             name_off: u32,
                             sh_type: u32,
                             data: Option<&[u8]>,
                             size: u32,
                             addralign: u32| {
            let sh_offset = file.len() as u32;
            if let Some(d) = data {
                file.extend_from_slice(d);
            }
            let mut hdr = [0u8; SHDR_SIZE];
            hdr[0..4].copy_from_slice(&name_off.to_le_bytes());
            hdr[4..8].copy_from_slice(&sh_type.to_le_bytes());
            hdr[16..20].copy_from_slice(&sh_offset.to_le_bytes());
            hdr[20..24].copy_from_slice(&size.to_le_bytes());
            hdr[32..36].copy_from_slice(&addralign.to_le_bytes());
            shdrs.push(hdr);
        };

        // index 0: NULL section header, no data.
        shdrs.push([0u8; SHDR_SIZE]);

        let mut i = 1;
        push_section(
            &mut file,
            &mut shdrs,
            name_off[i],
            SHT_STRTAB,
            Some(&shstrtab),
            shstrtab.len() as u32,
            1,
        );
        i += 1;

        if self.with_symtab {
            push_section(
                &mut file,
                &mut shdrs,
                name_off[i],
                SHT_SYMTAB,
                Some(&symtab),
                symtab.len() as u32,
                4,
            );
            i += 1;
            push_section(
                &mut file,
                &mut shdrs,
                name_off[i],
                SHT_STRTAB,
                Some(&strtab),
                strtab.len() as u32,
                1,
            );
            i += 1;
        }

        if let Some(bytes) = &self.text {
            push_section(
                &mut file,
                &mut shdrs,
                name_off[i],
                SHT_PROGBITS,
                Some(bytes),
                bytes.len() as u32,
                4,
            );
            i += 1;
            if self.duplicate_text {
                push_section(
                    &mut file,
                    &mut shdrs,
                    name_off[i],
                    SHT_PROGBITS,
                    Some(bytes),
                    bytes.len() as u32,
                    4,
                );
                i += 1;
            }
        }
        if let Some(bytes) = &self.rodata {
            push_section(
                &mut file,
                &mut shdrs,
                name_off[i],
                SHT_PROGBITS,
                Some(bytes),
                bytes.len() as u32,
                4,
            );
            i += 1;
        }
        if let Some(bytes) = &self.data {
            push_section(
                &mut file,
                &mut shdrs,
                name_off[i],
                SHT_PROGBITS,
                Some(bytes),
                bytes.len() as u32,
                4,
            );
            i += 1;
        }
        if let Some(size) = self.bss_size {
            push_section(
                &mut file, &mut shdrs, name_off[i], SHT_NOBITS, None, size, 4,
            );
            i += 1;
        }

        if rel_text_pos.is_some() {
            let bytes = rel_bytes(&self.rel_text);
            push_section(
                &mut file,
                &mut shdrs,
                name_off[i],
                SHT_REL,
                Some(&bytes),
                bytes.len() as u32,
                4,
            );
            i += 1;
        }
        if rel_rodata_pos.is_some() {
            let bytes = rel_bytes(&self.rel_rodata);
            push_section(
                &mut file,
                &mut shdrs,
                name_off[i],
                SHT_REL,
                Some(&bytes),
                bytes.len() as u32,
                4,
            );
            i += 1;
        }
        if rel_data_pos.is_some() {
            let bytes = rel_bytes(&self.rel_data);
            push_section(
                &mut file,
                &mut shdrs,
                name_off[i],
                SHT_REL,
                Some(&bytes),
                bytes.len() as u32,
                4,
            );
            i += 1;
        }
        if rel_bss_pos.is_some() {
            let bytes = rel_bytes(&self.rel_bss);
            push_section(
                &mut file,
                &mut shdrs,
                name_off[i],
                SHT_REL,
                Some(&bytes),
                bytes.len() as u32,
                4,
            );
            i += 1;
        }
        debug_assert_eq!(i, names.len());

        let shoff = file.len() as u32;
        for hdr in &shdrs {
            file.extend_from_slice(hdr);
        }

        // ELF header.
        file[0..4].copy_from_slice(b"\x7fELF");
        file[4] = 1; // ELFCLASS32
        file[5] = 1; // ELFDATA2LSB
        file[16..18].copy_from_slice(&1u16.to_le_bytes()); // ET_REL
        file[18..20].copy_from_slice(&40u16.to_le_bytes()); // EM_ARM
        file[24..28].copy_from_slice(&self.e_entry.to_le_bytes());
        file[32..36].copy_from_slice(&shoff.to_le_bytes());
        file[48..50].copy_from_slice(&(shdrs.len() as u16).to_le_bytes());
        file[50..52].copy_from_slice(&1u16.to_le_bytes()); // e_shstrndx

        file
    }
}
