//! A dynamic loader for ELF32 relocatable objects on ARM (Thumb-2).
//!
//! Loads an `ET_REL` object built for `EM_ARM`, resolves its external
//! symbols against a host-supplied table, applies `R_ARM_ABS32` and
//! `R_ARM_THM_CALL`/`R_ARM_THM_JUMP24` relocations, and transfers control to
//! its entry point. See the module docs on [`image`] and [`arch::arm32`] for
//! the two load phases and the Thumb-2 branch encoding respectively.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod arch;
pub mod config;
pub mod error;
pub mod header;
pub mod image;
pub mod memory;
pub mod platform;
pub mod reader;
pub mod section;
pub mod symbol;

pub use config::Config;
pub use error::{Error, Result};
pub use image::{LoadedImage, Loader};
pub use memory::{ExecAllocator, HostAllocator};
pub use reader::ByteSource;
pub use section::SectionKind;
pub use symbol::{ExportedSymbol, ExportedSymbols};

/// Load `path` against `exported` and run it, using the default
/// `mmap`-backed allocator and default [`Config`]. The convenience wrapper
/// most hosts want; call [`Loader::load`] directly for finer control (e.g.
/// inspecting a load before deciding whether to execute it).
pub fn exec_elf(path: impl AsRef<std::path::Path>, exported: &impl ExportedSymbols) -> Result<()> {
    let mut file = reader::open(path.as_ref())?;
    let alloc = HostAllocator;
    let config = Config::default();

    let image = Loader::load(&mut file, exported, &alloc, &config)?;
    image.execute()
}
