//! Low-level `mmap`/`mprotect`/cache-flush primitives backing
//! [`crate::memory::HostAllocator`]. Every `unsafe` operation in the crate
//! that touches raw, possibly-executable memory lives in this module or in
//! [`crate::image::LoadedImage::execute`].

use std::ptr::NonNull;

use crate::error::{Error, Result};
use crate::memory::ExecRegion;

/// Allocate `size` bytes, aligned to at least `align`, as read/write
/// (not yet executable).
#[cfg(unix)]
pub(crate) fn alloc_rw(size: usize, align: usize) -> std::result::Result<ExecRegion, ()> {
    // mmap already returns page-aligned memory, which satisfies any
    // alignment an ELF section plausibly requests (<= 4096 for this
    // loader's targets).
    let _ = align;
    // SAFETY: an anonymous, private mapping with no file backing; the
    // length is nonzero (checked by the caller).
    let addr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };

    if addr == libc::MAP_FAILED {
        return Err(());
    }

    let ptr = NonNull::new(addr as *mut u8).ok_or(())?;
    Ok(ExecRegion::new(
        ptr,
        size,
        Box::new(move |p, len| {
            // SAFETY: `p`/`len` are exactly what `mmap` returned above.
            unsafe {
                libc::munmap(p as *mut libc::c_void, len);
            }
        }),
    ))
}

/// Switch `len` bytes at `ptr` from read/write to read/execute.
#[cfg(unix)]
pub(crate) fn protect_exec(ptr: *mut u8, len: usize) -> Result<()> {
    // SAFETY: `ptr`/`len` describe a live mapping owned by the caller.
    let ret = unsafe { libc::mprotect(ptr as *mut libc::c_void, len, libc::PROT_READ | libc::PROT_EXEC) };
    if ret != 0 {
        return Err(Error::Alloc { size: len, align: 1 });
    }
    Ok(())
}

/// Flush the instruction cache over `[ptr, ptr + len)` so patched Thumb-2
/// branch encodings are visible to instruction fetch. Only meaningful on
/// ARM, where data and instruction caches are not coherent by default; a
/// no-op elsewhere (x86_64 test hosts have a coherent i-cache).
#[cfg(target_arch = "arm")]
pub(crate) fn clear_instruction_cache(ptr: *mut u8, len: usize) {
    extern "C" {
        fn __clear_cache(beg: *mut std::ffi::c_void, end: *mut std::ffi::c_void);
    }
    // SAFETY: provided by compiler-rt/libgcc on ARM targets; `beg`/`end`
    // bound the region we just patched.
    unsafe {
        __clear_cache(
            ptr as *mut std::ffi::c_void,
            ptr.add(len) as *mut std::ffi::c_void,
        );
    }
}

#[cfg(not(target_arch = "arm"))]
pub(crate) fn clear_instruction_cache(_ptr: *mut u8, _len: usize) {
    log::trace!("skipping instruction cache flush: not an ARM target");
}
