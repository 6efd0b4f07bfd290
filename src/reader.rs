//! Positional byte access over the object file.
//!
//! Every read is `(offset, length)` rather than a threaded cursor, so
//! nothing needs to save or restore position and interleaving a sequential
//! relocation scan with a name lookup is safe.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{Error, Result};

/// A random-access byte source over an object file.
///
/// The host firmware supplies an implementation over flash, SRAM, or a
/// file handle.
pub trait ByteSource {
    /// Read exactly `buf.len()` bytes starting at absolute offset `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes starting at absolute offset `offset`,
    /// stopping short at EOF instead of erroring. Returns the number of
    /// bytes actually read.
    fn read_prefix_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Read a `NUL`-terminated name starting at absolute offset `offset`,
    /// stopping at the first `NUL` byte or after `max` bytes, whichever
    /// comes first. A name whose last `max`-byte window runs past EOF
    /// still resolves from whatever bytes are actually there.
    fn read_cstr_at(&mut self, offset: u64, max: usize) -> Result<String> {
        let mut buf = vec![0u8; max];
        let n = self.read_prefix_at(offset, &mut buf)?;
        buf.truncate(n);
        let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        buf.truncate(len);
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Blanket [`ByteSource`] for any `Read + Seek`, e.g. [`File`] or
/// `std::io::Cursor<Vec<u8>>` in tests.
impl<R: Read + Seek> ByteSource for R {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.seek(SeekFrom::Start(offset)).map_err(Error::Io)?;
        self.read_exact(buf).map_err(Error::Io)?;
        Ok(())
    }

    fn read_prefix_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.seek(SeekFrom::Start(offset)).map_err(Error::Io)?;
        let mut total = 0;
        while total < buf.len() {
            match self.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(total)
    }
}

/// Open a plain file as a [`ByteSource`].
pub fn open(path: impl AsRef<Path>) -> io::Result<File> {
    File::open(path)
}
