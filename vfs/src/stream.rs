//! Stream capabilities returned by [`FileSource`](crate::FileSource)s.
//!
//! Streams are byte cursors, not `std::io` adaptors: besides reading and
//! writing they report their position and (for input) total length, which
//! the archive source needs to locate its central directory.

use crate::error::{VfsError, VfsResult};

/// A readable byte stream.
pub trait InputStream: Send {
    /// Read up to `dst.len()` bytes, returning the number produced.
    ///
    /// Returns `Ok(0)` at the end of the stream.
    fn read(&mut self, dst: &mut [u8]) -> VfsResult<usize>;

    /// Move the cursor, either relative to the current position or to an
    /// absolute offset from the start. Returns the new position.
    ///
    /// Forward-only streams fail with [`VfsError::Unsupported`].
    fn seek(&mut self, offset: i64, relative: bool) -> VfsResult<u64>;

    /// Current position in bytes.
    fn tell(&self) -> u64;

    /// Total length of the stream in bytes.
    fn length(&self) -> u64;
}

/// A writable byte stream.
pub trait OutputStream: Send {
    /// Write bytes from `src`, returning the number consumed.
    fn write(&mut self, src: &[u8]) -> VfsResult<usize>;

    /// Move the cursor. See [`InputStream::seek`].
    fn seek(&mut self, offset: i64, relative: bool) -> VfsResult<u64>;

    /// Current position in bytes.
    fn tell(&self) -> u64;

    /// Push buffered bytes to the underlying storage.
    fn flush(&mut self) -> VfsResult<()>;
}

pub type InputStreamBox = Box<dyn InputStream>;
pub type OutputStreamBox = Box<dyn OutputStream>;

/// Upper bound on the up-front reservation made by [`read_tail`].
const MAX_PREALLOC: u64 = 1 << 20;

/// Read everything from the current position to the end of the stream.
pub fn read_tail(stream: &mut dyn InputStream) -> VfsResult<Vec<u8>> {
    // The reported length is a hint; the buffer grows past this as data arrives.
    let remaining = stream
        .length()
        .saturating_sub(stream.tell())
        .min(MAX_PREALLOC);
    let mut buffer = Vec::with_capacity(usize::try_from(remaining).unwrap_or(0));
    let mut chunk = [0u8; 8192];
    loop {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    Ok(buffer)
}

/// Fill `dst` completely or fail with [`VfsError::Io`] (`UnexpectedEof`).
pub fn read_exact(stream: &mut dyn InputStream, dst: &mut [u8]) -> VfsResult<()> {
    let mut filled = 0;
    while filled < dst.len() {
        let read = stream.read(&mut dst[filled..])?;
        if read == 0 {
            return Err(VfsError::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        filled += read;
    }
    Ok(())
}

/// Write all of `src` or fail with [`VfsError::Io`] (`WriteZero`).
pub fn write_all(stream: &mut dyn OutputStream, src: &[u8]) -> VfsResult<()> {
    let mut written = 0;
    while written < src.len() {
        let n = stream.write(&src[written..])?;
        if n == 0 {
            return Err(VfsError::Io(std::io::ErrorKind::WriteZero.into()));
        }
        written += n;
    }
    Ok(())
}

/// Compute a seek target, rejecting positions before the start.
pub(crate) fn seek_target(current: u64, offset: i64, relative: bool) -> VfsResult<u64> {
    let base = if relative { current } else { 0 };
    base.checked_add_signed(offset).ok_or_else(|| {
        VfsError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "seek before start of stream",
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryInputStream;

    #[test]
    fn read_tail_from_start() {
        let mut stream = MemoryInputStream::new(b"hello world".to_vec());
        assert_eq!(read_tail(&mut stream).unwrap(), b"hello world");
        assert_eq!(stream.tell(), 11);
    }

    #[test]
    fn read_tail_after_seek() {
        let mut stream = MemoryInputStream::new(b"hello world".to_vec());
        stream.seek(6, false).unwrap();
        assert_eq!(read_tail(&mut stream).unwrap(), b"world");
    }

    /// Reports a huge length but produces only a few bytes.
    struct Overstated {
        data: &'static [u8],
        pos: usize,
    }

    impl InputStream for Overstated {
        fn read(&mut self, dst: &mut [u8]) -> VfsResult<usize> {
            let n = dst.len().min(self.data.len() - self.pos);
            dst[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }

        fn seek(&mut self, _offset: i64, _relative: bool) -> VfsResult<u64> {
            Err(VfsError::Unsupported("seek"))
        }

        fn tell(&self) -> u64 {
            self.pos as u64
        }

        fn length(&self) -> u64 {
            u64::MAX
        }
    }

    #[test]
    fn read_tail_ignores_overstated_length() {
        let mut stream = Overstated {
            data: b"tiny",
            pos: 0,
        };
        let bytes = read_tail(&mut stream).unwrap();
        assert_eq!(bytes, b"tiny");
        assert!(bytes.capacity() as u64 <= MAX_PREALLOC);
    }

    #[test]
    fn read_tail_beyond_prealloc() {
        let data: Vec<u8> = (0..(MAX_PREALLOC as usize + 100)).map(|i| i as u8).collect();
        let mut stream = MemoryInputStream::new(data.clone());
        assert_eq!(read_tail(&mut stream).unwrap(), data);
    }

    #[test]
    fn read_exact_short_stream() {
        let mut stream = MemoryInputStream::new(b"abc".to_vec());
        let mut buf = [0u8; 4];
        assert!(matches!(
            read_exact(&mut stream, &mut buf),
            Err(VfsError::Io(_))
        ));
    }

    #[test]
    fn seek_target_bounds() {
        assert_eq!(seek_target(10, -4, true).unwrap(), 6);
        assert_eq!(seek_target(10, 3, false).unwrap(), 3);
        assert!(seek_target(2, -3, true).is_err());
    }
}
