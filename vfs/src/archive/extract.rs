use std::io::{self, Read};
use std::sync::Arc;

use flate2::Crc;
use flate2::read::DeflateDecoder;
use zip::CompressionMethod;

use super::{ArchiveState, Backing};
use crate::error::{VfsError, VfsResult};
use crate::stream::InputStream;

/// Reads an entry's compressed bytes straight from the backing stream.
///
/// Every read is a seek+read at an absolute offset, so the backing stream
/// must support random access.
struct EntryReader {
    backing: Arc<Backing>,
    offset: u64,
    remaining: u64,
}

impl Read for EntryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let read = self
            .backing
            .read_at(self.offset, &mut buf[..want])
            .map_err(io::Error::other)?;
        if read == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        self.offset += read as u64;
        self.remaining -= read as u64;
        Ok(read)
    }
}

enum Decoder {
    Stored(EntryReader),
    Deflated(DeflateDecoder<EntryReader>),
}

impl Decoder {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        match self {
            Decoder::Stored(reader) => reader.read(dst),
            Decoder::Deflated(decoder) => decoder.read(dst),
        }
    }
}

/// Everything an open entry keeps alive.
///
/// Field order is drop order: the archive handle is released before the
/// backing stream it reads from.
struct OwnedState {
    _archive: Arc<ArchiveState>,
    _backing: Arc<Backing>,
}

/// Forward-only decompressing cursor over one archive entry.
///
/// `Open -> Reading -> Exhausted`: reads return decompressed bytes until
/// [`length`](InputStream::length) bytes have been produced, then `Ok(0)`.
/// Seeking is not supported.
pub(crate) struct ExtractStream {
    name: String,
    decoder: Decoder,
    crc: Crc,
    expected_crc: u32,
    pos: u64,
    length: u64,
    // Dropped after the decoder.
    _owned: OwnedState,
}

impl ExtractStream {
    pub fn open(archive: Arc<ArchiveState>, name: &str) -> VfsResult<Self> {
        let record = archive
            .directory
            .get(name)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(name.to_owned()))?;

        let backing = Arc::clone(&archive.backing);
        record.check(name, backing.length())?;
        let reader = EntryReader {
            backing: Arc::clone(&backing),
            offset: record.data_start,
            remaining: record.compressed_size,
        };
        let decoder = match record.method {
            CompressionMethod::Stored => Decoder::Stored(reader),
            CompressionMethod::Deflated => Decoder::Deflated(DeflateDecoder::new(reader)),
            other => {
                log::debug!("Entry `{name}` uses unsupported compression method {other:?}");
                return Err(VfsError::Unsupported("archive compression method"));
            }
        };

        Ok(Self {
            name: name.to_owned(),
            decoder,
            crc: Crc::new(),
            expected_crc: record.crc32,
            pos: 0,
            length: record.uncompressed_size,
            _owned: OwnedState {
                _archive: archive,
                _backing: backing,
            },
        })
    }

    fn corrupt(&self, reason: impl std::fmt::Display) -> VfsError {
        VfsError::CorruptArchive(format!("{}: {reason}", self.name))
    }
}

impl InputStream for ExtractStream {
    fn read(&mut self, dst: &mut [u8]) -> VfsResult<usize> {
        let remaining = self.length - self.pos;
        if remaining == 0 || dst.is_empty() {
            return Ok(0);
        }

        let want = dst.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let read = self
            .decoder
            .read(&mut dst[..want])
            .map_err(|err| self.corrupt(err))?;
        if read == 0 {
            return Err(self.corrupt("entry data ended early"));
        }

        self.crc.update(&dst[..read]);
        self.pos += read as u64;
        if self.pos == self.length && self.crc.sum() != self.expected_crc {
            return Err(self.corrupt("crc mismatch"));
        }
        Ok(read)
    }

    fn seek(&mut self, _offset: i64, _relative: bool) -> VfsResult<u64> {
        Err(VfsError::Unsupported("seek on archive entry stream"))
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn length(&self) -> u64 {
        self.length
    }
}
