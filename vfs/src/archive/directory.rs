//! Zip central directory, read through the `zip` crate.
//!
//! The `zip` crate locates every entry; decoding is done separately so an
//! entry stream can own its state instead of borrowing the archive.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use zip::{CompressionMethod, ZipArchive};

use super::Backing;
use crate::error::{VfsError, VfsResult};

/// Deflate cannot expand its input by more than about 1032:1.
const MAX_DEFLATE_RATIO: u64 = 1032;

/// `Read + Seek` view of the backing stream for the `zip` crate.
struct ArchiveReader {
    backing: Arc<Backing>,
    pos: u64,
}

impl Read for ArchiveReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self
            .backing
            .read_at(self.pos, buf)
            .map_err(io::Error::other)?;
        self.pos += read as u64;
        Ok(read)
    }
}

impl Seek for ArchiveReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.backing.length().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        self.pos = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of archive")
        })?;
        Ok(self.pos)
    }
}

/// Where an entry's data lives and how to decode it.
#[derive(Debug, Clone)]
pub(crate) struct EntryRecord {
    pub method: CompressionMethod,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub data_start: u64,
}

impl EntryRecord {
    /// Reject size fields the entry's data cannot back.
    pub fn check(&self, name: &str, archive_length: u64) -> VfsResult<()> {
        let corrupt = |reason: &str| VfsError::CorruptArchive(format!("{name}: {reason}"));

        let data_end = self
            .data_start
            .checked_add(self.compressed_size)
            .ok_or_else(|| corrupt("entry size overflows"))?;
        if data_end > archive_length {
            return Err(corrupt("entry data runs past the end of the archive"));
        }

        let plausible = match self.method {
            CompressionMethod::Stored => self.uncompressed_size == self.compressed_size,
            _ => {
                self.uncompressed_size
                    <= self.compressed_size.saturating_mul(MAX_DEFLATE_RATIO)
            }
        };
        if plausible {
            Ok(())
        } else {
            Err(corrupt("declared size does not match the entry data"))
        }
    }
}

/// Parsed central directory, keyed by case-sensitive entry name.
#[derive(Debug)]
pub(crate) struct CentralDirectory {
    entries: HashMap<String, EntryRecord>,
}

impl CentralDirectory {
    pub fn parse(backing: &Arc<Backing>) -> VfsResult<Self> {
        let reader = ArchiveReader {
            backing: Arc::clone(backing),
            pos: 0,
        };
        let mut archive = ZipArchive::new(reader).map_err(corrupt)?;

        let mut entries = HashMap::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive.by_index_raw(index).map_err(corrupt)?;
            entries.insert(
                file.name().to_owned(),
                EntryRecord {
                    method: file.compression(),
                    crc32: file.crc32(),
                    compressed_size: file.compressed_size(),
                    uncompressed_size: file.size(),
                    data_start: file.data_start(),
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&EntryRecord> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn corrupt(err: zip::result::ZipError) -> VfsError {
    VfsError::CorruptArchive(err.to_string())
}
