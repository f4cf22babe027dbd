//! Read-only file source over a zip-compatible archive.

mod directory;
mod extract;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{VfsError, VfsResult};
use crate::source::FileSource;
use crate::stream::{InputStreamBox, read_tail};
use crate::worker::{LoadHandle, Worker};
use directory::CentralDirectory;
use extract::ExtractStream;

/// The stream an archive was opened from, shared by every open entry.
///
/// Reads are positioned (seek to an absolute offset, then read) and
/// serialized by the mutex, so concurrent entry streams never observe each
/// other's cursor.
pub(crate) struct Backing {
    stream: Mutex<InputStreamBox>,
    length: u64,
}

impl Backing {
    pub fn new(stream: InputStreamBox) -> Self {
        let length = stream.length();
        Self {
            stream: Mutex::new(stream),
            length,
        }
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// Seek to `pos` and read as many bytes as are available, up to `dst.len()`.
    pub fn read_at(&self, pos: u64, dst: &mut [u8]) -> VfsResult<usize> {
        let offset = i64::try_from(pos)
            .map_err(|_| VfsError::CorruptArchive(format!("offset {pos} out of range")))?;
        let mut stream = self.stream.lock();
        stream.seek(offset, false)?;
        let mut filled = 0;
        while filled < dst.len() {
            let read = stream.read(&mut dst[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        Ok(filled)
    }
}

/// Parsed archive handle.
///
/// Holds a back-reference to the backing stream for on-demand reads.
pub(crate) struct ArchiveState {
    directory: CentralDirectory,
    backing: Arc<Backing>,
}

impl ArchiveState {
    fn open(stream: InputStreamBox) -> VfsResult<Self> {
        let backing = Arc::new(Backing::new(stream));
        let directory = CentralDirectory::parse(&backing)?;
        Ok(Self { directory, backing })
    }

    fn load(self: &Arc<Self>, path: &str) -> VfsResult<Vec<u8>> {
        let mut stream = ExtractStream::open(Arc::clone(self), path)?;
        read_tail(&mut stream)
    }
}

/// Read-only [`FileSource`] over a zip-compatible archive.
///
/// Constructed from an already-open, seekable stream (e.g. a file stream
/// pointing at a `.zip`). The central directory is parsed up front; if
/// that fails the source reports itself invalid and
/// [`Vfs::register_scheme`](crate::Vfs::register_scheme) rejects it.
///
/// Entries are addressed by their case-sensitive name inside the archive.
/// `open` yields a lazy, forward-only decompressing stream; `load`
/// decompresses eagerly. Stored and deflated entries are supported. Writes
/// always fail with [`VfsError::Unsupported`].
///
/// Open streams keep the archive handle and the backing stream alive, so a
/// stream can outlive the source it was opened from.
///
/// # Example
///
/// ```ignore
/// let file = FileInputStream::open(Path::new("data.zip"))?;
/// vfs.register_scheme("data", ArchiveFileSource::new(Box::new(file)));
/// let bytes = vfs.load(&Url::parse("data://levels/1.json"));
/// ```
pub struct ArchiveFileSource {
    opened: Option<OpenArchive>,
}

/// A successfully parsed archive and the worker serving its async loads.
struct OpenArchive {
    // Dropped first: queued jobs finish before the state goes away.
    worker: Worker,
    state: Arc<ArchiveState>,
}

impl OpenArchive {
    fn new(state: ArchiveState) -> Self {
        Self {
            worker: Worker::spawn("vfs-archive"),
            state: Arc::new(state),
        }
    }
}

impl ArchiveFileSource {
    /// Open an archive, producing an invalid source if parsing fails.
    pub fn new(stream: InputStreamBox) -> Self {
        match Self::try_new(stream) {
            Ok(source) => source,
            Err(err) => {
                log::warn!("Failed to open archive: {err}");
                Self { opened: None }
            }
        }
    }

    /// Open an archive, returning the parse error instead of an invalid source.
    pub fn try_new(stream: InputStreamBox) -> VfsResult<Self> {
        let state = ArchiveState::open(stream)?;
        log::debug!("Opened archive with {} entries", state.directory.len());
        Ok(Self {
            opened: Some(OpenArchive::new(state)),
        })
    }

    /// Number of entries in the central directory.
    pub fn entry_count(&self) -> usize {
        self.opened
            .as_ref()
            .map_or(0, |opened| opened.state.directory.len())
    }

    /// Sorted entry names.
    pub fn entry_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .opened
            .as_ref()
            .map(|opened| opened.state.directory.names().map(str::to_owned).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Decompress an entry on this archive's worker.
    ///
    /// An invalid source has no worker; its handles resolve to `None` at once.
    pub fn load_async(&self, path: &str) -> LoadHandle<Vec<u8>> {
        let Some(opened) = &self.opened else {
            return LoadHandle::resolved(None);
        };
        let state = Arc::clone(&opened.state);
        let path = path.to_owned();
        opened.worker.submit(move || match state.load(&path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::debug!("Async archive load of `{path}` failed: {err}");
                None
            }
        })
    }

    fn state(&self) -> VfsResult<&Arc<ArchiveState>> {
        self.opened
            .as_ref()
            .map(|opened| &opened.state)
            .ok_or_else(|| VfsError::CorruptArchive("archive failed to open".into()))
    }
}

impl FileSource for ArchiveFileSource {
    fn valid(&self) -> bool {
        self.opened.is_some()
    }

    fn exists(&self, path: &str) -> bool {
        self.opened
            .as_ref()
            .is_some_and(|opened| opened.state.directory.get(path).is_some())
    }

    fn open(&self, path: &str) -> VfsResult<InputStreamBox> {
        let stream = ExtractStream::open(Arc::clone(self.state()?), path)?;
        Ok(Box::new(stream))
    }

    fn load(&self, path: &str) -> VfsResult<Vec<u8>> {
        self.state()?.load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryInputStream;
    use crate::stream::InputStream;
    use std::io::{Cursor, Write};
    use zip::CompressionMethod;
    use zip::write::SimpleFileOptions;

    const POEM: &[u8] = b"The quick brown fox jumps over the lazy dog. \
        The quick brown fox jumps over the lazy dog. \
        The quick brown fox jumps over the lazy dog.";

    fn build_archive(entries: &[(&str, &[u8], CompressionMethod)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data, method) in entries {
            let options = SimpleFileOptions::default().compression_method(*method);
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn archive_source(entries: &[(&str, &[u8], CompressionMethod)]) -> ArchiveFileSource {
        let bytes = build_archive(entries);
        ArchiveFileSource::new(Box::new(MemoryInputStream::new(bytes)))
    }

    fn sample() -> ArchiveFileSource {
        archive_source(&[
            ("poem.txt", POEM, CompressionMethod::Deflated),
            ("raw.bin", &[1, 2, 3, 4, 5], CompressionMethod::Stored),
            ("dir/empty.txt", b"", CompressionMethod::Deflated),
        ])
    }

    #[test]
    fn valid_archive_lists_entries() {
        let source = sample();
        assert!(source.valid());
        assert_eq!(source.entry_count(), 3);
        assert_eq!(
            source.entry_names(),
            vec!["dir/empty.txt", "poem.txt", "raw.bin"]
        );
    }

    #[test]
    fn invalid_archive_is_rejected() {
        let source = ArchiveFileSource::new(Box::new(MemoryInputStream::new(
            b"not an archive at all, just text".to_vec(),
        )));
        assert!(!source.valid());
        assert!(!source.exists("poem.txt"));
        assert!(matches!(
            source.load("poem.txt"),
            Err(VfsError::CorruptArchive(_))
        ));
        assert!(ArchiveFileSource::try_new(Box::new(MemoryInputStream::new(Vec::new()))).is_err());
    }

    #[test]
    fn exists_is_case_sensitive() {
        let source = sample();
        assert!(source.exists("poem.txt"));
        assert!(!source.exists("POEM.TXT"));
        assert!(!source.exists("missing"));
    }

    #[test]
    fn load_deflated_and_stored() {
        let source = sample();
        assert_eq!(source.load("poem.txt").unwrap(), POEM);
        assert_eq!(source.load("raw.bin").unwrap(), vec![1, 2, 3, 4, 5]);
        assert!(source.load("dir/empty.txt").unwrap().is_empty());
    }

    #[test]
    fn load_missing_entry() {
        let source = sample();
        assert!(matches!(source.load("missing"), Err(VfsError::NotFound(_))));
        assert!(matches!(source.open("missing"), Err(VfsError::NotFound(_))));
    }

    #[test]
    fn open_reads_in_small_chunks() {
        let source = sample();
        let mut stream = source.open("poem.txt").unwrap();
        assert_eq!(stream.length(), POEM.len() as u64);
        assert_eq!(stream.tell(), 0);

        let mut collected = Vec::new();
        let mut chunk = [0u8; 7];
        let mut last_pos = 0;
        loop {
            let read = stream.read(&mut chunk).unwrap();
            if read == 0 {
                break;
            }
            collected.extend_from_slice(&chunk[..read]);
            assert!(stream.tell() > last_pos);
            last_pos = stream.tell();
        }

        assert_eq!(collected, POEM);
        assert_eq!(stream.tell(), stream.length());
        // exhausted streams keep returning zero
        assert_eq!(stream.read(&mut chunk).unwrap(), 0);
    }

    #[test]
    fn seek_is_unsupported() {
        let source = sample();
        let mut stream = source.open("raw.bin").unwrap();
        assert!(matches!(
            stream.seek(0, false),
            Err(VfsError::Unsupported(_))
        ));
    }

    #[test]
    fn write_is_unsupported() {
        let source = sample();
        assert!(matches!(
            source.write("poem.txt", false),
            Err(VfsError::Unsupported(_))
        ));
        assert!(matches!(
            source.write("new.txt", true),
            Err(VfsError::Unsupported(_))
        ));
    }

    #[test]
    fn stream_outlives_source() {
        let source = sample();
        let mut stream = source.open("poem.txt").unwrap();
        drop(source);
        let mut buf = vec![0u8; POEM.len()];
        crate::stream::read_exact(stream.as_mut(), &mut buf).unwrap();
        assert_eq!(buf, POEM);
    }

    #[test]
    fn interleaved_streams_keep_their_own_cursor() {
        let source = sample();
        let mut a = source.open("poem.txt").unwrap();
        let mut b = source.open("poem.txt").unwrap();

        let mut out_a = Vec::new();
        let mut out_b = Vec::new();
        let mut chunk = [0u8; 5];
        loop {
            let ra = a.read(&mut chunk).unwrap();
            out_a.extend_from_slice(&chunk[..ra]);
            let rb = b.read(&mut chunk).unwrap();
            out_b.extend_from_slice(&chunk[..rb]);
            if ra == 0 && rb == 0 {
                break;
            }
        }
        assert_eq!(out_a, POEM);
        assert_eq!(out_b, POEM);
    }

    #[test]
    fn corrupted_data_fails_crc() {
        let mut bytes = build_archive(&[("raw.bin", b"abcdef", CompressionMethod::Stored)]);
        let pos = bytes
            .windows(6)
            .position(|window| window == b"abcdef")
            .unwrap();
        bytes[pos] = b'X';
        let source = ArchiveFileSource::new(Box::new(MemoryInputStream::new(bytes)));
        assert!(matches!(
            source.load("raw.bin"),
            Err(VfsError::CorruptArchive(_))
        ));
    }

    #[test]
    fn load_async_on_archive_worker() {
        let source = sample();
        let poem = source.load_async("poem.txt");
        let missing = source.load_async("missing");
        assert_eq!(poem.recv().as_deref(), Some(POEM));
        assert_eq!(missing.recv(), None);
    }

    #[test]
    fn invalid_archive_resolves_async_loads_immediately() {
        let source = ArchiveFileSource::new(Box::new(MemoryInputStream::new(b"junk".to_vec())));
        let handle = source.load_async("poem.txt");
        assert!(handle.is_finished());
        assert_eq!(handle.recv(), None);
    }

    /// Single stored entry `a.txt` holding `hi`, whose central directory
    /// declares an uncompressed size of 2^62 through a zip64 extra field.
    fn oversized_zip64_archive() -> Vec<u8> {
        let name = b"a.txt";
        let data = b"hi";
        let mut crc = flate2::Crc::new();
        crc.update(data);
        let crc = crc.sum();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        bytes.extend_from_slice(&[20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(name);
        bytes.extend_from_slice(data);

        let cd_offset = bytes.len() as u32;
        bytes.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        bytes.extend_from_slice(&[20, 0, 20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&12u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes()); // comment
        bytes.extend_from_slice(&0u16.to_le_bytes()); // disk
        bytes.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
        bytes.extend_from_slice(&0u32.to_le_bytes()); // external attributes
        bytes.extend_from_slice(&0u32.to_le_bytes()); // local header offset
        bytes.extend_from_slice(name);
        bytes.extend_from_slice(&0x0001u16.to_le_bytes());
        bytes.extend_from_slice(&8u16.to_le_bytes());
        bytes.extend_from_slice(&(1u64 << 62).to_le_bytes());
        let cd_size = bytes.len() as u32 - cd_offset;

        bytes.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0, 0, 1, 0, 1, 0]);
        bytes.extend_from_slice(&cd_size.to_le_bytes());
        bytes.extend_from_slice(&cd_offset.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes
    }

    #[test]
    fn huge_declared_size_is_corrupt() {
        let source =
            ArchiveFileSource::new(Box::new(MemoryInputStream::new(oversized_zip64_archive())));
        assert!(matches!(
            source.load("a.txt"),
            Err(VfsError::CorruptArchive(_))
        ));
        assert!(source.open("a.txt").is_err());
        assert_eq!(source.load_async("a.txt").recv(), None);

        let vfs = crate::Vfs::new();
        let url = crate::Url::parse("zip://a.txt");
        if vfs.register_scheme("zip", source) {
            assert!(vfs.load(&url).is_none());
            assert!(vfs.open(&url).is_none());
        }
    }
}
