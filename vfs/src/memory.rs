use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{VfsError, VfsResult};
use crate::source::FileSource;
use crate::stream::{InputStream, InputStreamBox, OutputStream, OutputStreamBox, seek_target};

type FileMap = Arc<RwLock<HashMap<String, Arc<[u8]>>>>;

/// In-memory file source for tests and embedded assets.
///
/// `Clone` shares the underlying storage, so a handle kept outside the
/// [`Vfs`](crate::Vfs) can keep inserting files after registration.
/// Supports both read and write operations. Written data becomes visible
/// once the output stream is flushed or dropped.
///
/// # Example
///
/// ```
/// use keel_vfs::{MemoryFileSource, Url, Vfs};
///
/// let mem = MemoryFileSource::new();
/// mem.insert("config/settings.json", b"{}".to_vec());
///
/// let vfs = Vfs::new();
/// assert!(vfs.register_scheme("builtin", mem));
/// assert_eq!(vfs.load(&Url::parse("builtin://config/settings.json")), Some(b"{}".to_vec()));
/// ```
#[derive(Clone, Default)]
pub struct MemoryFileSource {
    files: FileMap,
}

impl MemoryFileSource {
    /// Create an empty in-memory source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file at the given path, overwriting any existing file.
    pub fn insert(&self, path: impl Into<String>, data: impl Into<Arc<[u8]>>) {
        self.files.write().insert(path.into(), data.into());
    }

    /// Remove a file at the given path, returning its data if it existed.
    pub fn remove(&self, path: &str) -> Option<Arc<[u8]>> {
        self.files.write().remove(path)
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    fn get(&self, path: &str) -> VfsResult<Arc<[u8]>> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| VfsError::NotFound(path.to_owned()))
    }
}

impl FileSource for MemoryFileSource {
    fn valid(&self) -> bool {
        true
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }

    fn open(&self, path: &str) -> VfsResult<InputStreamBox> {
        Ok(Box::new(MemoryInputStream::new(self.get(path)?)))
    }

    fn load(&self, path: &str) -> VfsResult<Vec<u8>> {
        Ok(self.get(path)?.to_vec())
    }

    fn write(&self, path: &str, append: bool) -> VfsResult<OutputStreamBox> {
        let initial = if append {
            self.files
                .read()
                .get(path)
                .map(|data| data.to_vec())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        Ok(Box::new(MemoryOutputStream {
            files: Arc::clone(&self.files),
            path: path.to_owned(),
            pos: initial.len() as u64,
            buffer: initial,
            dirty: true,
        }))
    }
}

/// Seekable input stream over a shared byte buffer.
pub struct MemoryInputStream {
    data: Arc<[u8]>,
    pos: u64,
}

impl MemoryInputStream {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }
}

impl InputStream for MemoryInputStream {
    fn read(&mut self, dst: &mut [u8]) -> VfsResult<usize> {
        let start = usize::try_from(self.pos)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        let count = dst.len().min(self.data.len() - start);
        dst[..count].copy_from_slice(&self.data[start..start + count]);
        self.pos += count as u64;
        Ok(count)
    }

    fn seek(&mut self, offset: i64, relative: bool) -> VfsResult<u64> {
        self.pos = seek_target(self.pos, offset, relative)?.min(self.length());
        Ok(self.pos)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn length(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Output stream that commits its buffer into a [`MemoryFileSource`].
struct MemoryOutputStream {
    files: FileMap,
    path: String,
    buffer: Vec<u8>,
    pos: u64,
    dirty: bool,
}

impl OutputStream for MemoryOutputStream {
    fn write(&mut self, src: &[u8]) -> VfsResult<usize> {
        let start = self.pos as usize;
        let end = start + src.len();
        if self.buffer.len() < end {
            self.buffer.resize(end, 0);
        }
        self.buffer[start..end].copy_from_slice(src);
        self.pos = end as u64;
        self.dirty = true;
        Ok(src.len())
    }

    fn seek(&mut self, offset: i64, relative: bool) -> VfsResult<u64> {
        self.pos = seek_target(self.pos, offset, relative)?.min(self.buffer.len() as u64);
        Ok(self.pos)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn flush(&mut self) -> VfsResult<()> {
        if self.dirty {
            self.files
                .write()
                .insert(self.path.clone(), Arc::from(self.buffer.as_slice()));
            self.dirty = false;
        }
        Ok(())
    }
}

impl Drop for MemoryOutputStream {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
