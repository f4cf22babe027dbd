use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{VfsError, VfsResult};
use crate::source::FileSource;
use crate::stream::{InputStream, InputStreamBox, OutputStream, OutputStreamBox, seek_target};

/// File system source for reading and writing files on disk.
///
/// Without a root, paths are used as-is (absolute or relative to the
/// working directory), which is what the `file` scheme and the well-known
/// directory aliases expect. With a root, the path is joined onto it.
/// All I/O is blocking (`std::fs`).
///
/// # Example
///
/// ```ignore
/// let vfs = Vfs::new();
/// vfs.register_scheme("file", FileSystemFileSource::new());
/// vfs.register_scheme_alias("assets", Url::new("file", "./assets"));
///
/// // Reads ./assets/textures/brick.png
/// let bytes = vfs.load(&Url::parse("assets://textures/brick.png"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileSystemFileSource {
    root: Option<PathBuf>,
}

impl FileSystemFileSource {
    /// Create a source that uses paths as-is.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source rooted at the given directory.
    ///
    /// The directory does not need to exist yet; it is checked at
    /// read/write time.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path.trim_start_matches('/')),
            None => PathBuf::from(path),
        }
    }
}

impl FileSource for FileSystemFileSource {
    fn valid(&self) -> bool {
        true
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn open(&self, path: &str) -> VfsResult<InputStreamBox> {
        Ok(Box::new(FileInputStream::open(&self.resolve(path))?))
    }

    fn load(&self, path: &str) -> VfsResult<Vec<u8>> {
        Ok(std::fs::read(self.resolve(path))?)
    }

    fn write(&self, path: &str, append: bool) -> VfsResult<OutputStreamBox> {
        Ok(Box::new(FileOutputStream::create(
            &self.resolve(path),
            append,
        )?))
    }
}

/// Read stream over a file on disk.
pub struct FileInputStream {
    file: File,
    pos: u64,
    length: u64,
}

impl FileInputStream {
    pub fn open(path: &Path) -> VfsResult<Self> {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        Ok(Self {
            file,
            pos: 0,
            length,
        })
    }
}

impl InputStream for FileInputStream {
    fn read(&mut self, dst: &mut [u8]) -> VfsResult<usize> {
        let read = self.file.read(dst)?;
        self.pos += read as u64;
        Ok(read)
    }

    fn seek(&mut self, offset: i64, relative: bool) -> VfsResult<u64> {
        let target = seek_target(self.pos, offset, relative)?;
        self.pos = self.file.seek(SeekFrom::Start(target))?;
        Ok(self.pos)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn length(&self) -> u64 {
        self.length
    }
}

/// Write stream over a file on disk. Parent directories are created.
///
/// Append streams always write at the end of the file and cannot seek.
pub struct FileOutputStream {
    file: File,
    pos: u64,
    append: bool,
}

impl FileOutputStream {
    pub fn create(path: &Path, append: bool) -> VfsResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut options = OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let mut file = options.open(path)?;
        let pos = file.seek(SeekFrom::End(0))?;
        Ok(Self { file, pos, append })
    }
}

impl OutputStream for FileOutputStream {
    fn write(&mut self, src: &[u8]) -> VfsResult<usize> {
        let written = self.file.write(src)?;
        self.pos += written as u64;
        Ok(written)
    }

    fn seek(&mut self, offset: i64, relative: bool) -> VfsResult<u64> {
        if self.append {
            return Err(VfsError::Unsupported("seek on append stream"));
        }
        let target = seek_target(self.pos, offset, relative)?;
        self.pos = self.file.seek(SeekFrom::Start(target))?;
        Ok(self.pos)
    }

    fn tell(&self) -> u64 {
        self.pos
    }

    fn flush(&mut self) -> VfsResult<()> {
        self.file.flush()?;
        Ok(())
    }
}
