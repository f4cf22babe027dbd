use crate::error::{VfsError, VfsResult};
use crate::stream::{InputStreamBox, OutputStreamBox};

/// Trait for virtual file system backends.
///
/// A source is bound to a scheme with
/// [`Vfs::register_scheme`](crate::Vfs::register_scheme), which takes
/// ownership of it. Operations receive the path part of an already
/// alias-resolved [`Url`](crate::Url).
///
/// # Read vs Write
///
/// All sources implement the read side (`exists`, `open`, `load`). `write`
/// defaults to [`VfsError::Unsupported`]; read-write sources override it.
///
/// # Validity
///
/// A source that failed to initialize (e.g. an archive whose central
/// directory could not be parsed) reports `false` from [`valid`] and is
/// rejected at registration.
///
/// [`valid`]: FileSource::valid
pub trait FileSource: Send + Sync + 'static {
    /// Whether the source is operational.
    fn valid(&self) -> bool;

    /// Check whether a file exists at the given path.
    fn exists(&self, path: &str) -> bool;

    /// Open a readable stream over the file at the given path.
    fn open(&self, path: &str) -> VfsResult<InputStreamBox>;

    /// Read the entire contents of the file at the given path.
    fn load(&self, path: &str) -> VfsResult<Vec<u8>>;

    /// Open a writable stream, truncating the file unless `append` is set.
    fn write(&self, _path: &str, _append: bool) -> VfsResult<OutputStreamBox> {
        Err(VfsError::Unsupported("write"))
    }
}
