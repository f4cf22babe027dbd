use crate::url::Url;

/// Errors that can occur during virtual file system operations.
///
/// The [`Vfs`](crate::Vfs) facade collapses these into empty results;
/// only direct users of a [`FileSource`](crate::FileSource) or a stream
/// observe them.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    /// The requested path was not found in the source.
    #[error("not found: {0}")]
    NotFound(String),
    /// The backend cannot perform the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// Alias resolution exceeded the maximum chain depth (likely a cycle).
    #[error("alias resolution depth exceeded for {0}")]
    ResolutionDepthExceeded(Url),
    /// The archive container or one of its entries is malformed.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),
    /// A platform IO error.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),
}

/// Shorthand result type for VFS operations.
pub type VfsResult<T> = Result<T, VfsError>;

impl From<std::io::Error> for VfsError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            VfsError::NotFound(err.to_string())
        } else {
            VfsError::Io(err)
        }
    }
}
