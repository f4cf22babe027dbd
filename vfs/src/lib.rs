//! Virtual file system for the Keel engine.
//!
//! Routes [`Url`]s (`scheme://path`) to registered [`FileSource`]s through
//! the [`Vfs`] facade. Schemes can be aliased onto other URLs, so game code
//! addresses `assets://textures/brick.png` without knowing whether the bytes
//! live in a directory, a zip package or memory.
//!
//! ```ignore
//! let vfs = Vfs::new();
//! vfs.register_scheme("file", FileSystemFileSource::new());
//! vfs.register_scheme("pak", ArchiveFileSource::new(Box::new(FileInputStream::open(path)?)));
//! vfs.register_scheme_alias("assets", Url::new("pak", "data"));
//!
//! let bytes = vfs.load(&Url::parse("assets://config.json"));
//! let pending = vfs.load_async(&Url::parse("assets://level.bin"));
//! ```
//!
//! # Sources
//!
//! - [`MemoryFileSource`] - In-memory storage for tests and embedded assets (read-write)
//! - [`FileSystemFileSource`] - Native filesystem access (read-write, native only)
//! - [`ArchiveFileSource`] - Zip packages read through any seekable stream (read-only)
//!
//! Custom sources implement [`FileSource`]. Writing is optional and
//! defaults to [`VfsError::Unsupported`].
//!
//! # Async loading
//!
//! [`Vfs::load_async`] queues the open and read on a single worker thread
//! owned by the VFS, so loads complete in submission order. The returned
//! [`LoadHandle`] can be awaited, polled or blocked on.

#[cfg(feature = "archive")]
mod archive;
mod error;
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
mod filesystem;
mod memory;
pub mod path;
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
mod predef;
mod source;
pub mod stream;
mod url;
mod vfs;
mod worker;

#[cfg(feature = "archive")]
pub use archive::ArchiveFileSource;
pub use error::{VfsError, VfsResult};
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
pub use filesystem::{FileInputStream, FileOutputStream, FileSystemFileSource};
pub use memory::{MemoryFileSource, MemoryInputStream};
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
pub use predef::{PredefPath, predef_path, register_predef_path_aliases};
pub use source::FileSource;
pub use stream::{InputStream, InputStreamBox, OutputStream, OutputStreamBox};
pub use url::Url;
pub use vfs::{MAX_ALIAS_DEPTH, Vfs, VfsConfig};
pub use worker::LoadHandle;
