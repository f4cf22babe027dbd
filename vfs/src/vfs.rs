use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{VfsError, VfsResult};
use crate::source::FileSource;
use crate::stream::{InputStreamBox, OutputStreamBox, read_tail};
use crate::url::Url;
use crate::worker::{LoadHandle, Worker};

/// Maximum number of alias substitutions before resolution fails.
pub const MAX_ALIAS_DEPTH: usize = 32;

/// Construction options for a [`Vfs`].
#[derive(Debug, Clone)]
pub struct VfsConfig {
    /// Name of the thread that runs [`Vfs::load_async`] work.
    pub worker_name: String,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            worker_name: "vfs-worker".into(),
        }
    }
}

/// Virtual file system that routes URLs to registered file sources.
///
/// A URL's scheme selects the source. Schemes can also be aliased to
/// another URL (`assets` -> `file:///game/assets`); aliases chain up to
/// [`MAX_ALIAS_DEPTH`] substitutions.
///
/// All operations take `&self`: the alias and scheme tables live behind a
/// single mutex, which is also held while the bound source performs the
/// call, so a source cannot be unregistered under a running operation.
/// Missing schemes, failed resolution and source errors all collapse into
/// empty results (`false`, `None`).
///
/// `Clone` is cheap and shares the same tables and worker.
///
/// # Example
///
/// ```ignore
/// let vfs = Vfs::new();
/// vfs.register_scheme("file", FileSystemFileSource::new());
/// vfs.register_scheme_alias("assets", Url::new("file", "./assets"));
///
/// let bytes = vfs.load(&Url::parse("assets://textures/brick.png"));
/// let pending = vfs.load_async(&Url::parse("assets://levels/1.json"));
/// ```
#[derive(Clone)]
pub struct Vfs {
    state: Arc<Mutex<VfsState>>,
    worker: Arc<Worker>,
}

#[derive(Default)]
struct VfsState {
    aliases: HashMap<String, Url>,
    schemes: HashMap<String, Box<dyn FileSource>>,
}

impl VfsState {
    fn resolve_url(&self, url: &Url) -> VfsResult<Url> {
        let mut resolved = url.clone();
        let mut hops = 0;
        while let Some(target) = self.aliases.get(resolved.scheme()) {
            if hops == MAX_ALIAS_DEPTH {
                return Err(VfsError::ResolutionDepthExceeded(url.clone()));
            }
            resolved = target / resolved.path();
            hops += 1;
        }
        Ok(resolved)
    }

    /// Resolve `url` and run `f` against its source, collapsing failures to `None`.
    fn with_file_source<R>(
        &self,
        url: &Url,
        op: &str,
        f: impl FnOnce(&dyn FileSource, &str) -> VfsResult<R>,
    ) -> Option<R> {
        let resolved = match self.resolve_url(url) {
            Ok(resolved) => resolved,
            Err(err) => {
                log::warn!("VFS {op} {url}: {err}");
                return None;
            }
        };
        let Some(source) = self.schemes.get(resolved.scheme()) else {
            log::debug!("VFS {op} {url}: no source for scheme `{}`", resolved.scheme());
            return None;
        };
        match f(source.as_ref(), resolved.path()) {
            Ok(value) => Some(value),
            Err(err) => {
                log::debug!("VFS {op} {url}: {err}");
                None
            }
        }
    }
}

impl Vfs {
    /// Create an empty VFS with no registered schemes.
    pub fn new() -> Self {
        Self::with_config(VfsConfig::default())
    }

    pub fn with_config(config: VfsConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(VfsState::default())),
            worker: Arc::new(Worker::spawn(config.worker_name)),
        }
    }

    /// Bind a file source to a scheme name.
    ///
    /// Returns `false` without changing anything if the scheme is already
    /// bound or the source reports itself invalid.
    pub fn register_scheme(&self, scheme: impl Into<String>, source: impl FileSource) -> bool {
        let scheme = scheme.into();
        if !source.valid() {
            log::warn!("Rejected invalid file source for scheme `{scheme}`");
            return false;
        }
        let mut state = self.state.lock();
        match state.schemes.entry(scheme) {
            Entry::Occupied(entry) => {
                log::warn!("Scheme `{}` is already registered", entry.key());
                false
            }
            Entry::Vacant(entry) => {
                log::debug!("Registered scheme `{}`", entry.key());
                entry.insert(Box::new(source));
                true
            }
        }
    }

    /// Remove a scheme binding, dropping its source.
    pub fn unregister_scheme(&self, scheme: &str) -> bool {
        let removed = self.state.lock().schemes.remove(scheme);
        if removed.is_some() {
            log::debug!("Unregistered scheme `{scheme}`");
        }
        removed.is_some()
    }

    /// Alias a scheme to another URL.
    ///
    /// `alias://rest` then resolves to `target / rest`. Returns `false` if
    /// the scheme already has an alias.
    pub fn register_scheme_alias(&self, scheme: impl Into<String>, target: Url) -> bool {
        let scheme = scheme.into();
        let mut state = self.state.lock();
        match state.aliases.entry(scheme) {
            Entry::Occupied(entry) => {
                log::warn!("Alias `{}` is already registered", entry.key());
                false
            }
            Entry::Vacant(entry) => {
                log::debug!("Registered alias `{}` -> {target}", entry.key());
                entry.insert(target);
                true
            }
        }
    }

    pub fn unregister_scheme_alias(&self, scheme: &str) -> bool {
        self.state.lock().aliases.remove(scheme).is_some()
    }

    /// Check whether a file exists.
    pub fn exists(&self, url: &Url) -> bool {
        self.state
            .lock()
            .with_file_source(url, "exists", |source, path| Ok(source.exists(path)))
            .unwrap_or(false)
    }

    /// Open a readable stream.
    pub fn open(&self, url: &Url) -> Option<InputStreamBox> {
        self.state
            .lock()
            .with_file_source(url, "open", |source, path| source.open(path))
    }

    /// Read the entire contents of a file.
    pub fn load(&self, url: &Url) -> Option<Vec<u8>> {
        self.state
            .lock()
            .with_file_source(url, "load", |source, path| source.load(path))
    }

    /// Open a writable stream, truncating unless `append` is set.
    pub fn write(&self, url: &Url, append: bool) -> Option<OutputStreamBox> {
        self.state
            .lock()
            .with_file_source(url, "write", |source, path| source.write(path, append))
    }

    /// Open and read a file on the VFS worker.
    ///
    /// The open+read sequence is always queued, even if the URL cannot be
    /// opened, so async loads complete in submission order. The stream is
    /// read outside the registry lock.
    pub fn load_async(&self, url: &Url) -> LoadHandle<Vec<u8>> {
        let state = Arc::clone(&self.state);
        let url = url.clone();
        self.worker.submit(move || {
            let mut stream = state
                .lock()
                .with_file_source(&url, "load_async", |source, path| source.open(path))?;
            match read_tail(stream.as_mut()) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    log::debug!("VFS load_async {url}: {err}");
                    None
                }
            }
        })
    }

    /// Resolve scheme aliases without touching any source.
    pub fn resolve_scheme_aliases(&self, url: &Url) -> VfsResult<Url> {
        self.state.lock().resolve_url(url)
    }
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}
