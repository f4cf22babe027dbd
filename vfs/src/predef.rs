use std::path::PathBuf;

use crate::url::Url;
use crate::vfs::Vfs;

/// Well-known OS locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredefPath {
    Home,
    AppData,
    Desktop,
    Documents,
    /// Current working directory.
    Working,
    /// Directory containing the executable.
    Resources,
    /// Path of the executable itself.
    Executable,
}

impl PredefPath {
    pub const ALL: [PredefPath; 7] = [
        PredefPath::Home,
        PredefPath::AppData,
        PredefPath::Desktop,
        PredefPath::Documents,
        PredefPath::Working,
        PredefPath::Resources,
        PredefPath::Executable,
    ];

    /// Scheme name used by [`register_predef_path_aliases`].
    pub fn scheme(self) -> &'static str {
        match self {
            PredefPath::Home => "home",
            PredefPath::AppData => "appdata",
            PredefPath::Desktop => "desktop",
            PredefPath::Documents => "documents",
            PredefPath::Working => "working",
            PredefPath::Resources => "resources",
            PredefPath::Executable => "executable",
        }
    }

    fn is_directory(self) -> bool {
        self != PredefPath::Executable
    }
}

/// Look up a well-known location, or `None` if the platform has none.
pub fn predef_path(kind: PredefPath) -> Option<PathBuf> {
    match kind {
        PredefPath::Home => dirs::home_dir(),
        PredefPath::AppData => dirs::data_dir(),
        PredefPath::Desktop => dirs::desktop_dir(),
        PredefPath::Documents => dirs::document_dir(),
        PredefPath::Working => std::env::current_dir().ok(),
        PredefPath::Resources => std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf())),
        PredefPath::Executable => std::env::current_exe().ok(),
    }
}

/// Alias every directory-like [`PredefPath`] onto `file_scheme`.
///
/// After this, `home://notes.txt` resolves to `<file_scheme>://<home>/notes.txt`.
/// Locations the platform does not provide, and schemes that already have
/// an alias, are skipped. Returns the number of aliases registered.
pub fn register_predef_path_aliases(vfs: &Vfs, file_scheme: &str) -> usize {
    PredefPath::ALL
        .into_iter()
        .filter(|kind| kind.is_directory())
        .filter_map(|kind| {
            let Some(dir) = predef_path(kind) else {
                log::debug!("No {} directory on this platform", kind.scheme());
                return None;
            };
            let target = Url::new(file_scheme, dir.to_string_lossy().replace('\\', "/"));
            vfs.register_scheme_alias(kind.scheme(), target).then_some(())
        })
        .count()
}
