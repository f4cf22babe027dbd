use std::convert::Infallible;
use std::fmt;
use std::ops::Div;
use std::str::FromStr;

use crate::path;

/// A `{scheme, path}` address into the virtual file system.
///
/// The scheme selects a registered [`FileSource`](crate::FileSource) (or an
/// alias that eventually resolves to one). The path is interpreted by that
/// source.
///
/// ```
/// use keel_vfs::Url;
///
/// let url = Url::parse("assets://textures/brick.png");
/// assert_eq!(url.scheme(), "assets");
/// assert_eq!(url.path(), "textures/brick.png");
///
/// let joined = Url::new("file", "/data") / "config.json";
/// assert_eq!(joined.to_string(), "file:///data/config.json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Url {
    scheme: String,
    path: String,
}

impl Url {
    pub fn new(scheme: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            path: path.into(),
        }
    }

    /// Parse the `scheme://path` textual form.
    ///
    /// Text without a `://` separator becomes a URL with an empty scheme.
    pub fn parse(text: &str) -> Self {
        match path::split_scheme(text) {
            Some((scheme, path)) => Self::new(scheme, path),
            None => Self::new("", text),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Append a path fragment, keeping the scheme.
    pub fn join(&self, rest: &str) -> Url {
        Url {
            scheme: self.scheme.clone(),
            path: path::combine(&self.path, rest),
        }
    }
}

impl Div<&str> for &Url {
    type Output = Url;

    fn div(self, rest: &str) -> Url {
        self.join(rest)
    }
}

impl Div<&str> for Url {
    type Output = Url;

    fn div(mut self, rest: &str) -> Url {
        self.path = path::combine(&self.path, rest);
        self
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.scheme, path::SCHEME_SEPARATOR, self.path)
    }
}

impl FromStr for Url {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Url::parse(s))
    }
}

impl From<&str> for Url {
    fn from(text: &str) -> Self {
        Url::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scheme_and_path() {
        let url = Url::parse("resources://bin/sprite.png");
        assert_eq!(url, Url::new("resources", "bin/sprite.png"));
    }

    #[test]
    fn parse_without_scheme() {
        let url = Url::parse("plain/path.txt");
        assert_eq!(url.scheme(), "");
        assert_eq!(url.path(), "plain/path.txt");
    }

    #[test]
    fn display_round_trips() {
        let text = "archive://levels/1.json";
        assert_eq!(text.parse::<Url>().unwrap().to_string(), text);
    }

    #[test]
    fn div_joins_paths() {
        let base = Url::new("file", "/home/user/");
        assert_eq!(&base / "docs/a.txt", Url::new("file", "/home/user/docs/a.txt"));
        assert_eq!(base / "/b.txt", Url::new("file", "/home/user/b.txt"));
    }

    #[test]
    fn join_on_empty_path() {
        let base = Url::new("mem", "");
        assert_eq!(base.join("a.txt"), Url::new("mem", "a.txt"));
    }
}
