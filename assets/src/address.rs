//! Asset addresses.
//!
//! An address names an asset and, optionally, a chain of nested assets
//! inside it: `atlas.json:/hero:/idle` is the `idle` asset nested in
//! `hero`, which is nested in `atlas.json`.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Separator between an address and the address nested inside it.
pub const NESTED_SEPARATOR: &str = ":/";

/// Deterministic 64-bit hash of an address string.
///
/// Caches and nested-content tables are keyed by this hash instead of the
/// string itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressHash(u64);

impl AddressHash {
    pub fn new(address: &str) -> Self {
        let mut hasher = FxHasher::default();
        address.hash(&mut hasher);
        Self(hasher.finish())
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<&str> for AddressHash {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<&String> for AddressHash {
    fn from(address: &String) -> Self {
        Self::new(address)
    }
}

impl fmt::Display for AddressHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The outermost part of an address (`atlas.json` for `atlas.json:/hero`).
pub fn parent(address: &str) -> &str {
    address
        .split_once(NESTED_SEPARATOR)
        .map_or(address, |(parent, _)| parent)
}

/// Everything after the outermost part, or `""` if nothing is nested.
pub fn nested(address: &str) -> &str {
    address
        .split_once(NESTED_SEPARATOR)
        .map_or("", |(_, nested)| nested)
}

/// Build `parent:/nested`. An empty side yields the other side.
pub fn join(parent: &str, nested: &str) -> String {
    match (parent.is_empty(), nested.is_empty()) {
        (_, true) => parent.to_owned(),
        (true, false) => nested.to_owned(),
        (false, false) => format!("{parent}{NESTED_SEPARATOR}{nested}"),
    }
}
