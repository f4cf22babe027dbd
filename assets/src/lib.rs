//! Typed, reference-counted asset cache for the Keel engine.
//!
//! The cache does not know about URLs or file sources. Callers load bytes
//! (usually through `keel_vfs`), decode them, wrap the result in an
//! [`Asset`] and hand it to the [`AssetCache`] under an [`AddressHash`].
//!
//! ```ignore
//! let mut cache = AssetCache::new();
//!
//! // Hand out a stable handle now, fill it when the bytes arrive.
//! let config = TextAsset::create();
//! cache.store("config.json", config.clone());
//! let pending = vfs.load_async(&Url::parse("assets://config.json"));
//! // ...
//! if let Some(bytes) = pending.recv() {
//!     config.fill(String::from_utf8_lossy(&bytes).into_owned());
//! }
//!
//! // Once per frame: drop everything only the cache still holds.
//! cache.unload_unused_assets();
//! ```

pub mod address;
mod asset;
mod cache;

pub use address::AddressHash;
pub use asset::{
    Asset, AssetPtr, BinaryAsset, ContentAsset, IntoAnyArc, NestedContent, TextAsset,
    downcast_asset,
};
pub use cache::{AssetCache, TypedAssetCache};
