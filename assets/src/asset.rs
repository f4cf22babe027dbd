use std::any::Any;
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;

use crate::address::{self, AddressHash};

/// Shared handle to an asset of unknown type.
pub type AssetPtr = Arc<dyn Asset>;

/// Nested assets keyed by the hash of their (single-level) address.
pub type NestedContent = FxHashMap<AddressHash, AssetPtr>;

/// Converts a shared handle into `Arc<dyn Any>` for downcasting.
///
/// Implemented for every sized `Send + Sync` type.
pub trait IntoAnyArc {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> IntoAnyArc for T {
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A reference-counted, cacheable piece of content.
///
/// Exposes nested lookup so tooling can walk asset graphs without knowing
/// concrete asset types.
pub trait Asset: IntoAnyArc + Send + Sync + 'static {
    /// Look up a nested asset by address (`hero:/idle` walks two levels).
    fn find_nested_asset(&self, address: &str) -> Option<AssetPtr>;
}

/// Recover the concrete type of a type-erased asset handle.
pub fn downcast_asset<A: Asset>(asset: AssetPtr) -> Option<Arc<A>> {
    IntoAnyArc::into_any_arc(asset).downcast::<A>().ok()
}

struct ContentState<C> {
    content: C,
    nested: NestedContent,
}

/// An asset wrapping a content value and its nested assets.
///
/// Created either ready (`create_with`) or empty (`create`) and populated
/// later with [`fill`](Self::fill), so dependents can hold a stable handle
/// while the data is still loading.
///
/// # Example
///
/// ```
/// use keel_assets::TextAsset;
///
/// let text = TextAsset::create();
/// assert!(text.content().is_empty());
///
/// text.fill("hello".to_owned());
/// assert_eq!(*text.content(), "hello");
/// ```
pub struct ContentAsset<C> {
    state: RwLock<ContentState<C>>,
}

/// Raw bytes.
pub type BinaryAsset = ContentAsset<Vec<u8>>;

/// UTF-8 text.
pub type TextAsset = ContentAsset<String>;

impl<C: Send + Sync + 'static> ContentAsset<C> {
    /// Create an empty, fillable asset.
    pub fn create() -> Arc<Self>
    where
        C: Default,
    {
        Self::create_with(C::default())
    }

    pub fn create_with(content: C) -> Arc<Self> {
        Self::create_with_nested(content, NestedContent::default())
    }

    pub fn create_with_nested(content: C, nested: NestedContent) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(ContentState { content, nested }),
        })
    }

    /// Replace the content and drop any nested assets.
    pub fn fill(&self, content: C) {
        self.fill_with_nested(content, NestedContent::default());
    }

    pub fn fill_with_nested(&self, content: C, nested: NestedContent) {
        let mut state = self.state.write();
        state.content = content;
        state.nested = nested;
    }

    /// Read access to the content.
    ///
    /// Holding the guard blocks [`fill`](Self::fill) on other threads.
    pub fn content(&self) -> MappedRwLockReadGuard<'_, C> {
        RwLockReadGuard::map(self.state.read(), |state| &state.content)
    }

    pub fn nested_asset_count(&self) -> usize {
        self.state.read().nested.len()
    }

    /// Typed variant of [`Asset::find_nested_asset`].
    ///
    /// Returns `None` if nothing is found or the asset is not an `A`.
    pub fn find_nested<A: Asset>(&self, address: &str) -> Option<Arc<A>> {
        downcast_asset(self.find_nested_asset(address)?)
    }
}

impl<C: Send + Sync + 'static> Asset for ContentAsset<C> {
    fn find_nested_asset(&self, address: &str) -> Option<AssetPtr> {
        let found = self
            .state
            .read()
            .nested
            .get(&AddressHash::new(address::parent(address)))
            .cloned()?;

        match address::nested(address) {
            "" => Some(found),
            rest => found.find_nested_asset(rest),
        }
    }
}
