use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::address::AddressHash;
use crate::asset::Asset;

/// Type-erased view of one cache partition.
trait AssetCacheBase: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn asset_type_name(&self) -> &'static str;
    fn asset_count(&self) -> usize;
    fn unload_unused_assets(&mut self) -> usize;
}

/// Assets of one type, keyed by address hash.
pub struct TypedAssetCache<A> {
    assets: FxHashMap<AddressHash, Arc<A>>,
}

impl<A: Asset> TypedAssetCache<A> {
    pub fn new() -> Self {
        Self {
            assets: FxHashMap::default(),
        }
    }

    pub fn find(&self, address: AddressHash) -> Option<Arc<A>> {
        self.assets.get(&address).cloned()
    }

    /// Store an asset, replacing whatever was stored at `address`.
    pub fn store(&mut self, address: AddressHash, asset: Arc<A>) {
        self.assets.insert(address, asset);
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Drop every asset the cache is the sole owner of.
    ///
    /// Returns the number of assets dropped. A handle cloned from another
    /// thread during the sweep keeps its asset alive; one released during
    /// the sweep may survive until the next one.
    pub fn unload_unused_assets(&mut self) -> usize {
        let before = self.assets.len();
        self.assets.retain(|_, asset| Arc::strong_count(asset) > 1);
        before - self.assets.len()
    }
}

impl<A: Asset> Default for TypedAssetCache<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Asset> AssetCacheBase for TypedAssetCache<A> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn asset_type_name(&self) -> &'static str {
        type_name::<A>()
    }

    fn asset_count(&self) -> usize {
        TypedAssetCache::asset_count(self)
    }

    fn unload_unused_assets(&mut self) -> usize {
        TypedAssetCache::unload_unused_assets(self)
    }
}

/// Cache of loaded assets, partitioned by asset type.
///
/// A partition is created the first time an asset of its type is stored.
/// The cache holds one strong reference per entry; anything else holding a
/// handle keeps the entry alive across [`unload_unused_assets`] sweeps.
///
/// Mutation takes `&mut self`; share the cache across threads behind a lock
/// of the caller's choosing.
///
/// [`unload_unused_assets`]: AssetCache::unload_unused_assets
#[derive(Default)]
pub struct AssetCache {
    caches: FxHashMap<TypeId, Box<dyn AssetCacheBase>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an asset, replacing whatever `A` was stored at `address`.
    pub fn store<A: Asset>(&mut self, address: impl Into<AddressHash>, asset: Arc<A>) {
        self.partition_mut::<A>().store(address.into(), asset);
    }

    pub fn find<A: Asset>(&self, address: impl Into<AddressHash>) -> Option<Arc<A>> {
        self.partition::<A>()?.find(address.into())
    }

    /// Number of cached assets of type `A`.
    pub fn asset_count_of<A: Asset>(&self) -> usize {
        self.partition::<A>()
            .map_or(0, TypedAssetCache::asset_count)
    }

    /// Number of cached assets across all types.
    pub fn asset_count(&self) -> usize {
        self.caches.values().map(|cache| cache.asset_count()).sum()
    }

    /// Sweep every partition, dropping assets nothing outside the cache holds.
    ///
    /// Returns the total number of assets dropped.
    pub fn unload_unused_assets(&mut self) -> usize {
        let mut total = 0;
        for cache in self.caches.values_mut() {
            let unloaded = cache.unload_unused_assets();
            if unloaded > 0 {
                log::debug!(
                    "Unloaded {unloaded} unused `{}` asset(s), {} remaining",
                    cache.asset_type_name(),
                    cache.asset_count()
                );
            }
            total += unloaded;
        }
        total
    }

    fn partition<A: Asset>(&self) -> Option<&TypedAssetCache<A>> {
        self.caches
            .get(&TypeId::of::<A>())
            .and_then(|cache| cache.as_any().downcast_ref())
    }

    fn partition_mut<A: Asset>(&mut self) -> &mut TypedAssetCache<A> {
        self.caches
            .entry(TypeId::of::<A>())
            .or_insert_with(|| Box::new(TypedAssetCache::<A>::new()))
            .as_any_mut()
            .downcast_mut()
            .unwrap_or_else(|| unreachable!("partition keyed by the TypeId of its asset type"))
    }
}
