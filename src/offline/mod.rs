//! Offline caching of the hosted web shell.
//!
//! This module ports the app's offline policy to the local machine: a
//! versioned named cache pre-populated from a fixed asset manifest, then a
//! cache-first fetch path with network fallback and a cached shell document
//! as the last resort. There is no per-asset expiry and no hashing; bumping
//! [`CACHE_VERSION`] is the sole invalidation mechanism.

mod http;
mod storage;
mod worker;

pub use http::HttpAssetFetcher;
pub use storage::{AssetStorage, CachedAsset, MemoryAssetStorage, SqliteAssetStorage};
pub use worker::{
  AssetRequest, FetchedAsset, OfflineWorker, ServeSource, ServedAsset, APP_ASSETS, CACHE_VERSION,
  SHELL_PATH,
};
