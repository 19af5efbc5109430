//! Offline worker lifecycle: install, activate, fetch.
//!
//! Implements the shell caching policy: cache-first, network fallback with
//! write-back of successful GETs, offline shell on total failure. The only
//! invalidation mechanism is bumping the cache version string, which makes
//! the next activation purge every differently-named cache.

use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

use super::storage::{AssetStorage, CachedAsset};

/// Versioned cache name. Bump to invalidate everything previously cached.
pub const CACHE_VERSION: &str = "scadenze-famiglia-v1";

/// Fallback document served when a request misses the cache and the
/// network is unreachable.
pub const SHELL_PATH: &str = "./index.html";

/// Shell assets pre-populated at install time.
pub const APP_ASSETS: &[&str] = &[
  "./",
  "./index.html",
  "./style.css",
  "./app.js",
  "./manifest.json",
  "./icons/icon-192.svg",
  "./icons/icon-512.svg",
];

/// A request the worker can serve.
#[derive(Debug, Clone)]
pub struct AssetRequest {
  pub path: String,
  pub method: Method,
}

impl AssetRequest {
  pub fn get(path: &str) -> Self {
    Self {
      path: path.to_string(),
      method: Method::GET,
    }
  }
}

/// A response fetched from the network.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

/// Where a served asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeSource {
  /// Found in the current cache.
  Cache,
  /// Fetched from the network.
  Network,
  /// Network unreachable, served the cached shell document instead.
  OfflineShell,
}

/// Result of serving a request, including where the bytes came from.
#[derive(Debug, Clone)]
pub struct ServedAsset {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
  pub source: ServeSource,
}

/// The offline worker over a storage backend.
pub struct OfflineWorker<S: AssetStorage> {
  storage: Arc<S>,
  cache_name: String,
}

impl<S: AssetStorage> OfflineWorker<S> {
  /// Create a worker bound to the current cache version.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      cache_name: CACHE_VERSION.to_string(),
    }
  }

  /// Override the cache name. Used in tests to simulate version bumps.
  #[cfg(test)]
  pub fn with_cache_name(mut self, name: &str) -> Self {
    self.cache_name = name.to_string();
    self
  }

  /// Install phase: pre-populate the current cache with the full asset
  /// manifest. Fails if any asset cannot be fetched successfully, leaving
  /// whatever was stored so far in place.
  ///
  /// There is no waiting phase: a completed install is immediately the
  /// active instance.
  pub async fn install<F, Fut>(&self, fetcher: F) -> Result<usize>
  where
    F: Fn(AssetRequest) -> Fut,
    Fut: Future<Output = Result<FetchedAsset>>,
  {
    for path in APP_ASSETS {
      let fetched = fetcher(AssetRequest::get(path))
        .await
        .map_err(|e| eyre!("install failed fetching {}: {}", path, e))?;

      if fetched.status != 200 {
        return Err(eyre!(
          "install failed fetching {}: HTTP {}",
          path,
          fetched.status
        ));
      }

      self.storage.put(
        &self.cache_name,
        &CachedAsset {
          path: path.to_string(),
          content_type: fetched.content_type,
          body: fetched.body,
        },
      )?;
    }

    info!(
      "installed {} shell assets into {}",
      APP_ASSETS.len(),
      self.cache_name
    );
    Ok(APP_ASSETS.len())
  }

  /// Activate phase: purge every cache whose name differs from the current
  /// version. Returns the purged cache names.
  pub fn activate(&self) -> Result<Vec<String>> {
    let mut purged = Vec::new();

    for name in self.storage.cache_names()? {
      if name != self.cache_name {
        self.storage.delete_cache(&name)?;
        purged.push(name);
      }
    }

    if !purged.is_empty() {
      info!("purged stale caches: {}", purged.join(", "));
    }
    Ok(purged)
  }

  /// Fetch phase, per request:
  ///
  /// 1. serve from the current cache when present;
  /// 2. otherwise go to the network, storing GET responses with HTTP 200
  ///    back into the cache before returning them;
  /// 3. on network failure, fall back to the cached shell document.
  ///
  /// Errors only when the network is unreachable and no shell is cached.
  pub async fn fetch<F, Fut>(&self, request: &AssetRequest, fetcher: F) -> Result<ServedAsset>
  where
    F: FnOnce(AssetRequest) -> Fut,
    Fut: Future<Output = Result<FetchedAsset>>,
  {
    // Only GETs can match the cache
    if request.method == Method::GET {
      if let Some(cached) = self.storage.get(&self.cache_name, &request.path)? {
        debug!("cache hit: {}", request.path);
        return Ok(ServedAsset {
          status: 200,
          content_type: cached.content_type,
          body: cached.body,
          source: ServeSource::Cache,
        });
      }
    }

    match fetcher(request.clone()).await {
      Ok(fetched) => {
        if request.method == Method::GET && fetched.status == 200 {
          self.storage.put(
            &self.cache_name,
            &CachedAsset {
              path: request.path.clone(),
              content_type: fetched.content_type.clone(),
              body: fetched.body.clone(),
            },
          )?;
        }

        Ok(ServedAsset {
          status: fetched.status,
          content_type: fetched.content_type,
          body: fetched.body,
          source: ServeSource::Network,
        })
      }
      Err(e) => {
        debug!("network failed for {}: {}", request.path, e);
        let shell = self
          .storage
          .get(&self.cache_name, SHELL_PATH)?
          .ok_or_else(|| eyre!("offline and no cached shell for {}", request.path))?;

        Ok(ServedAsset {
          status: 200,
          content_type: shell.content_type,
          body: shell.body,
          source: ServeSource::OfflineShell,
        })
      }
    }
  }
}
