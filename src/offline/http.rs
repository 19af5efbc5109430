//! Network fetcher for shell assets.

use color_eyre::{eyre::eyre, Result};
use reqwest::Client;
use url::Url;

use super::worker::{AssetRequest, FetchedAsset};

/// Fetches shell assets over HTTP from the configured base url.
#[derive(Clone)]
pub struct HttpAssetFetcher {
  client: Client,
  base_url: Url,
}

impl HttpAssetFetcher {
  pub fn new(base_url: &str) -> Result<Self> {
    // A trailing slash makes relative manifest paths resolve underneath
    // the base instead of replacing its last segment.
    let normalized = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };

    let base_url =
      Url::parse(&normalized).map_err(|e| eyre!("Invalid asset base url {}: {}", base_url, e))?;

    Ok(Self {
      client: Client::new(),
      base_url,
    })
  }

  /// Resolve a manifest-relative path against the base url.
  pub fn resolve(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Cannot resolve asset path {}: {}", path, e))
  }

  pub async fn fetch(&self, request: AssetRequest) -> Result<FetchedAsset> {
    let url = self.resolve(&request.path)?;

    let response = self
      .client
      .request(request.method, url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", request.path, e))?;

    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", request.path, e))?
      .to_vec();

    Ok(FetchedAsset {
      status,
      content_type,
      body,
    })
  }
}
