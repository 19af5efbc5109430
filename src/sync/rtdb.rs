//! Remote mirror backed by a Firebase-style realtime database.
//!
//! Writes go through the REST interface (`PUT <tree>.json` with the full
//! `id -> record` map). The listener uses the server-sent-events stream the
//! same endpoint exposes: a `put` at path `/` carries the whole tree, any
//! other change is handled by re-reading the tree in full.

use color_eyre::{eyre::eyre, Result};
use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::RemoteConfig;
use crate::event::Event;
use crate::model::DocumentRecord;
use crate::sync::RemoteMirror;

pub struct RtdbMirror {
  client: Client,
  tree_url: Url,
}

impl RtdbMirror {
  pub fn new(config: &RemoteConfig) -> Result<Self> {
    let base = config.database_url.trim_end_matches('/');
    let mut tree_url = Url::parse(&format!("{}/{}.json", base, config.tree))
      .map_err(|e| eyre!("Invalid remote database url {}: {}", config.database_url, e))?;

    if let Some(token) = RemoteConfig::get_auth_token() {
      tree_url.query_pairs_mut().append_pair("auth", &token);
    }

    Ok(Self {
      client: Client::new(),
      tree_url,
    })
  }

  /// Read the entire remote tree.
  pub async fn fetch_all(&self) -> Result<Vec<DocumentRecord>> {
    let value: Value = self
      .client
      .get(self.tree_url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Failed to read remote tree: {}", e))?
      .error_for_status()
      .map_err(|e| eyre!("Remote tree read rejected: {}", e))?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse remote tree: {}", e))?;

    Ok(records_from_tree(&value))
  }

  /// Spawn the push-based change listener.
  ///
  /// Every value change on the remote tree is delivered to `tx` as
  /// `Event::Remote` with the full replacement collection. The task ends
  /// when the stream does; there is no reconnect.
  pub fn spawn_listener(self: Arc<Self>, tx: mpsc::UnboundedSender<Event>) {
    tokio::spawn(async move {
      if let Err(e) = self.listen(&tx).await {
        warn!("remote listener stopped: {}", e);
        let _ = tx.send(Event::Error(format!("remote sync lost: {}", e)));
      }
    });
  }

  async fn listen(&self, tx: &mpsc::UnboundedSender<Event>) -> Result<()> {
    let response = self
      .client
      .get(self.tree_url.clone())
      .header("Accept", "text/event-stream")
      .send()
      .await
      .map_err(|e| eyre!("Failed to open event stream: {}", e))?
      .error_for_status()
      .map_err(|e| eyre!("Event stream rejected: {}", e))?;

    info!("remote listener connected to {}", self.tree_url.path());

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
      let chunk = chunk.map_err(|e| eyre!("Event stream read failed: {}", e))?;
      buffer.push_str(&String::from_utf8_lossy(&chunk));

      // SSE messages are separated by a blank line
      while let Some(end) = buffer.find("\n\n") {
        let block = buffer[..end].to_string();
        buffer.drain(..end + 2);

        let Some((event, data)) = parse_sse_block(&block) else {
          continue;
        };

        match event.as_str() {
          "put" | "patch" => {
            if let Some(records) = self.change_to_records(&event, &data).await {
              if tx.send(Event::Remote(records)).is_err() {
                return Ok(());
              }
            }
          }
          "keep-alive" => {}
          "cancel" | "auth_revoked" => {
            return Err(eyre!("event stream closed by server: {}", event));
          }
          other => debug!("ignoring event stream message: {}", other),
        }
      }
    }

    Err(eyre!("event stream ended"))
  }

  /// Turn a change notification into the full replacement collection.
  ///
  /// A root `put` already carries the whole tree. Anything narrower is
  /// resolved by re-reading the tree, which keeps the local side a plain
  /// full-replacement consumer.
  async fn change_to_records(&self, event: &str, data: &str) -> Option<Vec<DocumentRecord>> {
    let payload: Value = match serde_json::from_str(data) {
      Ok(v) => v,
      Err(e) => {
        warn!("discarding malformed change payload: {}", e);
        return None;
      }
    };

    let path = payload["path"].as_str().unwrap_or("/");
    if event == "put" && path == "/" {
      if payload["data"].is_null() {
        // Empty remote tree on connect: nothing to replace with
        return None;
      }
      return Some(records_from_tree(&payload["data"]));
    }

    match self.fetch_all().await {
      Ok(records) => Some(records),
      Err(e) => {
        warn!("failed to re-read remote tree after change: {}", e);
        None
      }
    }
  }
}

impl RemoteMirror for RtdbMirror {
  fn push(&self, records: Vec<DocumentRecord>) {
    let client = self.client.clone();
    let tree_url = self.tree_url.clone();
    let tree = tree_from_records(&records);

    tokio::spawn(async move {
      let result = client.put(tree_url).json(&tree).send().await;
      match result.and_then(|r| r.error_for_status()) {
        Ok(_) => debug!("pushed {} records to remote tree", records.len()),
        Err(e) => warn!("remote push failed: {}", e),
      }
    });
  }
}

/// Build the `id -> record` map the remote tree stores.
fn tree_from_records(records: &[DocumentRecord]) -> Value {
  let mut tree = serde_json::Map::new();
  for record in records {
    if let Ok(value) = serde_json::to_value(record) {
      tree.insert(record.id.clone(), value);
    }
  }
  Value::Object(tree)
}

/// Collect the values of an `id -> record` tree, dropping entries that do
/// not deserialize as records.
fn records_from_tree(tree: &Value) -> Vec<DocumentRecord> {
  let Some(map) = tree.as_object() else {
    return Vec::new();
  };

  map
    .values()
    .filter_map(|value| match serde_json::from_value(value.clone()) {
      Ok(record) => Some(record),
      Err(e) => {
        warn!("discarding malformed remote record: {}", e);
        None
      }
    })
    .collect()
}

/// Extract the `event:` name and `data:` payload from one SSE block.
fn parse_sse_block(block: &str) -> Option<(String, String)> {
  let mut event = None;
  let mut data = None;

  for line in block.lines() {
    if let Some(rest) = line.strip_prefix("event:") {
      event = Some(rest.trim().to_string());
    } else if let Some(rest) = line.strip_prefix("data:") {
      data = Some(rest.trim().to_string());
    }
  }

  Some((event?, data.unwrap_or_default()))
}
