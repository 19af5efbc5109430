//! Optional realtime mirroring of the record collection to a remote
//! key-value tree.
//!
//! The mirror holds the full collection as a map of `id -> record`. Local
//! mutations overwrite the entire tree ("set"); remote changes arrive over
//! a push-based value stream and replace the local collection wholesale.
//! Last-write-wins on both sides.

mod rtdb;

pub use rtdb::RtdbMirror;

use crate::model::DocumentRecord;

/// Outbound half of the mirror: receives every locally persisted snapshot.
///
/// Implementations are fire-and-forget; write failures are logged and
/// dropped, never retried or surfaced to the caller.
pub trait RemoteMirror: Send + Sync {
  /// Replace the entire remote tree with the given records.
  fn push(&self, records: Vec<DocumentRecord>);
}
