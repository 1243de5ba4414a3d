//! One-time readiness gate awaited before the local store is touched.

use std::sync::Arc;
use tokio::sync::watch;

/// Gate that opens once the host platform has finished starting up.
///
/// Every clone observes the same state. Waiting on an open gate returns
/// immediately.
#[derive(Debug, Clone)]
pub struct ReadyGate {
  tx: Arc<watch::Sender<bool>>,
}

impl ReadyGate {
  /// A gate that stays closed until `open` is called.
  pub fn closed() -> Self {
    let (tx, _rx) = watch::channel(false);
    Self { tx: Arc::new(tx) }
  }

  /// A gate that is already open.
  pub fn opened() -> Self {
    let gate = Self::closed();
    gate.open();
    gate
  }

  pub fn open(&self) {
    self.tx.send_replace(true);
  }

  pub fn is_open(&self) -> bool {
    *self.tx.borrow()
  }

  /// Suspend until the gate is open.
  pub async fn wait(&self) {
    let mut rx = self.tx.subscribe();
    // The sender lives as long as `self`, so this cannot observe a closed channel
    let _ = rx.wait_for(|ready| *ready).await;
  }
}

impl Default for ReadyGate {
  fn default() -> Self {
    Self::opened()
  }
}
