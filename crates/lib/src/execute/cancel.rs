//! Cancellation tokens for long-running launches.

use std::sync::Arc;

use tokio::sync::watch;

/// A cloneable token that signals cancellation to every clone.
///
/// Backed by a `watch` channel so any number of tasks can await it.
#[derive(Debug, Clone)]
pub struct Cancellation {
  sender: Arc<watch::Sender<bool>>,
}

impl Cancellation {
  pub fn new() -> Self {
    let (sender, _) = watch::channel(false);
    Self {
      sender: Arc::new(sender),
    }
  }

  /// Fire the token. Idempotent.
  pub fn cancel(&self) {
    self.sender.send_replace(true);
  }

  pub fn is_cancelled(&self) -> bool {
    *self.sender.borrow()
  }

  /// Resolves once [`Cancellation::cancel`] has been called on any clone.
  pub async fn cancelled(&self) {
    let mut receiver = self.sender.subscribe();
    // The sender lives as long as `self`, so this only returns once cancelled.
    let _ = receiver.wait_for(|cancelled| *cancelled).await;
  }
}

impl Default for Cancellation {
  fn default() -> Self {
    Self::new()
  }
}
