//! Binary online/offline signal with edge-triggered transition events.

use tokio::sync::watch;

/// A connectivity state change. Emitted only on an actual edge, never on a
/// repeated report of the same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  CameOnline,
  WentOffline,
}

/// Shared connectivity signal. The hosting shell feeds it (e.g. from a
/// periodic reachability probe); consumers either poll `is_online` or
/// subscribe for transitions.
#[derive(Debug)]
pub struct Connectivity {
  tx: watch::Sender<bool>,
}

impl Connectivity {
  pub fn new(initially_online: bool) -> Self {
    let (tx, _) = watch::channel(initially_online);
    Self { tx }
  }

  #[allow(dead_code)]
  pub fn is_online(&self) -> bool {
    *self.tx.borrow()
  }

  /// Report the current state. Returns the transition if the state actually
  /// changed, `None` otherwise; subscribers are only woken on a change.
  pub fn set_online(&self, online: bool) -> Option<Transition> {
    let changed = self.tx.send_if_modified(|current| {
      if *current != online {
        *current = online;
        true
      } else {
        false
      }
    });

    if changed {
      Some(if online {
        Transition::CameOnline
      } else {
        Transition::WentOffline
      })
    } else {
      None
    }
  }

  pub fn subscribe(&self) -> watch::Receiver<bool> {
    self.tx.subscribe()
  }
}
