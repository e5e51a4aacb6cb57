//! Stop signal for the reconciler loop.

use tokio::sync::broadcast;

/// Fans a single stop request out to every running loop.
///
/// Each loop takes a receiver with [`Shutdown::subscribe`] before it starts.
/// Receivers created after [`Shutdown::trigger`] never see the signal.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. Returns how many loops were listening.
    pub fn trigger(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
