//! Engine event fan-out with explicit subscription handles.

use tokio::sync::broadcast;
use tracing::warn;

/// An event emitted by the engine while it is alive.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Fraction of the current execution that is done (0.0-1.0).
    Progress { fraction: f64 },
    /// One line of engine output.
    Log { line: String },
}

/// Sender side of the engine event stream.
///
/// Engines own one of these and emit into it; consumers call
/// [`EngineEvents::subscribe`] and hold the returned handle for as long as
/// they want events.
#[derive(Debug, Clone)]
pub struct EngineEvents {
    sender: broadcast::Sender<EngineEvent>,
}

impl EngineEvents {
    /// Create a new event hub with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Emit a progress sample.
    pub fn progress(&self, fraction: f64) {
        // No subscribers is fine
        let _ = self.sender.send(EngineEvent::Progress { fraction });
    }

    /// Emit a log line.
    pub fn log(&self, line: impl Into<String>) {
        let _ = self.sender.send(EngineEvent::Log { line: line.into() });
    }

    /// Open a new subscription. Dropping it unsubscribes.
    pub fn subscribe(&self) -> EngineSubscription {
        EngineSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EngineEvents {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// A live subscription to engine events.
#[derive(Debug)]
pub struct EngineSubscription {
    receiver: broadcast::Receiver<EngineEvent>,
}

impl EngineSubscription {
    /// Wait for the next event. Returns `None` once the engine is gone.
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Engine subscription lagged, skipped {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take an already-buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Engine subscription lagged, skipped {} events", n);
                }
                Err(_) => return None,
            }
        }
    }
}
