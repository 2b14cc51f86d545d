pub mod bootstrap;
pub mod relay;
pub mod runtime;
pub mod session;

use tokio::sync::mpsc;
use tracing::warn;

use crate::protocol::SyncMessage;

/// Sender half of the worker-to-host channel. Dropping messages when the host
/// side has gone away is deliberate: the worker's lifetime is one session and
/// a closed channel means teardown is already underway.
#[derive(Clone)]
pub struct OutboundSender {
    tx: mpsc::UnboundedSender<SyncMessage>,
}

impl OutboundSender {
    pub fn new(tx: mpsc::UnboundedSender<SyncMessage>) -> Self {
        Self { tx }
    }

    pub fn send(&self, message: SyncMessage) {
        if self.tx.send(message).is_err() {
            warn!(target: "worker", "host channel closed; dropping outbound message");
        }
    }

    pub fn status(&self, msg: impl Into<String>) {
        self.send(SyncMessage::Status { msg: msg.into() });
    }
}
