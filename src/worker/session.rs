use anyhow::Result;
use tokio::sync::mpsc;

use super::bootstrap::Bootstrapper;
use super::relay::EventRelay;
use super::runtime::{AppRuntime, ExecutionError, RenderPayload};
use super::OutboundSender;
use crate::protocol::{InboundEvent, SyncMessage};

/// One worker lifetime: bootstrap once, then relay host events until the
/// transport closes. Owns the runtime and the wiring between it and the
/// outbound channel.
pub struct WorkerSession<R: AppRuntime> {
    runtime: R,
    relay: EventRelay,
    outbound: OutboundSender,
    bootstrapped: bool,
}

impl<R: AppRuntime> WorkerSession<R> {
    pub fn new(runtime: R, outbound_tx: mpsc::UnboundedSender<SyncMessage>) -> Self {
        let outbound = OutboundSender::new(outbound_tx);
        let relay = EventRelay::new(runtime.document(), outbound.clone());
        Self {
            runtime,
            relay,
            outbound,
            bootstrapped: false,
        }
    }

    /// Run the startup sequence. Fatal on app-execution failure; the session
    /// must not be used for relaying afterwards.
    pub fn bootstrap(&mut self) -> Result<RenderPayload, ExecutionError> {
        if self.bootstrapped {
            return Err(ExecutionError::initialization(
                "worker session already bootstrapped",
            ));
        }
        self.bootstrapped = true;
        Bootstrapper::new(self.outbound.clone()).run(&mut self.runtime)
    }

    pub fn handle(&mut self, event: InboundEvent) -> Result<()> {
        self.relay.handle(event)
    }
}
