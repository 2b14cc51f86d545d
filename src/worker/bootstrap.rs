use tracing::{error, info, warn};

use super::runtime::{AppRuntime, ExecutionError, RenderPayload};
use super::OutboundSender;
use crate::protocol::SyncMessage;

/// One-shot startup sequence: provision the runtime, install the package
/// list best-effort, execute the app body, and hand the host its first
/// render payload. Progress and failures alike surface as `status` messages.
pub struct Bootstrapper {
    outbound: OutboundSender,
}

impl Bootstrapper {
    pub fn new(outbound: OutboundSender) -> Self {
        Self { outbound }
    }

    pub fn run<R: AppRuntime>(&self, runtime: &mut R) -> Result<RenderPayload, ExecutionError> {
        self.outbound.status("Loading runtime");

        // Register the outbound patch callback before the app runs so it can
        // push deltas without a round trip through the host.
        let outbound = self.outbound.clone();
        runtime
            .document()
            .lock()
            .unwrap()
            .set_emitter(move |delta| {
                outbound.send(SyncMessage::Patch {
                    patch: delta.patch,
                    buffers: delta.buffers,
                });
            });

        for requirement in runtime.requirements() {
            let name = requirement.display_name();
            self.outbound.status(format!("Installing {name}"));
            match runtime.install(&requirement) {
                Ok(()) => {
                    info!(target: "worker", package = %name, "installed package");
                }
                Err(err) => {
                    // Install failures are non-fatal: report and keep going.
                    warn!(target: "worker", package = %name, error = %err, "package install failed");
                    self.outbound.status(format!("Error while installing {name}"));
                }
            }
        }

        self.outbound.status("Executing code");
        match runtime.execute() {
            Ok(payload) => {
                self.outbound.send(SyncMessage::Render {
                    docs_json: payload.docs_json.clone(),
                    render_items: payload.render_items.clone(),
                    root_ids: payload.root_ids.clone(),
                });
                Ok(payload)
            }
            Err(err) => {
                error!(
                    target: "worker",
                    error = %err,
                    detail = err.detail.as_deref().unwrap_or(""),
                    "app execution failed"
                );
                self.outbound.status(err.summary.clone());
                Err(err)
            }
        }
    }
}
