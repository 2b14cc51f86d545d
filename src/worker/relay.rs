use anyhow::{Context as AnyhowContext, Result};
use serde_json::Value;

use super::OutboundSender;
use crate::document::{Origin, SharedDocument};
use crate::protocol::{InboundEvent, SyncMessage};

/// Ongoing bidirectional handler for host messages after the first render.
///
/// Flow control is one in-flight patch: the host waits for `idle` before
/// sending the next delta, and `idle` is emitted only after the inbound
/// patch has been fully applied.
pub struct EventRelay {
    document: SharedDocument,
    outbound: OutboundSender,
    bound: bool,
}

impl EventRelay {
    pub fn new(document: SharedDocument, outbound: OutboundSender) -> Self {
        Self {
            document,
            outbound,
            bound: false,
        }
    }

    pub fn handle(&mut self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::Rendered => {
                self.on_rendered();
                Ok(())
            }
            InboundEvent::Patch { patch } => self.on_patch(&patch),
            InboundEvent::Location { location } => self.on_location(&location),
        }
    }

    /// One-time: open the document's outbound patch stream. Host-originated
    /// changes stay filtered out by their origin tag, so nothing the host
    /// sends is ever echoed back.
    fn on_rendered(&mut self) {
        if self.bound {
            return;
        }
        self.document.lock().unwrap().mark_live();
        self.bound = true;
    }

    fn on_patch(&mut self, payload: &str) -> Result<()> {
        let patch: Value =
            serde_json::from_str(payload).context("invalid patch payload from host")?;
        self.document
            .lock()
            .unwrap()
            .apply_patch(&patch, Origin::Host)
            .context("failed to apply host patch")?;
        self.outbound.send(SyncMessage::Idle);
        Ok(())
    }

    fn on_location(&mut self, payload: &str) -> Result<()> {
        let location: Value =
            serde_json::from_str(payload).context("invalid location payload from host")?;
        let fields = location
            .as_object()
            .context("location payload must be a JSON object")?;
        self.document.lock().unwrap().apply_location(fields);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocState;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn relay_with_pane() -> (EventRelay, SharedDocument, mpsc::UnboundedReceiver<SyncMessage>) {
        let mut doc = DocState::new();
        doc.insert_model("pane", "Markdown", json!({"object": ""}));
        let document = doc.shared();
        let (tx, rx) = mpsc::unbounded_channel();
        let relay = EventRelay::new(document.clone(), OutboundSender::new(tx));
        (relay, document, rx)
    }

    #[test]
    fn patch_event_yields_exactly_one_idle_after_application() {
        let (mut relay, document, mut rx) = relay_with_pane();
        relay.handle(InboundEvent::Rendered).unwrap();

        let payload = json!({"events": [{
            "kind": "ModelChanged",
            "model": {"id": "pane"},
            "attr": "object",
            "new": "typed",
        }]})
        .to_string();
        relay.handle(InboundEvent::Patch { patch: payload }).unwrap();

        // The patch was applied before the acknowledgment went out.
        assert_eq!(
            document.lock().unwrap().get("pane", "object"),
            Some(&json!("typed"))
        );
        assert_eq!(rx.try_recv().unwrap(), SyncMessage::Idle);
        assert!(rx.try_recv().is_err(), "exactly one idle per patch");
    }

    #[test]
    fn malformed_patch_produces_no_idle() {
        let (mut relay, _document, mut rx) = relay_with_pane();
        relay.handle(InboundEvent::Rendered).unwrap();

        let err = relay.handle(InboundEvent::Patch {
            patch: "not json".into(),
        });
        assert!(err.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn rendered_is_idempotent() {
        let (mut relay, document, _rx) = relay_with_pane();
        relay.handle(InboundEvent::Rendered).unwrap();
        relay.handle(InboundEvent::Rendered).unwrap();
        assert!(document.lock().unwrap().is_live());
    }

    #[test]
    fn location_event_applies_recognized_keys_only() {
        let (mut relay, document, _rx) = relay_with_pane();
        let payload = json!({"hash": "#demo", "unknown_field": [1, 2]}).to_string();
        relay
            .handle(InboundEvent::Location { location: payload })
            .unwrap();
        assert_eq!(
            document.lock().unwrap().location().hash.as_deref(),
            Some("#demo")
        );
    }
}
