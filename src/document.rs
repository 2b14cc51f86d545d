use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Document state shared between the relay and the app's animation task.
/// The mutex is uncontended in practice: the relay and the animator take
/// turns on the same runtime, they just cannot prove it to the compiler.
pub type SharedDocument = Arc<Mutex<DocState>>;

/// Where a document mutation came from. Host-originated changes are applied
/// but never echoed back to the host; app-originated changes are emitted as
/// outbound patches once the host has reported `rendered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Host,
    App,
}

/// A delta pushed out of the document. `msg_id` is a correlation id carried
/// for the host's benefit; the relay itself does not consume it.
#[derive(Debug, Clone)]
pub struct DocumentPatch {
    pub patch: Value,
    pub buffers: Vec<Value>,
    pub msg_id: u64,
}

type PatchEmitter = Box<dyn FnMut(DocumentPatch) + Send>;

#[derive(Debug, Error)]
pub enum DocError {
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("malformed patch: {0}")]
    MalformedPatch(&'static str),
}

/// One widget/pane model in the document.
#[derive(Debug, Clone)]
pub struct Model {
    pub kind: String,
    pub attrs: Map<String, Value>,
}

struct Watcher {
    model: String,
    attr: String,
    tx: mpsc::UnboundedSender<Value>,
}

/// URL/location state synced from the host. Only the fields listed here are
/// recognized; anything else in a `location` payload is dropped so newer
/// hosts can send fields we do not know about yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationState {
    pub href: Option<String>,
    pub hostname: Option<String>,
    pub pathname: Option<String>,
    pub protocol: Option<String>,
    pub port: Option<String>,
    pub search: Option<String>,
    pub hash: Option<String>,
    pub reload: Option<bool>,
}

/// The widget document: a set of models plus the change plumbing around them.
///
/// Changes flow two ways. Inbound patches from the host are applied with
/// [`Origin::Host`] and are not re-emitted. Internal changes (the morph
/// animation writing frames) are applied with [`Origin::App`] and, once the
/// document is live, pushed to the registered emitter in mutation order.
pub struct DocState {
    models: BTreeMap<String, Model>,
    watchers: Vec<Watcher>,
    emitter: Option<PatchEmitter>,
    live: bool,
    next_msg_id: u64,
    location: LocationState,
}

impl Default for DocState {
    fn default() -> Self {
        Self::new()
    }
}

impl DocState {
    pub fn new() -> Self {
        Self {
            models: BTreeMap::new(),
            watchers: Vec::new(),
            emitter: None,
            live: false,
            next_msg_id: 0,
            location: LocationState::default(),
        }
    }

    pub fn shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    pub fn insert_model(&mut self, id: impl Into<String>, kind: impl Into<String>, attrs: Value) {
        let attrs = match attrs {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.models.insert(
            id.into(),
            Model {
                kind: kind.into(),
                attrs,
            },
        );
    }

    pub fn get(&self, model: &str, attr: &str) -> Option<&Value> {
        self.models.get(model).and_then(|m| m.attrs.get(attr))
    }

    /// Register the outbound patch callback. Installed by the bootstrapper
    /// before the app runs; emission stays dormant until [`mark_live`] is
    /// called when the host reports `rendered`.
    ///
    /// [`mark_live`]: DocState::mark_live
    pub fn set_emitter(&mut self, emitter: impl FnMut(DocumentPatch) + Send + 'static) {
        self.emitter = Some(Box::new(emitter));
    }

    pub fn mark_live(&mut self) {
        self.live = true;
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Subscribe to changes of one attribute. Fires for every applied change
    /// regardless of origin, matching widget-callback semantics: a host patch
    /// committing an input value must still trigger the app's watcher.
    pub fn watch(&mut self, model: &str, attr: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.watchers.push(Watcher {
            model: model.to_string(),
            attr: attr.to_string(),
            tx,
        });
        rx
    }

    /// Set a single attribute. Setting an attribute to its current value is a
    /// no-op: no watcher fires and no patch is emitted.
    pub fn set(
        &mut self,
        model: &str,
        attr: &str,
        value: Value,
        origin: Origin,
    ) -> Result<(), DocError> {
        let entry = self
            .models
            .get_mut(model)
            .ok_or_else(|| DocError::UnknownModel(model.to_string()))?;
        if entry.attrs.get(attr) == Some(&value) {
            return Ok(());
        }
        entry.attrs.insert(attr.to_string(), value.clone());

        self.watchers.retain(|watcher| {
            if watcher.model != model || watcher.attr != attr {
                return true;
            }
            watcher.tx.send(value.clone()).is_ok()
        });

        if self.live && origin != Origin::Host {
            if let Some(emitter) = self.emitter.as_mut() {
                self.next_msg_id += 1;
                emitter(DocumentPatch {
                    patch: json!({
                        "events": [{
                            "kind": "ModelChanged",
                            "model": {"id": model},
                            "attr": attr,
                            "new": value,
                        }],
                    }),
                    buffers: Vec::new(),
                    msg_id: self.next_msg_id,
                });
            }
        }

        Ok(())
    }

    /// Apply a host patch document: `{"events": [{"kind": "ModelChanged",
    /// "model": {"id": ...}, "attr": ..., "new": ...}, ...]}`. Event kinds we
    /// do not understand are skipped rather than rejected.
    pub fn apply_patch(&mut self, patch: &Value, origin: Origin) -> Result<(), DocError> {
        let events = patch
            .get("events")
            .and_then(Value::as_array)
            .ok_or(DocError::MalformedPatch("missing events list"))?;

        for event in events {
            match event.get("kind").and_then(Value::as_str) {
                Some("ModelChanged") => {}
                Some(kind) => {
                    debug!(target: "doc", kind, "skipping unsupported patch event");
                    continue;
                }
                None => return Err(DocError::MalformedPatch("event without kind")),
            }

            let model = event
                .get("model")
                .and_then(|m| m.get("id"))
                .and_then(Value::as_str)
                .ok_or(DocError::MalformedPatch("event without model id"))?;
            let attr = event
                .get("attr")
                .and_then(Value::as_str)
                .ok_or(DocError::MalformedPatch("event without attr"))?;
            let new = event.get("new").cloned().unwrap_or(Value::Null);

            self.set(model, attr, new, origin)?;
        }

        Ok(())
    }

    pub fn location(&self) -> &LocationState {
        &self.location
    }

    /// Apply a host location sync, keeping only recognized fields. Unknown
    /// keys and wrongly typed values are dropped, never an error.
    pub fn apply_location(&mut self, fields: &Map<String, Value>) {
        for (key, value) in fields {
            let slot = match key.as_str() {
                "href" => &mut self.location.href,
                "hostname" => &mut self.location.hostname,
                "pathname" => &mut self.location.pathname,
                "protocol" => &mut self.location.protocol,
                "port" => &mut self.location.port,
                "search" => &mut self.location.search,
                "hash" => &mut self.location.hash,
                "reload" => {
                    match value.as_bool() {
                        Some(flag) => self.location.reload = Some(flag),
                        None => debug!(target: "doc", key = %key, "dropping mistyped location field"),
                    }
                    continue;
                }
                _ => {
                    debug!(target: "doc", key = %key, "dropping unrecognized location field");
                    continue;
                }
            };
            match value.as_str() {
                Some(text) => *slot = Some(text.to_string()),
                None => debug!(target: "doc", key = %key, "dropping mistyped location field"),
            }
        }
    }

    /// Full snapshot of every model, in stable id order.
    pub fn references(&self) -> Vec<Value> {
        self.models
            .iter()
            .map(|(id, model)| {
                json!({
                    "id": id,
                    "type": model.kind,
                    "attributes": model.attrs,
                })
            })
            .collect()
    }
}
