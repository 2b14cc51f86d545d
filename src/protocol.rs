use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages the worker sends to the host, discriminated by a `type` field.
///
/// `status` carries human-readable progress (and failures — there is no
/// separate error channel). `render` carries the initial document payload the
/// host mounts once; `patch` carries incremental deltas afterwards. `idle`
/// acknowledges that an inbound patch has been fully applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncMessage {
    Status {
        msg: String,
    },
    Patch {
        patch: Value,
        buffers: Vec<Value>,
    },
    Render {
        docs_json: Value,
        render_items: Vec<Value>,
        root_ids: Vec<String>,
    },
    Idle,
}

/// Messages the host sends to the worker, discriminated by a `type` field.
///
/// `patch` and `location` payloads arrive JSON-encoded as strings, mirroring
/// the host transport which serializes them before posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Sent once after the host has mounted the render payload.
    Rendered,
    /// Host-originated document delta.
    Patch { patch: String },
    /// Host-originated URL/location state sync.
    Location { location: String },
}
