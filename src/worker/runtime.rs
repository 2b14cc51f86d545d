use serde_json::Value;
use thiserror::Error;

use crate::document::SharedDocument;
use crate::install::{InstallError, PackageRequirement};

/// Everything the host needs to mount the app's initial view: the full
/// document snapshot plus the render-item descriptors and root identifiers
/// referencing into it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPayload {
    pub docs_json: Value,
    pub render_items: Vec<Value>,
    pub root_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorKind {
    /// The runtime could not be brought up (or was driven twice).
    Initialization,
    /// The app body itself failed.
    App,
}

/// Fatal failure of the app body. `summary` is the single line surfaced to
/// the user as a `status` message; `detail` carries the full rendering for
/// the log.
#[derive(Debug, Error)]
#[error("{summary}")]
pub struct ExecutionError {
    pub kind: ExecutionErrorKind,
    pub summary: String,
    pub detail: Option<String>,
}

impl ExecutionError {
    pub fn app(summary: impl Into<String>) -> Self {
        Self {
            kind: ExecutionErrorKind::App,
            summary: summary.into(),
            detail: None,
        }
    }

    pub fn initialization(summary: impl Into<String>) -> Self {
        Self {
            kind: ExecutionErrorKind::Initialization,
            summary: summary.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// The embedded runtime hosting the dashboard app. The bootstrapper drives
/// this seam; tests substitute stubs to exercise failure paths the real app
/// never takes.
///
/// `execute` may spawn background tasks and therefore must be called from
/// within a tokio runtime.
pub trait AppRuntime {
    /// Ordered install list. Install failures are non-fatal by policy.
    fn requirements(&self) -> Vec<PackageRequirement>;

    fn install(&mut self, requirement: &PackageRequirement) -> Result<(), InstallError>;

    /// Run the app body once, returning the initial render payload.
    fn execute(&mut self) -> Result<RenderPayload, ExecutionError>;

    /// Handle to the document state the app mutates.
    fn document(&self) -> SharedDocument;
}
