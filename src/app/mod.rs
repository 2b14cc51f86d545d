pub mod animator;
pub mod morph;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::document::{DocState, SharedDocument};
use crate::install::{InstallError, PackageRequirement};
use crate::worker::runtime::{AppRuntime, ExecutionError, RenderPayload};
use animator::Animator;
use morph::{MorphSession, SourceToggles};

pub const TITLE: &str = "M O R P H E X T";

/// Model identifiers of the widget document.
pub const TEXT_INPUT: &str = "text_input";
pub const MORPH_SPEED: &str = "morph_speed";
pub const MORPH_ITERATIONS: &str = "morph_iterations";
pub const TOGGLE_GROUP: &str = "toggle_group";
pub const MORPHING_TEXT: &str = "morphing_text";
pub const TEMPLATE: &str = "template";

pub const MAX_INPUT_LEN: usize = 18;

/// Fixed install list the bootstrapper walks through, in order.
const ENV_SPEC: [&str; 3] = [
    "https://cdn.holoviz.org/panel/0.14.2/dist/wheels/bokeh-2.4.3-py3-none-any.whl",
    "https://cdn.holoviz.org/panel/0.14.2/dist/wheels/panel-0.14.2-py3-none-any.whl",
    "pyodide-http==0.1.0",
];

/// The embedded morph dashboard: a text input whose committed value is
/// revealed character by character in the markdown pane, with speed,
/// iteration-multiplier, and character-class controls read live at commit
/// time.
pub struct MorphApp {
    document: SharedDocument,
    installed: Vec<String>,
    executed: bool,
}

impl Default for MorphApp {
    fn default() -> Self {
        Self::new()
    }
}

impl MorphApp {
    pub fn new() -> Self {
        Self {
            document: DocState::new().shared(),
            installed: Vec::new(),
            executed: false,
        }
    }

    pub fn installed(&self) -> &[String] {
        &self.installed
    }

    fn build_models(doc: &mut DocState) {
        doc.insert_model(
            TEXT_INPUT,
            "TextAreaInput",
            json!({
                "placeholder": "What would you like to morph?",
                "max_length": MAX_INPUT_LEN,
                "value": "",
                "value_input": "",
            }),
        );
        doc.insert_model(
            MORPH_SPEED,
            "FloatInput",
            json!({
                "name": "Morph Speed",
                "value": 0.03,
                "start": 0.001,
                "end": 1.0,
                "step": 0.01,
            }),
        );
        doc.insert_model(
            MORPH_ITERATIONS,
            "IntInput",
            json!({
                "name": "Morph Iterations",
                "value": 3,
                "start": 1,
                "end": 100,
            }),
        );
        doc.insert_model(
            TOGGLE_GROUP,
            "ToggleGroup",
            json!({
                "options": ["Numbers", "Letters", "Symbols"],
                "value": ["Numbers", "Letters"],
            }),
        );
        doc.insert_model(MORPHING_TEXT, "Markdown", json!({"object": ""}));
        doc.insert_model(
            TEMPLATE,
            "FastListTemplate",
            json!({
                "title": TITLE,
                "theme": "dark",
                "accent": "fast",
                "main_max_width": "90%",
                "children": [
                    TEXT_INPUT,
                    MORPH_SPEED,
                    MORPH_ITERATIONS,
                    TOGGLE_GROUP,
                    MORPHING_TEXT,
                ],
            }),
        );
    }

    fn render_payload(&self) -> RenderPayload {
        let doc = self.document.lock().unwrap();
        RenderPayload {
            docs_json: json!({
                "title": TITLE,
                "version": env!("CARGO_PKG_VERSION"),
                "roots": {
                    "root_ids": [TEMPLATE],
                    "references": doc.references(),
                },
            }),
            render_items: vec![json!({
                "docid": TEMPLATE,
                "root_ids": [TEMPLATE],
                "use_for_title": false,
            })],
            root_ids: vec![TEMPLATE.to_string()],
        }
    }
}

impl AppRuntime for MorphApp {
    fn requirements(&self) -> Vec<PackageRequirement> {
        ENV_SPEC.iter().map(|spec| PackageRequirement::parse(spec)).collect()
    }

    fn install(&mut self, requirement: &PackageRequirement) -> Result<(), InstallError> {
        // The demo's modules ship with the worker; installing registers the
        // requirement with the app context.
        self.installed.push(requirement.display_name());
        Ok(())
    }

    fn execute(&mut self) -> Result<RenderPayload, ExecutionError> {
        if self.executed {
            return Err(ExecutionError::initialization("app already executed"));
        }
        self.executed = true;

        let commits = {
            let mut doc = self.document.lock().unwrap();
            Self::build_models(&mut doc);
            doc.watch(TEXT_INPUT, "value_input")
        };
        spawn_commit_watcher(Arc::clone(&self.document), commits);

        Ok(self.render_payload())
    }

    fn document(&self) -> SharedDocument {
        Arc::clone(&self.document)
    }
}

/// React to committed input values: read the control widgets as they stand
/// right now and hand the animator a fresh session, preempting any run still
/// in flight.
fn spawn_commit_watcher(document: SharedDocument, mut commits: mpsc::UnboundedReceiver<Value>) {
    let mut animator = Animator::new(Arc::clone(&document), MORPHING_TEXT);
    tokio::spawn(async move {
        while let Some(value) = commits.recv().await {
            let word: String = value
                .as_str()
                .unwrap_or_default()
                .chars()
                .take(MAX_INPUT_LEN)
                .collect();

            let (multiplier, step_delay, toggles) = {
                let doc = document.lock().unwrap();
                let multiplier = doc
                    .get(MORPH_ITERATIONS, "value")
                    .and_then(Value::as_u64)
                    .unwrap_or(3)
                    .clamp(1, 100) as u32;
                let speed = doc
                    .get(MORPH_SPEED, "value")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.03)
                    .clamp(0.001, 1.0);
                let toggles = doc
                    .get(TOGGLE_GROUP, "value")
                    .map(SourceToggles::from_value)
                    .unwrap_or_default();
                (multiplier, Duration::from_secs_f64(speed), toggles)
            };

            animator.start(MorphSession::new(&word, multiplier, toggles), step_delay);
        }
    });
}
