use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::error;

use super::morph::MorphSession;
use crate::document::{Origin, SharedDocument};

/// Drives one morph session at a time as a cancellable timed task.
///
/// Single-slot supersession: starting a new session preempts the in-flight
/// one, so a rapid second commit never queues behind a stale animation. Each
/// step sleeps the configured delay, then writes the next frame into the
/// document, which pushes it to the host as a patch.
pub struct Animator {
    document: SharedDocument,
    target_model: String,
    current: Option<mpsc::UnboundedSender<()>>,
}

impl Animator {
    pub fn new(document: SharedDocument, target_model: impl Into<String>) -> Self {
        Self {
            document,
            target_model: target_model.into(),
            current: None,
        }
    }

    pub fn start(&mut self, mut session: MorphSession, step_delay: Duration) {
        if let Some(cancel) = self.current.take() {
            let _ = cancel.send(());
        }

        let (cancel_tx, mut cancel_rx) = mpsc::unbounded_channel();
        let document = Arc::clone(&self.document);
        let model = self.target_model.clone();

        tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            loop {
                tokio::select! {
                    biased;
                    _ = cancel_rx.recv() => return,
                    _ = sleep(step_delay) => {
                        let Some(frame) = session.step(&mut rng) else {
                            return;
                        };
                        let write = document
                            .lock()
                            .unwrap()
                            .set(&model, "object", Value::String(frame), Origin::App);
                        if let Err(err) = write {
                            error!(target: "morph", error = %err, "failed to write animation frame");
                            return;
                        }
                    }
                }
            }
        });

        self.current = Some(cancel_tx);
    }
}
