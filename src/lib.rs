// Library exports for testing

pub mod app;
pub mod document;
pub mod install;
pub mod protocol;
pub mod worker;

// Re-export commonly used types for tests
pub use app::MorphApp;
pub use protocol::{InboundEvent, SyncMessage};
pub use worker::session::WorkerSession;
