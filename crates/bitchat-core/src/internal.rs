//! Crate-internal re-exports shared across modules that would otherwise
//! need to reach into sibling modules directly.

pub use crate::errors::SessionError;
pub use crate::protocol::crypto::NoiseKeyPair;
pub use crate::protocol::session::{NoiseSession, SessionState};
pub use crate::types::{Fingerprint, TimeSource};

#[cfg(feature = "task-logging")]
pub use crate::task_logging::LogLevel;
