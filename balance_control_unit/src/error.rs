//! Error types of the control unit.
//!
//! Only startup can fail with an `Err`. Runtime safety faults are handled by
//! the supervisor as [`DisengageReason`](crate::supervisor::DisengageReason)s
//! and never cross execution contexts.

use balance_common::config::ConfigError;
use balance_common::hal::driver::HalError;
use thiserror::Error;

/// Startup and scheduling failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("hardware: {0}")]
    Hal(#[from] HalError),

    #[error("failed to spawn {context} context: {source}")]
    Spawn {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("RT setup error: {0}")]
    RtSetup(String),

    #[error("signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

/// The start sequence was interrupted because the robot left RUNNING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("start condition wait aborted")]
pub struct StartAborted;
