//! Error types for the Nebula graphics abstraction
//!
//! This module defines the error taxonomy used throughout the crate and by
//! backend implementations: caller misuse, native-API failures, and
//! synchronization failures.

use thiserror::Error;

/// Result type for Nebula graphics operations
pub type Result<T> = std::result::Result<T, Error>;

/// Nebula graphics errors
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// API misuse the caller was expected to prevent structurally
    /// (draw without a bound render pass, double-begin of a recording,
    /// mismatched input-set pairing, etc.). Fatal, never retried.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// A null or freed handle was passed to the backend
    #[error("Invalid {kind} handle")]
    InvalidHandle {
        /// Entity kind the handle was supposed to refer to
        kind: &'static str,
    },

    /// Backend-specific error (Vulkan, etc.)
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Out of GPU memory
    #[error("Out of GPU memory")]
    OutOfMemory,

    /// Requested pixel format is not supported by the device
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Initialization failed (instance, device, subsystems)
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// A blocking wait on bounded GPU work timed out; device and host state
    /// are no longer trusted to be consistent. Fatal.
    #[error("Synchronization failure: {0}")]
    SyncTimeout(String),
}
