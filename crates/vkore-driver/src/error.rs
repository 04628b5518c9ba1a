//! Driver-level errors.

use crate::types::MemoryLocation;

/// Errors reported by a [`Driver`](crate::Driver) implementation.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("GPU driver not available: {0}")]
    Unavailable(String),

    #[error("unknown {kind} handle {raw:#x}")]
    UnknownHandle { kind: &'static str, raw: u64 },

    #[error("out of memory in {context}: requested {requested} bytes")]
    OutOfMemory { requested: u64, context: String },

    #[error("no memory type satisfies {0} allocation")]
    NoMemoryType(MemoryLocation),

    #[error("queue family {family} was not enabled on the device")]
    QueueFamilyNotEnabled { family: u32 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("API error {code} in {context}")]
    Api { code: i32, context: String },
}

impl DriverError {
    /// Whether this error reports host or device memory exhaustion.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, DriverError::OutOfMemory { .. })
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;
