//! Error types for the orchestration core.

use vkore_driver::DriverError;

use crate::arena::ResourceKind;

/// Broad classification of a [`VkoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid device selection, queue family or extension; fix the configuration and
    /// construct a new manager.
    Configuration,
    /// The caller used the API incorrectly (e.g. after `destroy()`).
    Usage,
    /// GPU or host memory was exhausted; the caller may free resources and retry.
    ResourceExhaustion,
    /// Any other failure reported by the driver.
    Backend,
}

#[derive(Debug, thiserror::Error)]
pub enum VkoreError {
    #[error("physical device index {index} out of range ({available} devices available)")]
    PhysicalDeviceOutOfRange { index: u32, available: usize },

    #[error("queue family {family} not present on device ({available} families)")]
    QueueFamilyMissing { family: u32, available: usize },

    #[error("queue family {family} does not support compute")]
    QueueFamilyNotCompute { family: u32 },

    #[error("queue family {family} is not enabled on the device")]
    QueueFamilyNotEnabled { family: u32 },

    #[error("device exposes no compute-capable queue family")]
    NoComputeQueue,

    #[error("device extension '{0}' is not supported")]
    ExtensionUnsupported(String),

    #[error("instance layer '{0}' is not available")]
    LayerUnsupported(String),

    #[error("instance extension '{0}' is not available")]
    InstanceExtensionUnsupported(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("manager has been destroyed")]
    Destroyed,

    #[error("queue index {index} out of range ({available} queues provisioned)")]
    QueueIndexOutOfRange { index: u32, available: usize },

    #[error("queue family {family} does not support timestamps")]
    TimestampsUnsupported { family: u32 },

    #[error("invalid tensor data: {0}")]
    InvalidTensorData(String),

    #[error("invalid constants: {0}")]
    InvalidConstants(String),

    #[error("invalid workgroup {0:?}: every dimension must be non-zero")]
    InvalidWorkgroup([u32; 3]),

    #[error("{kind} belongs to a different manager")]
    ForeignResource { kind: ResourceKind },

    #[error("{kind} has already been destroyed")]
    ResourceDestroyed { kind: ResourceKind },

    #[error("GPU out of memory: {0}")]
    OutOfMemory(#[source] DriverError),

    #[error("driver error: {0}")]
    Driver(#[source] DriverError),
}

impl VkoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VkoreError::PhysicalDeviceOutOfRange { .. }
            | VkoreError::QueueFamilyMissing { .. }
            | VkoreError::QueueFamilyNotCompute { .. }
            | VkoreError::QueueFamilyNotEnabled { .. }
            | VkoreError::NoComputeQueue
            | VkoreError::ExtensionUnsupported(_)
            | VkoreError::LayerUnsupported(_)
            | VkoreError::InstanceExtensionUnsupported(_)
            | VkoreError::InvalidConfig(_) => ErrorKind::Configuration,
            VkoreError::Destroyed
            | VkoreError::QueueIndexOutOfRange { .. }
            | VkoreError::TimestampsUnsupported { .. }
            | VkoreError::InvalidTensorData(_)
            | VkoreError::InvalidConstants(_)
            | VkoreError::InvalidWorkgroup(_)
            | VkoreError::ForeignResource { .. }
            | VkoreError::ResourceDestroyed { .. } => ErrorKind::Usage,
            VkoreError::OutOfMemory(_) => ErrorKind::ResourceExhaustion,
            VkoreError::Driver(_) => ErrorKind::Backend,
        }
    }
}

impl From<DriverError> for VkoreError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::QueueFamilyNotEnabled { family } => {
                VkoreError::QueueFamilyNotEnabled { family }
            }
            err if err.is_out_of_memory() => VkoreError::OutOfMemory(err),
            err => VkoreError::Driver(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_oom_is_exhaustion() {
        let err: VkoreError = DriverError::OutOfMemory {
            requested: 64,
            context: "test".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ResourceExhaustion);

        let err: VkoreError = DriverError::Unavailable("no loader".into()).into();
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[test]
    fn test_family_not_enabled_is_configuration() {
        let err: VkoreError = DriverError::QueueFamilyNotEnabled { family: 2 }.into();
        assert!(matches!(err, VkoreError::QueueFamilyNotEnabled { family: 2 }));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            VkoreError::PhysicalDeviceOutOfRange { index: 3, available: 1 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(VkoreError::Destroyed.kind(), ErrorKind::Usage);
        assert_eq!(
            format!("{}", VkoreError::ForeignResource { kind: ResourceKind::Tensor }),
            "tensor belongs to a different manager"
        );
    }
}
