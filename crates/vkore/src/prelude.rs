//! Convenience re-exports.
//!
//! ```ignore
//! use vkore::prelude::*;
//! ```

pub use crate::{
    Algorithm, AlgorithmDesc, Constants, Element, ManagedResource, Manager, ManagerConfig,
    ResourceKind, Sequence, Tensor, TensorDataType, TensorType, VkoreError, Workgroup,
    DEFAULT_SESSION,
};
pub use vkore_driver::Driver;
#[cfg(feature = "host")]
pub use vkore_driver::HostDriver;
