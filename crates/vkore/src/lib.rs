//! # vkore
//!
//! Resource orchestration core of a GPU compute runtime.
//!
//! Provides:
//! - Device context acquisition: self-created or adopted from the caller, with explicit
//!   per-handle ownership
//! - Compute queue provisioning
//! - A factory for tensors, algorithms and sequences bound to one device context
//! - Non-owning resource tracking with generation-tagged slots: `clear()` reclaims
//!   bookkeeping for resources that already died, `destroy()` tears everything down
//!
//! The native GPU API is reached through [`vkore_driver::Driver`]; enable the `vulkan`
//! feature for the `ash`-based backend.

pub mod error;
pub mod config;
pub mod context;
pub mod queue;
pub mod arena;
pub mod registry;
pub mod dtype;
pub mod constants;
pub mod tensor;
pub mod algorithm;
pub mod sequence;
pub mod manager;
pub mod prelude;

pub use algorithm::{Algorithm, AlgorithmDesc, Workgroup};
pub use arena::{ManagedResource, ResourceArena, ResourceKind, SharedArena, SlotKey};
pub use config::{ManagerConfig, DEFAULT_SESSION};
pub use constants::Constants;
pub use context::{DeviceContext, Ownership, PhysicalDeviceInfo};
pub use dtype::{Element, TensorDataType};
pub use error::{ErrorKind, VkoreError};
pub use manager::{AdoptedHandles, Manager, ManagerState};
pub use queue::Queue;
pub use registry::{DrainStats, ResourceRegistry};
pub use sequence::Sequence;
pub use tensor::{Tensor, TensorType};

pub type Result<T> = std::result::Result<T, VkoreError>;
