//! # vkore-driver
//!
//! Native GPU driver boundary for vkore.
//!
//! Provides:
//! - Typed, copyable handles for instance / physical device / device / queue objects
//! - The [`Driver`] trait: the only surface the orchestrator uses to touch the GPU API
//! - `HostDriver` (behind the `host` feature flag): an in-process emulation of the Vulkan
//!   object model with an audit trail, for tests and CPU-only environments
//! - [`VulkanDriver`] (behind the `vulkan` feature flag): `ash`-based Vulkan backend,
//!   loading `libvulkan` at runtime

pub mod error;
pub mod handle;
pub mod types;
pub mod driver;

#[cfg(any(test, feature = "host"))]
pub mod host;

#[cfg(feature = "vulkan")]
pub mod vulkan;

pub use driver::Driver;
pub use error::{DriverError, DriverResult};
pub use handle::{
    BufferHandle, CommandPoolHandle, DeviceHandle, InstanceHandle, MemoryHandle,
    PhysicalDeviceHandle, QueryPoolHandle, QueueHandle, ShaderModuleHandle,
};
#[cfg(any(test, feature = "host"))]
pub use host::{HostDeviceSpec, HostDriver, ObjectKind};
pub use types::{
    DeviceDesc, DeviceType, InstanceDesc, MemoryLocation, PhysicalDeviceProperties,
    QueueFamilyProperties, QueueFlags, DEBUG_UTILS_EXTENSION, VALIDATION_LAYER,
};

#[cfg(feature = "vulkan")]
pub use vulkan::VulkanDriver;
