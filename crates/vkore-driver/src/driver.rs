//! The native GPU API boundary.
//!
//! The orchestrator never calls the GPU API directly; every object it creates or releases
//! goes through a [`Driver`]. Implementations must follow the native object-lifetime rules:
//! a child object is destroyed before its parent, and a handle is destroyed at most once.

use std::fmt;

use crate::error::DriverResult;
use crate::handle::{
    BufferHandle, CommandPoolHandle, DeviceHandle, InstanceHandle, MemoryHandle,
    PhysicalDeviceHandle, QueryPoolHandle, QueueHandle, ShaderModuleHandle,
};
use crate::types::{
    DeviceDesc, InstanceDesc, MemoryLocation, PhysicalDeviceProperties, QueueFamilyProperties,
};

/// Instance, device and resource primitives of a compute-capable GPU API.
///
/// Destroy operations are infallible; an implementation logs and ignores handles it does
/// not know about.
pub trait Driver: Send + Sync + fmt::Debug {
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;

    // ---------------------------------------------------------------------------
    // Instance and physical devices
    // ---------------------------------------------------------------------------

    /// Instance layers the loader can enable.
    fn available_layers(&self) -> DriverResult<Vec<String>>;

    /// Instance extensions the loader can enable.
    fn available_instance_extensions(&self) -> DriverResult<Vec<String>>;

    fn create_instance(&self, desc: &InstanceDesc) -> DriverResult<InstanceHandle>;

    /// Register a caller-created instance so that later calls can use it.
    ///
    /// Imports are counted; each one is paired with a
    /// [`release_instance_import`](Driver::release_instance_import).
    fn import_instance(&self, instance: InstanceHandle) -> DriverResult<()>;

    /// Drop one import of a caller-created instance. The instance itself stays alive.
    fn release_instance_import(&self, instance: InstanceHandle);

    fn destroy_instance(&self, instance: InstanceHandle);

    fn enumerate_physical_devices(
        &self,
        instance: InstanceHandle,
    ) -> DriverResult<Vec<PhysicalDeviceHandle>>;

    fn physical_device_properties(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
    ) -> DriverResult<PhysicalDeviceProperties>;

    fn queue_family_properties(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
    ) -> DriverResult<Vec<QueueFamilyProperties>>;

    fn device_extensions(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
    ) -> DriverResult<Vec<String>>;

    // ---------------------------------------------------------------------------
    // Logical devices and queues
    // ---------------------------------------------------------------------------

    fn create_device(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
        desc: &DeviceDesc,
    ) -> DriverResult<DeviceHandle>;

    /// Register a caller-created logical device so that later calls can use it.
    ///
    /// `enabled_queue_families` are the families the device was created with; queues are
    /// only retrieved from those. Paired with
    /// [`release_device_import`](Driver::release_device_import).
    fn import_device(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
        device: DeviceHandle,
        enabled_queue_families: &[u32],
    ) -> DriverResult<()>;

    /// Drop one import of a caller-created device. The device itself stays alive.
    fn release_device_import(&self, device: DeviceHandle);

    fn destroy_device(&self, device: DeviceHandle);

    /// Queue `queue_index` of an enabled family. Families the device was not created with
    /// are rejected with `QueueFamilyNotEnabled` before reaching the native API.
    fn get_queue(
        &self,
        device: DeviceHandle,
        family_index: u32,
        queue_index: u32,
    ) -> DriverResult<QueueHandle>;

    fn device_wait_idle(&self, device: DeviceHandle) -> DriverResult<()>;

    // ---------------------------------------------------------------------------
    // Resource primitives
    // ---------------------------------------------------------------------------

    /// Create a storage buffer of `size` bytes bound to freshly allocated memory.
    fn create_buffer(
        &self,
        device: DeviceHandle,
        size: u64,
        location: MemoryLocation,
    ) -> DriverResult<(BufferHandle, MemoryHandle)>;

    /// Copy `data` into host-visible memory at `offset`.
    fn write_memory(
        &self,
        device: DeviceHandle,
        memory: MemoryHandle,
        offset: u64,
        data: &[u8],
    ) -> DriverResult<()>;

    /// Destroy a buffer and free its memory.
    fn destroy_buffer(&self, device: DeviceHandle, buffer: BufferHandle, memory: MemoryHandle);

    fn create_shader_module(
        &self,
        device: DeviceHandle,
        spirv: &[u32],
    ) -> DriverResult<ShaderModuleHandle>;

    fn destroy_shader_module(&self, device: DeviceHandle, module: ShaderModuleHandle);

    fn create_command_pool(
        &self,
        device: DeviceHandle,
        family_index: u32,
    ) -> DriverResult<CommandPoolHandle>;

    fn destroy_command_pool(&self, device: DeviceHandle, pool: CommandPoolHandle);

    /// Create a timestamp query pool with `query_count` slots.
    fn create_timestamp_pool(
        &self,
        device: DeviceHandle,
        query_count: u32,
    ) -> DriverResult<QueryPoolHandle>;

    fn destroy_query_pool(&self, device: DeviceHandle, pool: QueryPoolHandle);
}
