//! In-process emulation of the native GPU object model.
//!
//! `HostDriver` hands out handles for instances, physical devices, logical devices, queues and
//! resources exactly as a real driver would, backs buffer memory with host `Vec<u8>`s, and
//! enforces a per-device memory budget. It also keeps an audit trail (destroy counts, invalid
//! destroys, children leaked by a parent's destruction) so that object-lifetime rules can be
//! checked without GPU hardware.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::driver::Driver;
use crate::error::{DriverError, DriverResult};
use crate::handle::{
    BufferHandle, CommandPoolHandle, DeviceHandle, InstanceHandle, MemoryHandle,
    PhysicalDeviceHandle, QueryPoolHandle, QueueHandle, ShaderModuleHandle,
};
use crate::types::{
    DeviceDesc, DeviceType, InstanceDesc, MemoryLocation, PhysicalDeviceProperties,
    QueueFamilyProperties, QueueFlags, DEBUG_UTILS_EXTENSION, VALIDATION_LAYER,
};

/// Object categories tracked by the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Instance,
    Device,
    Buffer,
    Memory,
    ShaderModule,
    CommandPool,
    QueryPool,
}

/// Description of one emulated physical device.
#[derive(Debug, Clone)]
pub struct HostDeviceSpec {
    pub properties: PhysicalDeviceProperties,
    pub queue_families: Vec<QueueFamilyProperties>,
    pub extensions: Vec<String>,
    /// Bytes of buffer memory the device will hand out before reporting out-of-memory.
    pub memory_budget: u64,
}

impl HostDeviceSpec {
    /// A discrete GPU with one graphics+compute family and one async-compute family.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            properties: PhysicalDeviceProperties {
                device_name: name.into(),
                device_type: DeviceType::DiscreteGpu,
                vendor_id: 0x1d0f,
                device_id: 0x0001,
                api_version: PhysicalDeviceProperties::make_api_version(1, 2, 0),
                driver_version: 1,
                max_compute_workgroup_count: [65535, 65535, 65535],
                max_compute_workgroup_size: [1024, 1024, 64],
                max_compute_workgroup_invocations: 1024,
                timestamp_period: 1.0,
            },
            queue_families: vec![
                QueueFamilyProperties {
                    flags: QueueFlags::GRAPHICS | QueueFlags::COMPUTE | QueueFlags::TRANSFER,
                    queue_count: 1,
                    timestamp_valid_bits: 64,
                },
                QueueFamilyProperties {
                    flags: QueueFlags::COMPUTE | QueueFlags::TRANSFER,
                    queue_count: 2,
                    timestamp_valid_bits: 64,
                },
            ],
            extensions: vec![
                "VK_KHR_storage_buffer_storage_class".to_string(),
                "VK_KHR_shader_non_semantic_info".to_string(),
            ],
            memory_budget: 256 * 1024 * 1024,
        }
    }

    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.properties.device_type = device_type;
        self
    }

    pub fn with_queue_families(mut self, families: Vec<QueueFamilyProperties>) -> Self {
        self.queue_families = families;
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = bytes;
        self
    }
}

/// Emulated driver. See the module documentation.
#[derive(Debug)]
pub struct HostDriver {
    specs: Vec<HostDeviceSpec>,
    layers: Vec<String>,
    instance_extensions: Vec<String>,
    state: Mutex<HostState>,
}

#[derive(Debug, Default)]
struct HostState {
    next_handle: u64,
    instances: HashMap<u64, InstanceRecord>,
    physical: HashMap<u64, PhysicalRecord>,
    devices: HashMap<u64, DeviceRecord>,
    buffers: HashMap<u64, BufferRecord>,
    memories: HashMap<u64, MemoryRecord>,
    /// Child object → owning device.
    shader_modules: HashMap<u64, u64>,
    command_pools: HashMap<u64, u64>,
    query_pools: HashMap<u64, u64>,
    destroyed: HashMap<ObjectKind, usize>,
    invalid_destroys: usize,
    leaked_children: usize,
}

#[derive(Debug)]
struct InstanceRecord {
    /// Physical-device handles enumerated for this instance.
    physical: Vec<u64>,
    desc: InstanceDesc,
    imports: usize,
}

#[derive(Debug)]
struct PhysicalRecord {
    instance: u64,
    spec: usize,
}

#[derive(Debug)]
struct DeviceRecord {
    instance: u64,
    spec: usize,
    families: Vec<u32>,
    queues: HashMap<(u32, u32), u64>,
    allocated: u64,
    imports: usize,
}

#[derive(Debug)]
struct BufferRecord {
    device: u64,
    memory: u64,
}

#[derive(Debug)]
struct MemoryRecord {
    device: u64,
    location: MemoryLocation,
    bytes: Vec<u8>,
}

impl Default for HostDriver {
    fn default() -> Self {
        Self::new(vec![HostDeviceSpec::new("vkore host device")])
    }
}

impl HostState {
    fn alloc_handle(&mut self) -> u64 {
        // Handles are never reused, so stale handles stay detectable.
        self.next_handle += 1;
        0x1000 + self.next_handle
    }

    fn record_destroy(&mut self, kind: ObjectKind) {
        *self.destroyed.entry(kind).or_insert(0) += 1;
    }

    fn invalid_destroy(&mut self, kind: &'static str, raw: u64) {
        tracing::error!("host driver: destroy of unknown {} {:#x}", kind, raw);
        self.invalid_destroys += 1;
    }

    fn device(&self, device: DeviceHandle) -> DriverResult<&DeviceRecord> {
        self.devices.get(&device.as_raw()).ok_or(DriverError::UnknownHandle {
            kind: DeviceHandle::KIND,
            raw: device.as_raw(),
        })
    }

    fn physical(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
    ) -> DriverResult<&PhysicalRecord> {
        if !self.instances.contains_key(&instance.as_raw()) {
            return Err(DriverError::UnknownHandle {
                kind: InstanceHandle::KIND,
                raw: instance.as_raw(),
            });
        }
        match self.physical.get(&physical_device.as_raw()) {
            Some(rec) if rec.instance == instance.as_raw() => Ok(rec),
            _ => Err(DriverError::UnknownHandle {
                kind: PhysicalDeviceHandle::KIND,
                raw: physical_device.as_raw(),
            }),
        }
    }

    fn children_of(&self, device: u64) -> usize {
        self.buffers.values().filter(|b| b.device == device).count()
            + self.memories.values().filter(|m| m.device == device).count()
            + self.shader_modules.values().filter(|&&d| d == device).count()
            + self.command_pools.values().filter(|&&d| d == device).count()
            + self.query_pools.values().filter(|&&d| d == device).count()
    }
}

impl HostDriver {
    /// Create a driver exposing the given physical devices, in enumeration order.
    ///
    /// The loader offers the Khronos validation layer and `VK_EXT_debug_utils`.
    pub fn new(specs: Vec<HostDeviceSpec>) -> Self {
        Self {
            specs,
            layers: vec![VALIDATION_LAYER.to_string()],
            instance_extensions: vec![DEBUG_UTILS_EXTENSION.to_string()],
            state: Mutex::new(HostState::default()),
        }
    }

    pub fn with_instance_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers = layers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_instance_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instance_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Number of physical devices every instance enumerates.
    pub fn physical_device_count(&self) -> usize {
        self.specs.len()
    }

    /// How many objects of `kind` have been destroyed so far.
    pub fn destroyed(&self, kind: ObjectKind) -> usize {
        self.state.lock().destroyed.get(&kind).copied().unwrap_or(0)
    }

    /// How many objects of `kind` are currently alive.
    pub fn live(&self, kind: ObjectKind) -> usize {
        let state = self.state.lock();
        match kind {
            ObjectKind::Instance => state.instances.len(),
            ObjectKind::Device => state.devices.len(),
            ObjectKind::Buffer => state.buffers.len(),
            ObjectKind::Memory => state.memories.len(),
            ObjectKind::ShaderModule => state.shader_modules.len(),
            ObjectKind::CommandPool => state.command_pools.len(),
            ObjectKind::QueryPool => state.query_pools.len(),
        }
    }

    pub fn is_instance_live(&self, instance: InstanceHandle) -> bool {
        self.state.lock().instances.contains_key(&instance.as_raw())
    }

    pub fn is_device_live(&self, device: DeviceHandle) -> bool {
        self.state.lock().devices.contains_key(&device.as_raw())
    }

    /// Parameters a live instance was created with.
    pub fn instance_desc(&self, instance: InstanceHandle) -> Option<InstanceDesc> {
        self.state
            .lock()
            .instances
            .get(&instance.as_raw())
            .map(|rec| rec.desc.clone())
    }

    /// Imports of instances and devices not yet released.
    pub fn outstanding_imports(&self) -> usize {
        let state = self.state.lock();
        state.instances.values().map(|i| i.imports).sum::<usize>()
            + state.devices.values().map(|d| d.imports).sum::<usize>()
    }

    /// Destroy calls that named an unknown (or already destroyed) handle.
    pub fn invalid_destroys(&self) -> usize {
        self.state.lock().invalid_destroys
    }

    /// Child objects that were still alive when their parent was destroyed.
    pub fn leaked_children(&self) -> usize {
        self.state.lock().leaked_children
    }

    /// Bytes of buffer memory currently allocated on `device`.
    pub fn allocated_bytes(&self, device: DeviceHandle) -> u64 {
        self.state
            .lock()
            .devices
            .get(&device.as_raw())
            .map(|d| d.allocated)
            .unwrap_or(0)
    }

    /// Snapshot of a memory allocation's contents.
    pub fn memory_contents(&self, memory: MemoryHandle) -> Option<Vec<u8>> {
        self.state
            .lock()
            .memories
            .get(&memory.as_raw())
            .map(|m| m.bytes.clone())
    }
}

impl Driver for HostDriver {
    fn name(&self) -> &'static str {
        "host"
    }

    fn available_layers(&self) -> DriverResult<Vec<String>> {
        Ok(self.layers.clone())
    }

    fn available_instance_extensions(&self) -> DriverResult<Vec<String>> {
        Ok(self.instance_extensions.clone())
    }

    fn create_instance(&self, desc: &InstanceDesc) -> DriverResult<InstanceHandle> {
        if let Some(layer) = desc.layers.iter().find(|l| !self.layers.contains(l)) {
            return Err(DriverError::InvalidArgument(format!(
                "layer '{}' not present",
                layer
            )));
        }
        if let Some(ext) = desc
            .extensions
            .iter()
            .find(|e| !self.instance_extensions.contains(e))
        {
            return Err(DriverError::InvalidArgument(format!(
                "instance extension '{}' not present",
                ext
            )));
        }
        if desc.debug_messenger && !desc.extensions.iter().any(|e| e == DEBUG_UTILS_EXTENSION) {
            return Err(DriverError::InvalidArgument(format!(
                "debug messenger requires {}",
                DEBUG_UTILS_EXTENSION
            )));
        }

        let mut state = self.state.lock();
        let instance = state.alloc_handle();
        let mut physical = Vec::with_capacity(self.specs.len());
        for spec in 0..self.specs.len() {
            let handle = state.alloc_handle();
            state.physical.insert(handle, PhysicalRecord { instance, spec });
            physical.push(handle);
        }
        state.instances.insert(
            instance,
            InstanceRecord {
                physical,
                desc: desc.clone(),
                imports: 0,
            },
        );
        tracing::trace!(
            "host driver: instance {:#x} for '{}'",
            instance,
            desc.application_name
        );
        Ok(InstanceHandle::from_raw(instance))
    }

    fn import_instance(&self, instance: InstanceHandle) -> DriverResult<()> {
        let mut state = self.state.lock();
        match state.instances.get_mut(&instance.as_raw()) {
            Some(rec) => {
                rec.imports += 1;
                Ok(())
            }
            None => Err(DriverError::UnknownHandle {
                kind: InstanceHandle::KIND,
                raw: instance.as_raw(),
            }),
        }
    }

    fn release_instance_import(&self, instance: InstanceHandle) {
        let mut state = self.state.lock();
        match state.instances.get_mut(&instance.as_raw()) {
            Some(rec) if rec.imports > 0 => rec.imports -= 1,
            _ => state.invalid_destroy("instance import", instance.as_raw()),
        }
    }

    fn destroy_instance(&self, instance: InstanceHandle) {
        let mut state = self.state.lock();
        let raw = instance.as_raw();
        let Some(record) = state.instances.remove(&raw) else {
            state.invalid_destroy(InstanceHandle::KIND, raw);
            return;
        };
        for handle in record.physical {
            state.physical.remove(&handle);
        }
        let orphans = state.devices.values().filter(|d| d.instance == raw).count();
        if orphans > 0 {
            tracing::warn!("host driver: instance {:#x} destroyed with {} live devices", raw, orphans);
            state.leaked_children += orphans;
        }
        state.record_destroy(ObjectKind::Instance);
    }

    fn enumerate_physical_devices(
        &self,
        instance: InstanceHandle,
    ) -> DriverResult<Vec<PhysicalDeviceHandle>> {
        let state = self.state.lock();
        state
            .instances
            .get(&instance.as_raw())
            .map(|rec| {
                rec.physical
                    .iter()
                    .map(|&h| PhysicalDeviceHandle::from_raw(h))
                    .collect()
            })
            .ok_or(DriverError::UnknownHandle {
                kind: InstanceHandle::KIND,
                raw: instance.as_raw(),
            })
    }

    fn physical_device_properties(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
    ) -> DriverResult<PhysicalDeviceProperties> {
        let state = self.state.lock();
        let rec = state.physical(instance, physical_device)?;
        Ok(self.specs[rec.spec].properties.clone())
    }

    fn queue_family_properties(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
    ) -> DriverResult<Vec<QueueFamilyProperties>> {
        let state = self.state.lock();
        let rec = state.physical(instance, physical_device)?;
        Ok(self.specs[rec.spec].queue_families.clone())
    }

    fn device_extensions(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
    ) -> DriverResult<Vec<String>> {
        let state = self.state.lock();
        let rec = state.physical(instance, physical_device)?;
        Ok(self.specs[rec.spec].extensions.clone())
    }

    fn create_device(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
        desc: &DeviceDesc,
    ) -> DriverResult<DeviceHandle> {
        let mut state = self.state.lock();
        let spec_idx = state.physical(instance, physical_device)?.spec;
        let spec = &self.specs[spec_idx];

        for &family in &desc.queue_families {
            if family as usize >= spec.queue_families.len() {
                return Err(DriverError::InvalidArgument(format!(
                    "queue family {} does not exist ({} families)",
                    family,
                    spec.queue_families.len()
                )));
            }
        }
        if let Some(ext) = desc.extensions.iter().find(|e| !spec.extensions.contains(e)) {
            return Err(DriverError::InvalidArgument(format!(
                "extension '{}' not supported",
                ext
            )));
        }

        let handle = state.alloc_handle();
        let mut queues = HashMap::new();
        for &family in &desc.queue_families {
            let count = spec.queue_families[family as usize].queue_count;
            for index in 0..count {
                let queue = state.alloc_handle();
                queues.insert((family, index), queue);
            }
        }
        state.devices.insert(
            handle,
            DeviceRecord {
                instance: instance.as_raw(),
                spec: spec_idx,
                families: desc.queue_families.clone(),
                queues,
                allocated: 0,
                imports: 0,
            },
        );
        Ok(DeviceHandle::from_raw(handle))
    }

    fn import_device(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
        device: DeviceHandle,
        enabled_queue_families: &[u32],
    ) -> DriverResult<()> {
        let mut state = self.state.lock();
        let spec = state.physical(instance, physical_device)?.spec;
        let rec = state.device(device)?;
        if rec.instance != instance.as_raw() || rec.spec != spec {
            return Err(DriverError::InvalidArgument(format!(
                "{} was not created from {}",
                device, physical_device
            )));
        }
        if let Some(&family) = enabled_queue_families
            .iter()
            .find(|f| !rec.families.contains(f))
        {
            return Err(DriverError::QueueFamilyNotEnabled { family });
        }
        if let Some(rec) = state.devices.get_mut(&device.as_raw()) {
            rec.imports += 1;
        }
        Ok(())
    }

    fn release_device_import(&self, device: DeviceHandle) {
        let mut state = self.state.lock();
        match state.devices.get_mut(&device.as_raw()) {
            Some(rec) if rec.imports > 0 => rec.imports -= 1,
            _ => state.invalid_destroy("device import", device.as_raw()),
        }
    }

    fn destroy_device(&self, device: DeviceHandle) {
        let mut state = self.state.lock();
        let raw = device.as_raw();
        if state.devices.remove(&raw).is_none() {
            state.invalid_destroy(DeviceHandle::KIND, raw);
            return;
        }
        let orphans = state.children_of(raw);
        if orphans > 0 {
            tracing::warn!("host driver: device {:#x} destroyed with {} live children", raw, orphans);
            state.leaked_children += orphans;
            state.buffers.retain(|_, b| b.device != raw);
            state.memories.retain(|_, m| m.device != raw);
            state.shader_modules.retain(|_, d| *d != raw);
            state.command_pools.retain(|_, d| *d != raw);
            state.query_pools.retain(|_, d| *d != raw);
        }
        state.record_destroy(ObjectKind::Device);
    }

    fn get_queue(
        &self,
        device: DeviceHandle,
        family_index: u32,
        queue_index: u32,
    ) -> DriverResult<QueueHandle> {
        let state = self.state.lock();
        let rec = state.device(device)?;
        if !rec.families.contains(&family_index) {
            return Err(DriverError::QueueFamilyNotEnabled {
                family: family_index,
            });
        }
        rec.queues
            .get(&(family_index, queue_index))
            .map(|&q| QueueHandle::from_raw(q))
            .ok_or_else(|| {
                DriverError::InvalidArgument(format!(
                    "queue {} of family {} does not exist",
                    queue_index, family_index
                ))
            })
    }

    fn device_wait_idle(&self, device: DeviceHandle) -> DriverResult<()> {
        // Host work completes synchronously; only validate the handle.
        self.state.lock().device(device).map(|_| ())
    }

    fn create_buffer(
        &self,
        device: DeviceHandle,
        size: u64,
        location: MemoryLocation,
    ) -> DriverResult<(BufferHandle, MemoryHandle)> {
        if size == 0 {
            return Err(DriverError::InvalidArgument(
                "buffer size must be non-zero".into(),
            ));
        }
        let mut state = self.state.lock();
        let rec = state.device(device)?;
        let budget = self.specs[rec.spec].memory_budget;
        if rec.allocated.saturating_add(size) > budget {
            return Err(DriverError::OutOfMemory {
                requested: size,
                context: format!(
                    "{} allocation ({} of {} bytes in use)",
                    location, rec.allocated, budget
                ),
            });
        }
        let len = usize::try_from(size).map_err(|_| DriverError::OutOfMemory {
            requested: size,
            context: "host address space".into(),
        })?;

        let buffer = state.alloc_handle();
        let memory = state.alloc_handle();
        if let Some(rec) = state.devices.get_mut(&device.as_raw()) {
            rec.allocated += size;
        }
        state.memories.insert(
            memory,
            MemoryRecord {
                device: device.as_raw(),
                location,
                bytes: vec![0u8; len],
            },
        );
        state.buffers.insert(
            buffer,
            BufferRecord {
                device: device.as_raw(),
                memory,
            },
        );
        Ok((BufferHandle::from_raw(buffer), MemoryHandle::from_raw(memory)))
    }

    fn write_memory(
        &self,
        device: DeviceHandle,
        memory: MemoryHandle,
        offset: u64,
        data: &[u8],
    ) -> DriverResult<()> {
        let mut state = self.state.lock();
        let rec = state
            .memories
            .get_mut(&memory.as_raw())
            .filter(|m| m.device == device.as_raw())
            .ok_or(DriverError::UnknownHandle {
                kind: MemoryHandle::KIND,
                raw: memory.as_raw(),
            })?;
        if rec.location != MemoryLocation::HostVisible {
            return Err(DriverError::InvalidArgument(format!(
                "{} is not host-visible",
                memory
            )));
        }
        let start = offset as usize;
        let end = start
            .checked_add(data.len())
            .filter(|&end| end <= rec.bytes.len())
            .ok_or_else(|| {
                DriverError::InvalidArgument(format!(
                    "write of {} bytes at offset {} exceeds {} byte allocation",
                    data.len(),
                    offset,
                    rec.bytes.len()
                ))
            })?;
        rec.bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    fn destroy_buffer(&self, device: DeviceHandle, buffer: BufferHandle, memory: MemoryHandle) {
        let mut state = self.state.lock();
        match state.buffers.remove(&buffer.as_raw()) {
            Some(rec) if rec.device == device.as_raw() && rec.memory == memory.as_raw() => {
                state.record_destroy(ObjectKind::Buffer);
            }
            Some(rec) => {
                // Wrong owner: put it back and flag the call.
                state.buffers.insert(buffer.as_raw(), rec);
                state.invalid_destroy(BufferHandle::KIND, buffer.as_raw());
                return;
            }
            None => {
                state.invalid_destroy(BufferHandle::KIND, buffer.as_raw());
                return;
            }
        }
        match state.memories.remove(&memory.as_raw()) {
            Some(mem) => {
                let size = mem.bytes.len() as u64;
                if let Some(dev) = state.devices.get_mut(&device.as_raw()) {
                    dev.allocated = dev.allocated.saturating_sub(size);
                }
                state.record_destroy(ObjectKind::Memory);
            }
            None => state.invalid_destroy(MemoryHandle::KIND, memory.as_raw()),
        }
    }

    fn create_shader_module(
        &self,
        device: DeviceHandle,
        spirv: &[u32],
    ) -> DriverResult<ShaderModuleHandle> {
        const SPIRV_MAGIC: u32 = 0x0723_0203;
        if spirv.first() != Some(&SPIRV_MAGIC) {
            return Err(DriverError::InvalidArgument(
                "shader code does not start with the SPIR-V magic number".into(),
            ));
        }
        let mut state = self.state.lock();
        state.device(device)?;
        let handle = state.alloc_handle();
        state.shader_modules.insert(handle, device.as_raw());
        Ok(ShaderModuleHandle::from_raw(handle))
    }

    fn destroy_shader_module(&self, device: DeviceHandle, module: ShaderModuleHandle) {
        let mut state = self.state.lock();
        match state.shader_modules.remove(&module.as_raw()) {
            Some(owner) if owner == device.as_raw() => state.record_destroy(ObjectKind::ShaderModule),
            _ => state.invalid_destroy(ShaderModuleHandle::KIND, module.as_raw()),
        }
    }

    fn create_command_pool(
        &self,
        device: DeviceHandle,
        family_index: u32,
    ) -> DriverResult<CommandPoolHandle> {
        let mut state = self.state.lock();
        if !state.device(device)?.families.contains(&family_index) {
            return Err(DriverError::QueueFamilyNotEnabled {
                family: family_index,
            });
        }
        let handle = state.alloc_handle();
        state.command_pools.insert(handle, device.as_raw());
        Ok(CommandPoolHandle::from_raw(handle))
    }

    fn destroy_command_pool(&self, device: DeviceHandle, pool: CommandPoolHandle) {
        let mut state = self.state.lock();
        match state.command_pools.remove(&pool.as_raw()) {
            Some(owner) if owner == device.as_raw() => state.record_destroy(ObjectKind::CommandPool),
            _ => state.invalid_destroy(CommandPoolHandle::KIND, pool.as_raw()),
        }
    }

    fn create_timestamp_pool(
        &self,
        device: DeviceHandle,
        query_count: u32,
    ) -> DriverResult<QueryPoolHandle> {
        if query_count == 0 {
            return Err(DriverError::InvalidArgument(
                "query pool needs at least one slot".into(),
            ));
        }
        let mut state = self.state.lock();
        state.device(device)?;
        let handle = state.alloc_handle();
        state.query_pools.insert(handle, device.as_raw());
        Ok(QueryPoolHandle::from_raw(handle))
    }

    fn destroy_query_pool(&self, device: DeviceHandle, pool: QueryPoolHandle) {
        let mut state = self.state.lock();
        match state.query_pools.remove(&pool.as_raw()) {
            Some(owner) if owner == device.as_raw() => state.record_destroy(ObjectKind::QueryPool),
            _ => state.invalid_destroy(QueryPoolHandle::KIND, pool.as_raw()),
        }
    }
}
