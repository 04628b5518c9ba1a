//! Vulkan backend built on `ash`.
//!
//! `libvulkan` is loaded at runtime (no build-time Vulkan SDK dependency). The driver keeps
//! the function tables for every instance and device it created or imported, keyed by raw
//! handle, so the rest of the stack can pass plain handles around. Imported handles are
//! reference counted and their tables dropped once every import is released.

use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr, CString};
use std::fmt;

use ash::vk::{self, Handle};
use parking_lot::RwLock;

use crate::driver::Driver;
use crate::error::{DriverError, DriverResult};
use crate::handle::{
    BufferHandle, CommandPoolHandle, DeviceHandle, InstanceHandle, MemoryHandle,
    PhysicalDeviceHandle, QueryPoolHandle, QueueHandle, ShaderModuleHandle,
};
use crate::types::{
    DeviceDesc, DeviceType, InstanceDesc, MemoryLocation, PhysicalDeviceProperties,
    QueueFamilyProperties, QueueFlags,
};

/// Vulkan driver backed by the system loader.
pub struct VulkanDriver {
    entry: ash::Entry,
    instances: RwLock<HashMap<u64, InstanceState>>,
    devices: RwLock<HashMap<u64, DeviceState>>,
}

struct InstanceState {
    instance: ash::Instance,
    messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    /// Created by this driver, as opposed to imported.
    owned: bool,
    imports: usize,
}

#[derive(Clone)]
struct DeviceState {
    device: ash::Device,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Families with one queue enabled at device creation.
    queue_families: Vec<u32>,
    owned: bool,
    imports: usize,
}

impl fmt::Debug for VulkanDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VulkanDriver")
            .field("instances", &self.instances.read().len())
            .field("devices", &self.devices.read().len())
            .finish()
    }
}

fn vk_error(result: vk::Result, context: &str) -> DriverError {
    vk_alloc_error(result, 0, context)
}

fn vk_alloc_error(result: vk::Result, requested: u64, context: &str) -> DriverError {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            DriverError::OutOfMemory {
                requested,
                context: context.to_string(),
            }
        }
        other => DriverError::Api {
            code: other.as_raw(),
            context: context.to_string(),
        },
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() || (*data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*data).p_message).to_string_lossy();
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        tracing::error!(target: "vkore::validation", "{}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!(target: "vkore::validation", "{}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        tracing::info!(target: "vkore::validation", "{}", message);
    } else {
        tracing::trace!(target: "vkore::validation", "{}", message);
    }
    vk::FALSE
}

fn to_cstrings(names: &[String]) -> DriverResult<Vec<CString>> {
    names
        .iter()
        .map(|n| {
            CString::new(n.as_str())
                .map_err(|_| DriverError::InvalidArgument(format!("name '{}' contains NUL", n)))
        })
        .collect()
}

/// Read a fixed-size, NUL-terminated name array.
fn fixed_name(raw: &[c_char]) -> String {
    if !raw.contains(&0) {
        return String::new();
    }
    // Safety: the array contains a NUL terminator within bounds.
    unsafe { CStr::from_ptr(raw.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    wanted: vk::MemoryPropertyFlags,
) -> Option<u32> {
    let count = props.memory_type_count as usize;
    props.memory_types[..count]
        .iter()
        .enumerate()
        .find(|(i, ty)| type_bits & (1 << i) != 0 && ty.property_flags.contains(wanted))
        .map(|(i, _)| i as u32)
}

impl VulkanDriver {
    /// Load the system Vulkan loader.
    pub fn new() -> DriverResult<Self> {
        // Safety: the loader library is kept alive by `Entry` for the driver's lifetime.
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| DriverError::Unavailable(format!("loading libvulkan: {}", e)))?;
        Ok(Self {
            entry,
            instances: RwLock::new(HashMap::new()),
            devices: RwLock::new(HashMap::new()),
        })
    }

    fn instance(&self, instance: InstanceHandle) -> DriverResult<ash::Instance> {
        self.instances
            .read()
            .get(&instance.as_raw())
            .map(|state| state.instance.clone())
            .ok_or(DriverError::UnknownHandle {
                kind: InstanceHandle::KIND,
                raw: instance.as_raw(),
            })
    }

    fn device(&self, device: DeviceHandle) -> DriverResult<DeviceState> {
        self.devices
            .read()
            .get(&device.as_raw())
            .cloned()
            .ok_or(DriverError::UnknownHandle {
                kind: DeviceHandle::KIND,
                raw: device.as_raw(),
            })
    }

    fn create_messenger(
        &self,
        instance: &ash::Instance,
    ) -> Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let loader = ash::ext::debug_utils::Instance::new(&self.entry, instance);
        let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));
        match unsafe { loader.create_debug_utils_messenger(&info, None) } {
            Ok(messenger) => Some((loader, messenger)),
            Err(e) => {
                tracing::warn!("vulkan: debug messenger unavailable ({:?})", e);
                None
            }
        }
    }
}

fn destroy_instance_state(state: InstanceState) {
    unsafe {
        if let Some((loader, messenger)) = state.messenger {
            loader.destroy_debug_utils_messenger(messenger, None);
        }
        state.instance.destroy_instance(None);
    }
}

impl Driver for VulkanDriver {
    fn name(&self) -> &'static str {
        "vulkan"
    }

    fn available_layers(&self) -> DriverResult<Vec<String>> {
        let layers = unsafe { self.entry.enumerate_instance_layer_properties() }
            .map_err(|e| vk_error(e, "vkEnumerateInstanceLayerProperties"))?;
        Ok(layers.iter().map(|l| fixed_name(&l.layer_name)).collect())
    }

    fn available_instance_extensions(&self) -> DriverResult<Vec<String>> {
        let extensions = unsafe { self.entry.enumerate_instance_extension_properties(None) }
            .map_err(|e| vk_error(e, "vkEnumerateInstanceExtensionProperties"))?;
        Ok(extensions
            .iter()
            .map(|e| fixed_name(&e.extension_name))
            .collect())
    }

    fn create_instance(&self, desc: &InstanceDesc) -> DriverResult<InstanceHandle> {
        let app_name = CString::new(desc.application_name.as_str())
            .map_err(|_| DriverError::InvalidArgument("application name contains NUL".into()))?;
        let extensions = to_cstrings(&desc.extensions)?;
        let layers = to_cstrings(&desc.layers)?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|s| s.as_ptr()).collect();
        let layer_ptrs: Vec<*const c_char> = layers.iter().map(|s| s.as_ptr()).collect();
        let api_version = if desc.api_version == 0 {
            vk::API_VERSION_1_1
        } else {
            desc.api_version
        };

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(0)
            .engine_name(&app_name)
            .engine_version(0)
            .api_version(api_version);
        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { self.entry.create_instance(&create_info, None) }
            .map_err(|e| vk_error(e, "vkCreateInstance"))?;
        let messenger = if desc.debug_messenger {
            self.create_messenger(&instance)
        } else {
            None
        };
        let raw = instance.handle().as_raw();
        self.instances.write().insert(
            raw,
            InstanceState {
                instance,
                messenger,
                owned: true,
                imports: 0,
            },
        );
        Ok(InstanceHandle::from_raw(raw))
    }

    fn import_instance(&self, instance: InstanceHandle) -> DriverResult<()> {
        if instance.is_null() {
            return Err(DriverError::InvalidArgument("null instance handle".into()));
        }
        let mut instances = self.instances.write();
        let state = instances
            .entry(instance.as_raw())
            .or_insert_with(|| InstanceState {
                // Safety: the caller guarantees the handle is a live instance created from
                // the same loader.
                instance: unsafe {
                    ash::Instance::load(
                        self.entry.static_fn(),
                        vk::Instance::from_raw(instance.as_raw()),
                    )
                },
                messenger: None,
                owned: false,
                imports: 0,
            });
        state.imports += 1;
        Ok(())
    }

    fn release_instance_import(&self, instance: InstanceHandle) {
        let mut instances = self.instances.write();
        let Some(state) = instances.get_mut(&instance.as_raw()) else {
            tracing::error!("vulkan: release of unknown imported {}", instance);
            return;
        };
        if state.imports == 0 {
            tracing::error!("vulkan: {} was not imported", instance);
            return;
        }
        state.imports -= 1;
        if state.imports == 0 && !state.owned {
            instances.remove(&instance.as_raw());
        }
    }

    fn destroy_instance(&self, instance: InstanceHandle) {
        let removed = self.instances.write().remove(&instance.as_raw());
        match removed {
            Some(state) => {
                if state.imports > 0 {
                    tracing::warn!(
                        "vulkan: destroying {} with {} outstanding imports",
                        instance,
                        state.imports
                    );
                }
                destroy_instance_state(state);
            }
            None => tracing::error!("vulkan: destroy of unknown {}", instance),
        }
    }

    fn enumerate_physical_devices(
        &self,
        instance: InstanceHandle,
    ) -> DriverResult<Vec<PhysicalDeviceHandle>> {
        let inst = self.instance(instance)?;
        let devices = unsafe { inst.enumerate_physical_devices() }
            .map_err(|e| vk_error(e, "vkEnumeratePhysicalDevices"))?;
        Ok(devices
            .into_iter()
            .map(|pd| PhysicalDeviceHandle::from_raw(pd.as_raw()))
            .collect())
    }

    fn physical_device_properties(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
    ) -> DriverResult<PhysicalDeviceProperties> {
        let inst = self.instance(instance)?;
        let pd = vk::PhysicalDevice::from_raw(physical_device.as_raw());
        let props = unsafe { inst.get_physical_device_properties(pd) };
        let device_type = match props.device_type {
            vk::PhysicalDeviceType::INTEGRATED_GPU => DeviceType::IntegratedGpu,
            vk::PhysicalDeviceType::DISCRETE_GPU => DeviceType::DiscreteGpu,
            vk::PhysicalDeviceType::VIRTUAL_GPU => DeviceType::VirtualGpu,
            vk::PhysicalDeviceType::CPU => DeviceType::Cpu,
            _ => DeviceType::Other,
        };
        Ok(PhysicalDeviceProperties {
            device_name: fixed_name(&props.device_name),
            device_type,
            vendor_id: props.vendor_id,
            device_id: props.device_id,
            api_version: props.api_version,
            driver_version: props.driver_version,
            max_compute_workgroup_count: props.limits.max_compute_work_group_count,
            max_compute_workgroup_size: props.limits.max_compute_work_group_size,
            max_compute_workgroup_invocations: props.limits.max_compute_work_group_invocations,
            timestamp_period: props.limits.timestamp_period,
        })
    }

    fn queue_family_properties(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
    ) -> DriverResult<Vec<QueueFamilyProperties>> {
        let inst = self.instance(instance)?;
        let pd = vk::PhysicalDevice::from_raw(physical_device.as_raw());
        let families = unsafe { inst.get_physical_device_queue_family_properties(pd) };
        Ok(families
            .iter()
            .map(|f| QueueFamilyProperties {
                flags: QueueFlags::from_bits(f.queue_flags.as_raw()),
                queue_count: f.queue_count,
                timestamp_valid_bits: f.timestamp_valid_bits,
            })
            .collect())
    }

    fn device_extensions(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
    ) -> DriverResult<Vec<String>> {
        let inst = self.instance(instance)?;
        let pd = vk::PhysicalDevice::from_raw(physical_device.as_raw());
        let extensions = unsafe { inst.enumerate_device_extension_properties(pd) }
            .map_err(|e| vk_error(e, "vkEnumerateDeviceExtensionProperties"))?;
        Ok(extensions
            .iter()
            .map(|e| fixed_name(&e.extension_name))
            .collect())
    }

    fn create_device(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
        desc: &DeviceDesc,
    ) -> DriverResult<DeviceHandle> {
        let inst = self.instance(instance)?;
        let pd = vk::PhysicalDevice::from_raw(physical_device.as_raw());

        let priorities = [1.0f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = desc
            .queue_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
            })
            .collect();
        let extensions = to_cstrings(&desc.extensions)?;
        let extension_ptrs: Vec<*const c_char> = extensions.iter().map(|s| s.as_ptr()).collect();
        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs);

        let device = unsafe { inst.create_device(pd, &create_info, None) }
            .map_err(|e| vk_error(e, "vkCreateDevice"))?;
        let memory_properties = unsafe { inst.get_physical_device_memory_properties(pd) };
        let raw = device.handle().as_raw();
        self.devices.write().insert(
            raw,
            DeviceState {
                device,
                memory_properties,
                queue_families: desc.queue_families.clone(),
                owned: true,
                imports: 0,
            },
        );
        Ok(DeviceHandle::from_raw(raw))
    }

    fn import_device(
        &self,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
        device: DeviceHandle,
        enabled_queue_families: &[u32],
    ) -> DriverResult<()> {
        if device.is_null() {
            return Err(DriverError::InvalidArgument("null device handle".into()));
        }
        let inst = self.instance(instance)?;
        let pd = vk::PhysicalDevice::from_raw(physical_device.as_raw());
        let family_count =
            unsafe { inst.get_physical_device_queue_family_properties(pd) }.len() as u32;
        if let Some(&family) = enabled_queue_families.iter().find(|&&f| f >= family_count) {
            return Err(DriverError::QueueFamilyNotEnabled { family });
        }
        let memory_properties = unsafe { inst.get_physical_device_memory_properties(pd) };
        let mut devices = self.devices.write();
        let state = devices
            .entry(device.as_raw())
            .or_insert_with(|| DeviceState {
                // Safety: the caller guarantees the handle is a live device created from
                // `instance` with `enabled_queue_families`.
                device: unsafe {
                    ash::Device::load(inst.fp_v1_0(), vk::Device::from_raw(device.as_raw()))
                },
                memory_properties,
                queue_families: Vec::new(),
                owned: false,
                imports: 0,
            });
        if !state.owned {
            for &family in enabled_queue_families {
                if !state.queue_families.contains(&family) {
                    state.queue_families.push(family);
                }
            }
        } else if let Some(&family) = enabled_queue_families
            .iter()
            .find(|f| !state.queue_families.contains(f))
        {
            return Err(DriverError::QueueFamilyNotEnabled { family });
        }
        state.imports += 1;
        Ok(())
    }

    fn release_device_import(&self, device: DeviceHandle) {
        let mut devices = self.devices.write();
        let Some(state) = devices.get_mut(&device.as_raw()) else {
            tracing::error!("vulkan: release of unknown imported {}", device);
            return;
        };
        if state.imports == 0 {
            tracing::error!("vulkan: {} was not imported", device);
            return;
        }
        state.imports -= 1;
        if state.imports == 0 && !state.owned {
            devices.remove(&device.as_raw());
        }
    }

    fn destroy_device(&self, device: DeviceHandle) {
        let removed = self.devices.write().remove(&device.as_raw());
        match removed {
            Some(state) => {
                if state.imports > 0 {
                    tracing::warn!(
                        "vulkan: destroying {} with {} outstanding imports",
                        device,
                        state.imports
                    );
                }
                unsafe { state.device.destroy_device(None) }
            }
            None => tracing::error!("vulkan: destroy of unknown {}", device),
        }
    }

    fn get_queue(
        &self,
        device: DeviceHandle,
        family_index: u32,
        queue_index: u32,
    ) -> DriverResult<QueueHandle> {
        let state = self.device(device)?;
        if !state.queue_families.contains(&family_index) {
            return Err(DriverError::QueueFamilyNotEnabled {
                family: family_index,
            });
        }
        // Devices are created with one queue per enabled family.
        if queue_index > 0 {
            return Err(DriverError::InvalidArgument(format!(
                "queue {} of family {} was not requested at device creation",
                queue_index, family_index
            )));
        }
        let queue = unsafe { state.device.get_device_queue(family_index, queue_index) };
        Ok(QueueHandle::from_raw(queue.as_raw()))
    }

    fn device_wait_idle(&self, device: DeviceHandle) -> DriverResult<()> {
        let state = self.device(device)?;
        unsafe { state.device.device_wait_idle() }.map_err(|e| vk_error(e, "vkDeviceWaitIdle"))
    }

    fn create_buffer(
        &self,
        device: DeviceHandle,
        size: u64,
        location: MemoryLocation,
    ) -> DriverResult<(BufferHandle, MemoryHandle)> {
        let state = self.device(device)?;
        let dev = &state.device;

        let info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(
                vk::BufferUsageFlags::STORAGE_BUFFER
                    | vk::BufferUsageFlags::TRANSFER_SRC
                    | vk::BufferUsageFlags::TRANSFER_DST,
            )
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe { dev.create_buffer(&info, None) }
            .map_err(|e| vk_alloc_error(e, size, "vkCreateBuffer"))?;

        let requirements = unsafe { dev.get_buffer_memory_requirements(buffer) };
        let wanted = match location {
            MemoryLocation::DeviceLocal => vk::MemoryPropertyFlags::DEVICE_LOCAL,
            MemoryLocation::HostVisible => {
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
            }
        };
        let Some(type_index) =
            find_memory_type(&state.memory_properties, requirements.memory_type_bits, wanted)
        else {
            unsafe { dev.destroy_buffer(buffer, None) };
            return Err(DriverError::NoMemoryType(location));
        };

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(type_index);
        let memory = match unsafe { dev.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { dev.destroy_buffer(buffer, None) };
                return Err(vk_alloc_error(e, requirements.size, "vkAllocateMemory"));
            }
        };
        if let Err(e) = unsafe { dev.bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                dev.destroy_buffer(buffer, None);
                dev.free_memory(memory, None);
            }
            return Err(vk_error(e, "vkBindBufferMemory"));
        }

        Ok((
            BufferHandle::from_raw(buffer.as_raw()),
            MemoryHandle::from_raw(memory.as_raw()),
        ))
    }

    fn write_memory(
        &self,
        device: DeviceHandle,
        memory: MemoryHandle,
        offset: u64,
        data: &[u8],
    ) -> DriverResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let state = self.device(device)?;
        let mem = vk::DeviceMemory::from_raw(memory.as_raw());
        unsafe {
            let ptr = state
                .device
                .map_memory(mem, offset, data.len() as u64, vk::MemoryMapFlags::empty())
                .map_err(|e| vk_error(e, "vkMapMemory"))?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.cast::<u8>(), data.len());
            state.device.unmap_memory(mem);
        }
        Ok(())
    }

    fn destroy_buffer(&self, device: DeviceHandle, buffer: BufferHandle, memory: MemoryHandle) {
        let Ok(state) = self.device(device) else {
            tracing::error!("vulkan: destroy of {} on unknown {}", buffer, device);
            return;
        };
        unsafe {
            state
                .device
                .destroy_buffer(vk::Buffer::from_raw(buffer.as_raw()), None);
            state
                .device
                .free_memory(vk::DeviceMemory::from_raw(memory.as_raw()), None);
        }
    }

    fn create_shader_module(
        &self,
        device: DeviceHandle,
        spirv: &[u32],
    ) -> DriverResult<ShaderModuleHandle> {
        let state = self.device(device)?;
        let info = vk::ShaderModuleCreateInfo::default().code(spirv);
        let module = unsafe { state.device.create_shader_module(&info, None) }
            .map_err(|e| vk_error(e, "vkCreateShaderModule"))?;
        Ok(ShaderModuleHandle::from_raw(module.as_raw()))
    }

    fn destroy_shader_module(&self, device: DeviceHandle, module: ShaderModuleHandle) {
        let Ok(state) = self.device(device) else {
            tracing::error!("vulkan: destroy of {} on unknown {}", module, device);
            return;
        };
        unsafe {
            state
                .device
                .destroy_shader_module(vk::ShaderModule::from_raw(module.as_raw()), None)
        };
    }

    fn create_command_pool(
        &self,
        device: DeviceHandle,
        family_index: u32,
    ) -> DriverResult<CommandPoolHandle> {
        let state = self.device(device)?;
        let info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let pool = unsafe { state.device.create_command_pool(&info, None) }
            .map_err(|e| vk_error(e, "vkCreateCommandPool"))?;
        Ok(CommandPoolHandle::from_raw(pool.as_raw()))
    }

    fn destroy_command_pool(&self, device: DeviceHandle, pool: CommandPoolHandle) {
        let Ok(state) = self.device(device) else {
            tracing::error!("vulkan: destroy of {} on unknown {}", pool, device);
            return;
        };
        unsafe {
            state
                .device
                .destroy_command_pool(vk::CommandPool::from_raw(pool.as_raw()), None)
        };
    }

    fn create_timestamp_pool(
        &self,
        device: DeviceHandle,
        query_count: u32,
    ) -> DriverResult<QueryPoolHandle> {
        let state = self.device(device)?;
        let info = vk::QueryPoolCreateInfo::default()
            .query_type(vk::QueryType::TIMESTAMP)
            .query_count(query_count);
        let pool = unsafe { state.device.create_query_pool(&info, None) }
            .map_err(|e| vk_error(e, "vkCreateQueryPool"))?;
        Ok(QueryPoolHandle::from_raw(pool.as_raw()))
    }

    fn destroy_query_pool(&self, device: DeviceHandle, pool: QueryPoolHandle) {
        let Ok(state) = self.device(device) else {
            tracing::error!("vulkan: destroy of {} on unknown {}", pool, device);
            return;
        };
        unsafe {
            state
                .device
                .destroy_query_pool(vk::QueryPool::from_raw(pool.as_raw()), None)
        };
    }
}
