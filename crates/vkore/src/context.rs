//! Device context: the instance / physical device / logical device triad.
//!
//! A context is either created by vkore (both handles `Owned`) or adopted from the caller
//! (both handles `Borrowed`). Owned handles are released exactly once, when the last
//! `Arc<DeviceContext>` is dropped; borrowed handles are never destroyed, only their driver
//! import is released. Every resource
//! slot holds an `Arc` to its context, so the device always outlives the resources built
//! on it.

use std::fmt;
use std::sync::Arc;

use vkore_driver::{
    DeviceDesc, DeviceHandle, Driver, InstanceDesc, InstanceHandle, PhysicalDeviceHandle,
    PhysicalDeviceProperties, QueueFamilyProperties, DEBUG_UTILS_EXTENSION, VALIDATION_LAYER,
};

use crate::config::ManagerConfig;
use crate::queue::select_queue_families;
use crate::{Result, VkoreError};

/// Who is responsible for releasing a native handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// Created by vkore; released on teardown.
    Owned,
    /// Supplied by the caller; never released by vkore.
    Borrowed,
}

impl Ownership {
    pub fn is_owned(self) -> bool {
        matches!(self, Ownership::Owned)
    }
}

/// A physical device visible to the active instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalDeviceInfo {
    pub index: u32,
    pub handle: PhysicalDeviceHandle,
    pub properties: PhysicalDeviceProperties,
}

pub struct DeviceContext {
    driver: Arc<dyn Driver>,
    instance: InstanceHandle,
    instance_ownership: Ownership,
    physical_device: PhysicalDeviceHandle,
    device: DeviceHandle,
    device_ownership: Ownership,
    queue_families: Vec<QueueFamilyProperties>,
    enabled_families: Vec<u32>,
}

impl fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceContext")
            .field("driver", &self.driver.name())
            .field("instance", &self.instance)
            .field("instance_ownership", &self.instance_ownership)
            .field("physical_device", &self.physical_device)
            .field("device", &self.device)
            .field("device_ownership", &self.device_ownership)
            .field("enabled_families", &self.enabled_families)
            .finish()
    }
}

/// Physical device and logical device opened for a self-created context.
struct OpenedDevice {
    physical_device: PhysicalDeviceHandle,
    device: DeviceHandle,
    queue_families: Vec<QueueFamilyProperties>,
    selected_families: Vec<u32>,
}

/// Instance parameters for `config`: explicit layers and extensions must exist, debug
/// support is added only where the loader has it.
fn instance_desc(driver: &dyn Driver, config: &ManagerConfig) -> Result<InstanceDesc> {
    let available_layers = driver.available_layers()?;
    let available_extensions = driver.available_instance_extensions()?;

    if let Some(missing) = config
        .instance_layers
        .iter()
        .find(|layer| !available_layers.contains(layer))
    {
        return Err(VkoreError::LayerUnsupported(missing.clone()));
    }
    if let Some(missing) = config
        .instance_extensions
        .iter()
        .find(|ext| !available_extensions.contains(ext))
    {
        return Err(VkoreError::InstanceExtensionUnsupported(missing.clone()));
    }

    let mut desc = InstanceDesc {
        application_name: config.application_name.clone(),
        layers: config.instance_layers.clone(),
        extensions: config.instance_extensions.clone(),
        ..InstanceDesc::default()
    };
    if config.debug_layers {
        if available_layers.iter().any(|l| l == VALIDATION_LAYER) {
            if !desc.layers.iter().any(|l| l == VALIDATION_LAYER) {
                desc.layers.push(VALIDATION_LAYER.to_string());
            }
        } else {
            tracing::debug!("vkore: {} not available, validation disabled", VALIDATION_LAYER);
        }
        if available_extensions.iter().any(|e| e == DEBUG_UTILS_EXTENSION) {
            if !desc.extensions.iter().any(|e| e == DEBUG_UTILS_EXTENSION) {
                desc.extensions.push(DEBUG_UTILS_EXTENSION.to_string());
            }
            desc.debug_messenger = true;
        } else {
            tracing::debug!("vkore: {} not available, no debug messenger", DEBUG_UTILS_EXTENSION);
        }
    }
    Ok(desc)
}

fn open_device(
    driver: &dyn Driver,
    instance: InstanceHandle,
    config: &ManagerConfig,
) -> Result<OpenedDevice> {
    let physical_devices = driver.enumerate_physical_devices(instance)?;
    let physical_device = *physical_devices
        .get(config.physical_device_index as usize)
        .ok_or(VkoreError::PhysicalDeviceOutOfRange {
            index: config.physical_device_index,
            available: physical_devices.len(),
        })?;

    let properties = driver.physical_device_properties(instance, physical_device)?;
    tracing::info!(
        "vkore: using physical device {}: {}",
        config.physical_device_index,
        properties
    );

    let queue_families = driver.queue_family_properties(instance, physical_device)?;
    let selected_families = select_queue_families(&queue_families, &config.queue_family_indices)?;

    let supported = driver.device_extensions(instance, physical_device)?;
    if let Some(missing) = config
        .desired_extensions
        .iter()
        .find(|ext| !supported.contains(ext))
    {
        return Err(VkoreError::ExtensionUnsupported(missing.clone()));
    }

    let device = driver.create_device(
        instance,
        physical_device,
        &DeviceDesc {
            queue_families: selected_families.clone(),
            extensions: config.desired_extensions.clone(),
        },
    )?;
    tracing::debug!(
        "vkore: created {} with queue families {:?}",
        device,
        selected_families
    );

    Ok(OpenedDevice {
        physical_device,
        device,
        queue_families,
        selected_families,
    })
}

impl DeviceContext {
    /// Create a new instance and logical device per `config`.
    ///
    /// Returns the context together with the queue families that were opened on the
    /// device. On failure nothing created here is left alive.
    pub fn create(driver: Arc<dyn Driver>, config: &ManagerConfig) -> Result<(Self, Vec<u32>)> {
        let desc = instance_desc(driver.as_ref(), config)?;
        let instance = driver.create_instance(&desc)?;
        tracing::debug!(
            "vkore: created {} via {} driver (layers {:?})",
            instance,
            driver.name(),
            desc.layers
        );

        let opened = match open_device(driver.as_ref(), instance, config) {
            Ok(opened) => opened,
            Err(err) => {
                driver.destroy_instance(instance);
                return Err(err);
            }
        };

        let context = Self {
            driver,
            instance,
            instance_ownership: Ownership::Owned,
            physical_device: opened.physical_device,
            device: opened.device,
            device_ownership: Ownership::Owned,
            queue_families: opened.queue_families,
            enabled_families: opened.selected_families.clone(),
        };
        Ok((context, opened.selected_families))
    }

    /// Wrap caller-created handles. Neither handle is ever destroyed by vkore.
    ///
    /// `enabled_families` are the queue families the caller created `device` with; only
    /// those can be provisioned later.
    pub fn adopt(
        driver: Arc<dyn Driver>,
        instance: InstanceHandle,
        physical_device: PhysicalDeviceHandle,
        device: DeviceHandle,
        enabled_families: &[u32],
    ) -> Result<Self> {
        driver.import_instance(instance)?;
        if let Err(err) = driver.import_device(instance, physical_device, device, enabled_families)
        {
            driver.release_instance_import(instance);
            return Err(err.into());
        }
        let queue_families = match driver.queue_family_properties(instance, physical_device) {
            Ok(families) => families,
            Err(err) => {
                driver.release_device_import(device);
                driver.release_instance_import(instance);
                return Err(err.into());
            }
        };
        tracing::debug!(
            "vkore: adopted {} / {} with queue families {:?}",
            instance,
            device,
            enabled_families
        );
        Ok(Self {
            driver,
            instance,
            instance_ownership: Ownership::Borrowed,
            physical_device,
            device,
            device_ownership: Ownership::Borrowed,
            queue_families,
            enabled_families: enabled_families.to_vec(),
        })
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn instance(&self) -> InstanceHandle {
        self.instance
    }

    pub fn instance_ownership(&self) -> Ownership {
        self.instance_ownership
    }

    pub fn physical_device(&self) -> PhysicalDeviceHandle {
        self.physical_device
    }

    pub fn device(&self) -> DeviceHandle {
        self.device
    }

    pub fn device_ownership(&self) -> Ownership {
        self.device_ownership
    }

    /// Queue family properties of the selected physical device.
    pub fn queue_families(&self) -> &[QueueFamilyProperties] {
        &self.queue_families
    }

    /// Queue families enabled on the logical device.
    pub fn enabled_families(&self) -> &[u32] {
        &self.enabled_families
    }

    pub fn properties(&self) -> Result<PhysicalDeviceProperties> {
        Ok(self
            .driver
            .physical_device_properties(self.instance, self.physical_device)?)
    }

    /// Every physical device visible to this context's instance.
    pub fn list_devices(&self) -> Result<Vec<PhysicalDeviceInfo>> {
        self.driver
            .enumerate_physical_devices(self.instance)?
            .into_iter()
            .enumerate()
            .map(|(index, handle)| {
                Ok(PhysicalDeviceInfo {
                    index: index as u32,
                    handle,
                    properties: self.driver.physical_device_properties(self.instance, handle)?,
                })
            })
            .collect()
    }

    /// Block until the device has finished all submitted work.
    pub fn wait_idle(&self) -> Result<()> {
        Ok(self.driver.device_wait_idle(self.device)?)
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        if self.device_ownership.is_owned() {
            tracing::debug!("vkore: destroying {}", self.device);
            self.driver.destroy_device(self.device);
        } else {
            self.driver.release_device_import(self.device);
        }
        if self.instance_ownership.is_owned() {
            tracing::debug!("vkore: destroying {}", self.instance);
            self.driver.destroy_instance(self.instance);
        } else {
            self.driver.release_instance_import(self.instance);
        }
    }
}
