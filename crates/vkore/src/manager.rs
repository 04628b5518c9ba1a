//! The manager: device acquisition, resource factory and teardown.

use std::fmt;
use std::sync::Arc;

use vkore_driver::{DeviceHandle, Driver, InstanceHandle, PhysicalDeviceHandle, PhysicalDeviceProperties};

use crate::algorithm::{Algorithm, AlgorithmDesc};
use crate::arena::{ManagedResource, ResourceArena, ResourceKind, SharedArena};
use crate::config::ManagerConfig;
use crate::context::{DeviceContext, PhysicalDeviceInfo};
use crate::dtype::{Element, TensorDataType};
use crate::queue::{provision_queues, select_enabled_families, Queue};
use crate::registry::ResourceRegistry;
use crate::sequence::Sequence;
use crate::tensor::{Tensor, TensorType};
use crate::{Result, VkoreError};

/// Caller-created native handles for [`Manager::from_handles`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdoptedHandles {
    pub instance: InstanceHandle,
    pub physical_device: PhysicalDeviceHandle,
    pub device: DeviceHandle,
    /// Queue families `device` was created with. Must not be empty.
    pub queue_families: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerState {
    Active,
    /// Terminal: only `destroy()` may be called again.
    Destroyed,
}

/// Creates and tracks the tensors, algorithms and sequences of one device.
///
/// Factory and teardown methods take `&mut self`; share a manager between threads behind
/// external locking. Resource handles themselves may be dropped on any thread.
///
/// Before `destroy()` (or dropping the manager) the caller must make sure no submitted GPU
/// work still uses the tracked resources, e.g. with [`Manager::wait_idle`].
pub struct Manager {
    context: Option<Arc<DeviceContext>>,
    queues: Vec<Queue>,
    arena: SharedArena,
    registry: ResourceRegistry,
    manage_resources: bool,
    session: String,
    state: ManagerState,
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("context", &self.context)
            .field("queues", &self.queues)
            .field("managed", &self.registry.total())
            .finish()
    }
}

impl Manager {
    /// Open physical device 0 through the system Vulkan loader.
    #[cfg(feature = "vulkan")]
    pub fn new() -> Result<Self> {
        let driver = vkore_driver::VulkanDriver::new()?;
        Self::with_driver(Arc::new(driver))
    }

    /// Open physical device 0 with the default compute queue family.
    pub fn with_driver(driver: Arc<dyn Driver>) -> Result<Self> {
        Self::with_config(driver, ManagerConfig::default())
    }

    /// Open a specific physical device, optionally with explicit queue families and
    /// device extensions.
    pub fn with_device<S: AsRef<str>>(
        driver: Arc<dyn Driver>,
        physical_device_index: u32,
        queue_family_indices: &[u32],
        desired_extensions: &[S],
    ) -> Result<Self> {
        let config = ManagerConfig::default()
            .with_physical_device(physical_device_index)
            .with_queue_families(queue_family_indices)
            .with_extensions(desired_extensions.iter().map(|s| s.as_ref().to_string()));
        Self::with_config(driver, config)
    }

    pub fn with_config(driver: Arc<dyn Driver>, config: ManagerConfig) -> Result<Self> {
        let (context, families) = DeviceContext::create(driver, &config)?;
        // A failure past this point drops `context`, which releases the owned handles.
        let queues = provision_queues(&context, &families)?;
        Ok(Self::assemble(context, queues, config))
    }

    /// Build on the caller's own instance and device. vkore never destroys these handles.
    ///
    /// Queues are provisioned only from `handles.queue_families`; by default the first
    /// compute-capable one.
    pub fn from_handles(driver: Arc<dyn Driver>, handles: AdoptedHandles) -> Result<Self> {
        Self::from_handles_with_config(driver, handles, ManagerConfig::default())
    }

    /// Like [`from_handles`](Self::from_handles); `physical_device_index` and
    /// `desired_extensions` of `config` are ignored.
    pub fn from_handles_with_config(
        driver: Arc<dyn Driver>,
        handles: AdoptedHandles,
        config: ManagerConfig,
    ) -> Result<Self> {
        if handles.queue_families.is_empty() {
            return Err(VkoreError::InvalidConfig(
                "adopted device lists no enabled queue families".into(),
            ));
        }
        let context = DeviceContext::adopt(
            driver,
            handles.instance,
            handles.physical_device,
            handles.device,
            &handles.queue_families,
        )?;
        let families = select_enabled_families(
            context.queue_families(),
            context.enabled_families(),
            &config.queue_family_indices,
        )?;
        let queues = provision_queues(&context, &families)?;
        Ok(Self::assemble(context, queues, config))
    }

    fn assemble(context: DeviceContext, queues: Vec<Queue>, config: ManagerConfig) -> Self {
        tracing::debug!(
            "vkore: manager '{}' ready with {} queues (manage_resources={})",
            config.session,
            queues.len(),
            config.manage_resources
        );
        Self {
            context: Some(Arc::new(context)),
            queues,
            arena: ResourceArena::shared(),
            registry: ResourceRegistry::new(),
            manage_resources: config.manage_resources,
            session: config.session,
            state: ManagerState::Active,
        }
    }

    fn active_context(&self) -> Result<&Arc<DeviceContext>> {
        match (self.state, &self.context) {
            (ManagerState::Active, Some(context)) => Ok(context),
            _ => Err(VkoreError::Destroyed),
        }
    }

    fn track<R: ManagedResource>(&mut self, resource: &R) {
        if self.manage_resources {
            self.registry.register(R::KIND, resource.key());
        }
    }

    // ---------------------------------------------------------------------------
    // Factory
    // ---------------------------------------------------------------------------

    /// Create a sequence on provisioned queue `queue_index`. `total_timestamps > 0` enables
    /// GPU timestamp profiling with that many slots.
    pub fn sequence(&mut self, queue_index: u32, total_timestamps: u32) -> Result<Sequence> {
        tracing::debug!("vkore: sequence creation triggered");
        let context = self.active_context()?;
        let queue = *self
            .queues
            .get(queue_index as usize)
            .ok_or(VkoreError::QueueIndexOutOfRange {
                index: queue_index,
                available: self.queues.len(),
            })?;
        let sequence = Sequence::create(context, &self.arena, queue, total_timestamps)?;
        self.track(&sequence);
        Ok(sequence)
    }

    /// Create an `f32` tensor.
    pub fn tensor(&mut self, data: &[f32], tensor_type: TensorType) -> Result<Tensor> {
        self.tensor_t(data, tensor_type)
    }

    /// Create a tensor of any [`Element`] type.
    pub fn tensor_t<T: Element>(&mut self, data: &[T], tensor_type: TensorType) -> Result<Tensor> {
        let element_count = u32::try_from(data.len()).map_err(|_| {
            VkoreError::InvalidTensorData(format!("{} elements exceed u32 range", data.len()))
        })?;
        self.tensor_raw(
            bytemuck::cast_slice(data),
            element_count,
            std::mem::size_of::<T>() as u32,
            T::DATA_TYPE,
            tensor_type,
        )
    }

    /// Create a tensor from raw bytes with an explicit layout.
    pub fn tensor_raw(
        &mut self,
        data: &[u8],
        element_count: u32,
        element_size: u32,
        data_type: TensorDataType,
        tensor_type: TensorType,
    ) -> Result<Tensor> {
        tracing::debug!("vkore: tensor creation triggered");
        let context = self.active_context()?;
        let tensor = Tensor::create(
            context,
            &self.arena,
            data,
            element_count,
            element_size,
            data_type,
            tensor_type,
        )?;
        self.track(&tensor);
        Ok(tensor)
    }

    /// Create an algorithm. An unset workgroup defaults to `(tensors[0].size(), 1, 1)`.
    pub fn algorithm(&mut self, desc: AlgorithmDesc) -> Result<Algorithm> {
        tracing::debug!("vkore: algorithm creation triggered");
        let context = self.active_context()?;
        let algorithm = Algorithm::create(context, &self.arena, desc)?;
        self.track(&algorithm);
        Ok(algorithm)
    }

    // ---------------------------------------------------------------------------
    // Teardown
    // ---------------------------------------------------------------------------

    /// Forget tracked resources that have already been released. Live resources are left
    /// untouched. Returns the number of registry entries removed.
    pub fn clear(&mut self) -> usize {
        let arena = self.arena.lock();
        self.registry.sweep(&arena)
    }

    /// Release every tracked resource that is still alive, then the owned device and
    /// instance. Idempotent.
    ///
    /// Resources created while resource management was disabled keep the device context
    /// alive; in that case the owned handles are released once the last of them is dropped.
    pub fn destroy(&mut self) {
        if self.state == ManagerState::Destroyed {
            return;
        }
        tracing::debug!("vkore: manager '{}' destroy triggered", self.session);

        let stats = self.registry.drain(&mut self.arena.lock());
        tracing::debug!(
            "vkore: released {} managed resources ({} already expired)",
            stats.released,
            stats.expired
        );

        self.queues.clear();
        if let Some(context) = self.context.take() {
            let outstanding = Arc::strong_count(&context) - 1;
            if outstanding > 0 {
                tracing::warn!(
                    "vkore: {} unmanaged resources still hold the device; release deferred",
                    outstanding
                );
            }
            drop(context);
        }
        self.state = ManagerState::Destroyed;
    }

    // ---------------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------------

    /// Properties of the selected physical device.
    pub fn device_properties(&self) -> Result<PhysicalDeviceProperties> {
        self.active_context()?.properties()
    }

    /// Every physical device visible to the active instance.
    pub fn list_devices(&self) -> Result<Vec<PhysicalDeviceInfo>> {
        self.active_context()?.list_devices()
    }

    /// Block until the device has finished all submitted work.
    pub fn wait_idle(&self) -> Result<()> {
        self.active_context()?.wait_idle()
    }

    /// Registry entries of `kind`, including ones whose resource has expired but has not
    /// been swept yet.
    pub fn managed_count(&self, kind: ResourceKind) -> usize {
        self.registry.len(kind)
    }

    pub fn managed_total(&self) -> usize {
        self.registry.total()
    }

    /// Resources of this manager whose GPU objects are alive, tracked or not.
    pub fn live_count(&self) -> usize {
        self.arena.lock().live_count()
    }

    pub fn manages_resources(&self) -> bool {
        self.manage_resources
    }

    pub fn queues(&self) -> &[Queue] {
        &self.queues
    }

    pub fn context(&self) -> Option<&Arc<DeviceContext>> {
        self.context.as_ref()
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == ManagerState::Destroyed
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkore_driver::{HostDriver, ObjectKind};

    fn manager() -> (Arc<HostDriver>, Manager) {
        let driver = Arc::new(HostDriver::default());
        let mgr = Manager::with_driver(driver.clone()).unwrap();
        (driver, mgr)
    }

    #[test]
    fn test_default_construction() {
        let (_, mgr) = manager();
        assert_eq!(mgr.state(), ManagerState::Active);
        assert_eq!(mgr.queues().len(), 1);
        assert_eq!(mgr.queues()[0].family_index(), 0);
        assert!(mgr.manages_resources());
        assert_eq!(mgr.session(), crate::DEFAULT_SESSION);
    }

    #[test]
    fn test_factory_registers_each_kind() {
        let (_, mut mgr) = manager();
        let t = mgr.tensor(&[1.0, 2.0], TensorType::Device).unwrap();
        let _s = mgr.sequence(0, 0).unwrap();
        let _a = mgr.algorithm(AlgorithmDesc::new(vec![t])).unwrap();
        assert_eq!(mgr.managed_count(ResourceKind::Tensor), 1);
        assert_eq!(mgr.managed_count(ResourceKind::Sequence), 1);
        assert_eq!(mgr.managed_count(ResourceKind::Algorithm), 1);
    }

    #[test]
    fn test_unmanaged_mode_tracks_nothing() {
        let driver = Arc::new(HostDriver::default());
        let config = ManagerConfig::default().with_manage_resources(false);
        let mut mgr = Manager::with_config(driver.clone(), config).unwrap();
        let t = mgr.tensor(&[1.0], TensorType::Host).unwrap();
        assert_eq!(mgr.managed_total(), 0);
        assert_eq!(mgr.live_count(), 1);

        // The tensor keeps the device alive past destroy().
        mgr.destroy();
        assert!(t.is_init());
        assert_eq!(driver.live(ObjectKind::Device), 1);
        drop(t);
        assert_eq!(driver.live(ObjectKind::Device), 0);
        assert_eq!(driver.leaked_children(), 0);
    }

    #[test]
    fn test_sequence_queue_index_out_of_range() {
        let (_, mut mgr) = manager();
        let err = mgr.sequence(3, 0).unwrap_err();
        assert!(matches!(
            err,
            VkoreError::QueueIndexOutOfRange { index: 3, available: 1 }
        ));
        assert_eq!(mgr.managed_total(), 0);
    }

    #[test]
    fn test_factory_after_destroy_is_usage_error() {
        let (_, mut mgr) = manager();
        mgr.destroy();
        assert!(matches!(mgr.tensor(&[1.0], TensorType::Device), Err(VkoreError::Destroyed)));
        assert!(matches!(mgr.sequence(0, 0), Err(VkoreError::Destroyed)));
        assert!(matches!(
            mgr.algorithm(AlgorithmDesc::default()),
            Err(VkoreError::Destroyed)
        ));
        assert!(matches!(mgr.device_properties(), Err(VkoreError::Destroyed)));
        assert!(mgr.context().is_none());
    }

    #[test]
    fn test_drop_destroys_owned_handles() {
        let driver = Arc::new(HostDriver::default());
        {
            let mut mgr = Manager::with_driver(driver.clone()).unwrap();
            let _t = mgr.tensor(&[0.5; 8], TensorType::Device).unwrap();
        }
        assert_eq!(driver.live(ObjectKind::Device), 0);
        assert_eq!(driver.live(ObjectKind::Instance), 0);
        assert_eq!(driver.invalid_destroys(), 0);
    }
}
