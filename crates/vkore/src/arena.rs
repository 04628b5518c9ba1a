//! Generation-tagged slot arena for GPU resources.
//!
//! Each tensor, sequence or algorithm occupies one slot. The slot owns the resource's native
//! GPU objects plus an `Arc` to the device context. A [`SlotKey`] is a `(index, generation)`
//! pair: releasing a slot bumps its generation, so every key issued for the old occupant
//! stops matching. Liveness is a generation comparison; keys never keep anything alive.
//!
//! Callers own resources through [`SlotLease`]s (shared by the resource handle's `Arc`).
//! Dropping the last lease releases the slot; the manager may also release a slot early
//! during teardown, after which the lease's own release is a no-op.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;
use vkore_driver::{
    BufferHandle, CommandPoolHandle, MemoryHandle, MemoryLocation, QueryPoolHandle,
    ShaderModuleHandle,
};

use crate::context::DeviceContext;
use crate::Result;

/// The three resource kinds the manager creates and tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Tensor,
    Sequence,
    Algorithm,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Tensor,
        ResourceKind::Sequence,
        ResourceKind::Algorithm,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Tensor => write!(f, "tensor"),
            ResourceKind::Sequence => write!(f, "sequence"),
            ResourceKind::Algorithm => write!(f, "algorithm"),
        }
    }
}

/// Weak, lookup-only reference to an arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    index: u32,
    generation: u32,
}

impl SlotKey {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// A native object owned by a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GpuObject {
    Buffer {
        buffer: BufferHandle,
        memory: MemoryHandle,
    },
    ShaderModule(ShaderModuleHandle),
    CommandPool(CommandPoolHandle),
    QueryPool(QueryPoolHandle),
}

/// Native objects of one resource. Destroyed in reverse creation order on drop.
pub(crate) struct GpuResources {
    context: Arc<DeviceContext>,
    objects: SmallVec<[GpuObject; 2]>,
}

impl GpuResources {
    pub(crate) fn new(context: Arc<DeviceContext>) -> Self {
        Self {
            context,
            objects: SmallVec::new(),
        }
    }

    pub(crate) fn create_buffer(
        &mut self,
        size: u64,
        location: MemoryLocation,
    ) -> Result<(BufferHandle, MemoryHandle)> {
        let (buffer, memory) = self
            .context
            .driver()
            .create_buffer(self.context.device(), size, location)?;
        self.objects.push(GpuObject::Buffer { buffer, memory });
        Ok((buffer, memory))
    }

    pub(crate) fn write(&self, memory: MemoryHandle, data: &[u8]) -> Result<()> {
        Ok(self
            .context
            .driver()
            .write_memory(self.context.device(), memory, 0, data)?)
    }

    pub(crate) fn create_shader_module(&mut self, spirv: &[u32]) -> Result<ShaderModuleHandle> {
        let module = self
            .context
            .driver()
            .create_shader_module(self.context.device(), spirv)?;
        self.objects.push(GpuObject::ShaderModule(module));
        Ok(module)
    }

    pub(crate) fn create_command_pool(&mut self, family_index: u32) -> Result<CommandPoolHandle> {
        let pool = self
            .context
            .driver()
            .create_command_pool(self.context.device(), family_index)?;
        self.objects.push(GpuObject::CommandPool(pool));
        Ok(pool)
    }

    pub(crate) fn create_timestamp_pool(&mut self, query_count: u32) -> Result<QueryPoolHandle> {
        let pool = self
            .context
            .driver()
            .create_timestamp_pool(self.context.device(), query_count)?;
        self.objects.push(GpuObject::QueryPool(pool));
        Ok(pool)
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }
}

impl Drop for GpuResources {
    fn drop(&mut self) {
        let driver = self.context.driver();
        let device = self.context.device();
        while let Some(object) = self.objects.pop() {
            match object {
                GpuObject::Buffer { buffer, memory } => driver.destroy_buffer(device, buffer, memory),
                GpuObject::ShaderModule(module) => driver.destroy_shader_module(device, module),
                GpuObject::CommandPool(pool) => driver.destroy_command_pool(device, pool),
                GpuObject::QueryPool(pool) => driver.destroy_query_pool(device, pool),
            }
        }
    }
}

/// Contents of an occupied slot.
pub(crate) struct Occupant {
    kind: ResourceKind,
    // Held for its `Drop`.
    _resources: GpuResources,
}

struct Slot {
    generation: u32,
    occupant: Option<Occupant>,
}

/// Slot storage for every resource created by one manager.
#[derive(Default)]
pub struct ResourceArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl fmt::Debug for ResourceArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceArena")
            .field("slots", &self.slots.len())
            .field("live", &self.live)
            .field("free", &self.free.len())
            .finish()
    }
}

pub type SharedArena = Arc<Mutex<ResourceArena>>;

impl ResourceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedArena {
        Arc::new(Mutex::new(Self::new()))
    }

    pub(crate) fn insert(&mut self, kind: ResourceKind, resources: GpuResources) -> SlotKey {
        let occupant = Some(Occupant {
            kind,
            _resources: resources,
        });
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.occupant = occupant;
            return SlotKey {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            occupant,
        });
        SlotKey {
            index,
            generation: 0,
        }
    }

    /// Whether `key` still refers to its original occupant.
    pub fn is_live(&self, key: SlotKey) -> bool {
        self.slots
            .get(key.index as usize)
            .map_or(false, |slot| {
                slot.generation == key.generation && slot.occupant.is_some()
            })
    }

    /// Vacate the slot if `key` is live, returning its occupant for the caller to drop.
    ///
    /// Dropping the occupant destroys its GPU objects, so callers holding the arena lock
    /// should drop it after unlocking.
    pub(crate) fn take(&mut self, key: SlotKey) -> Option<Occupant> {
        if !self.is_live(key) {
            return None;
        }
        let slot = &mut self.slots[key.index as usize];
        let occupant = slot.occupant.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.live -= 1;
        occupant
    }

    /// Number of occupied slots.
    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn live_count_of(&self, kind: ResourceKind) -> usize {
        self.slots
            .iter()
            .filter_map(|slot| slot.occupant.as_ref())
            .filter(|occupant| occupant.kind == kind)
            .count()
    }

    /// Number of slots ever allocated (occupied or free).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Common surface of the resource handles created by a manager.
pub trait ManagedResource {
    const KIND: ResourceKind;

    /// Arena key of this resource, as stored by the registry.
    fn key(&self) -> SlotKey;

    /// Whether the resource's GPU objects are still alive.
    fn is_init(&self) -> bool;

    /// Release the GPU objects now, even if other handles still refer to the resource.
    fn destroy(&self);
}

/// Owning claim on a slot; releases it when dropped.
pub(crate) struct SlotLease {
    arena: SharedArena,
    key: SlotKey,
}

impl SlotLease {
    pub(crate) fn new(arena: SharedArena, key: SlotKey) -> Self {
        Self { arena, key }
    }

    pub(crate) fn key(&self) -> SlotKey {
        self.key
    }

    pub(crate) fn is_live(&self) -> bool {
        self.arena.lock().is_live(self.key)
    }

    pub(crate) fn belongs_to(&self, arena: &SharedArena) -> bool {
        Arc::ptr_eq(&self.arena, arena)
    }

    /// Release the slot now. Returns `false` if it was already released.
    pub(crate) fn release(&self) -> bool {
        let occupant = self.arena.lock().take(self.key);
        occupant.is_some()
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.release();
    }
}
