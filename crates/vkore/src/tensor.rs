//! Tensors: typed GPU buffers created from host data.
//!
//! Staging copies between a tensor's host-visible and device-local buffers are recorded by
//! sequences; creating a tensor only allocates its buffers and uploads the initial data
//! into whichever buffer is host-visible.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vkore_driver::{BufferHandle, MemoryHandle, MemoryLocation};

use crate::arena::{GpuResources, ManagedResource, ResourceKind, SharedArena, SlotKey, SlotLease};
use crate::context::DeviceContext;
use crate::dtype::TensorDataType;
use crate::{Result, VkoreError};

/// Memory placement of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TensorType {
    /// Device-local primary buffer plus a host-visible staging buffer.
    #[default]
    Device,
    /// Single host-visible buffer.
    Host,
    /// Device-local buffer only; no host access, initial data is not uploaded.
    Storage,
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorType::Device => write!(f, "device"),
            TensorType::Host => write!(f, "host"),
            TensorType::Storage => write!(f, "storage"),
        }
    }
}

/// A GPU buffer and its backing memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    pub buffer: BufferHandle,
    pub memory: MemoryHandle,
}

/// Shared handle to a tensor. Clones refer to the same GPU buffers; the buffers are
/// released when the last clone is dropped, or earlier by [`Tensor::destroy`] or the
/// manager's `destroy()`.
#[derive(Clone)]
pub struct Tensor {
    inner: Arc<TensorInner>,
}

struct TensorInner {
    lease: SlotLease,
    size: u32,
    element_size: u32,
    data_type: TensorDataType,
    tensor_type: TensorType,
    primary: BufferBinding,
    staging: Option<BufferBinding>,
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("key", &self.inner.lease.key())
            .field("size", &self.inner.size)
            .field("data_type", &self.inner.data_type)
            .field("tensor_type", &self.inner.tensor_type)
            .finish()
    }
}

impl Tensor {
    pub(crate) fn create(
        context: &Arc<DeviceContext>,
        arena: &SharedArena,
        data: &[u8],
        element_count: u32,
        element_size: u32,
        data_type: TensorDataType,
        tensor_type: TensorType,
    ) -> Result<Tensor> {
        if element_count == 0 {
            return Err(VkoreError::InvalidTensorData(
                "a tensor needs at least one element".into(),
            ));
        }
        data_type
            .check_element_size(element_size)
            .map_err(VkoreError::InvalidTensorData)?;
        let memory_size = element_count as u64 * element_size as u64;
        if data.len() as u64 != memory_size {
            return Err(VkoreError::InvalidTensorData(format!(
                "expected {} bytes for {} elements of {} bytes, got {}",
                memory_size,
                element_count,
                element_size,
                data.len()
            )));
        }

        // Any error below drops `resources`, freeing what was already allocated.
        let mut resources = GpuResources::new(Arc::clone(context));
        let (primary, staging) = match tensor_type {
            TensorType::Device => {
                let (buffer, memory) =
                    resources.create_buffer(memory_size, MemoryLocation::DeviceLocal)?;
                let (s_buffer, s_memory) =
                    resources.create_buffer(memory_size, MemoryLocation::HostVisible)?;
                resources.write(s_memory, data)?;
                (
                    BufferBinding { buffer, memory },
                    Some(BufferBinding {
                        buffer: s_buffer,
                        memory: s_memory,
                    }),
                )
            }
            TensorType::Host => {
                let (buffer, memory) =
                    resources.create_buffer(memory_size, MemoryLocation::HostVisible)?;
                resources.write(memory, data)?;
                (BufferBinding { buffer, memory }, None)
            }
            TensorType::Storage => {
                let (buffer, memory) =
                    resources.create_buffer(memory_size, MemoryLocation::DeviceLocal)?;
                (BufferBinding { buffer, memory }, None)
            }
        };
        tracing::debug!(
            "vkore: tensor of {} x {} ({}), {} buffers",
            element_count,
            data_type,
            tensor_type,
            resources.len()
        );

        let key = arena.lock().insert(ResourceKind::Tensor, resources);
        Ok(Tensor {
            inner: Arc::new(TensorInner {
                lease: SlotLease::new(Arc::clone(arena), key),
                size: element_count,
                element_size,
                data_type,
                tensor_type,
                primary,
                staging,
            }),
        })
    }

    /// Number of elements.
    pub fn size(&self) -> u32 {
        self.inner.size
    }

    /// Bytes per element.
    pub fn element_size(&self) -> u32 {
        self.inner.element_size
    }

    /// Total bytes of the tensor's data.
    pub fn memory_size(&self) -> u64 {
        self.inner.size as u64 * self.inner.element_size as u64
    }

    pub fn data_type(&self) -> TensorDataType {
        self.inner.data_type
    }

    pub fn tensor_type(&self) -> TensorType {
        self.inner.tensor_type
    }

    /// Buffer bound as the tensor's storage in algorithms. Valid while `is_init()`.
    pub fn primary(&self) -> BufferBinding {
        self.inner.primary
    }

    /// Host-visible staging buffer of a `Device` tensor.
    pub fn staging(&self) -> Option<BufferBinding> {
        self.inner.staging
    }

    pub(crate) fn belongs_to(&self, arena: &SharedArena) -> bool {
        self.inner.lease.belongs_to(arena)
    }
}

impl ManagedResource for Tensor {
    const KIND: ResourceKind = ResourceKind::Tensor;

    fn key(&self) -> SlotKey {
        self.inner.lease.key()
    }

    fn is_init(&self) -> bool {
        self.inner.lease.is_live()
    }

    fn destroy(&self) {
        if self.inner.lease.release() {
            tracing::debug!("vkore: tensor {:?} destroyed explicitly", self.key());
        }
    }
}
