//! Sequences: command submission batches bound to one compute queue.
//!
//! Recording and submission are driven by the caller through the sequence; creation only
//! allocates the command pool and, when profiling is requested, the timestamp query pool.

use std::fmt;
use std::sync::Arc;

use vkore_driver::{CommandPoolHandle, QueryPoolHandle};

use crate::arena::{GpuResources, ManagedResource, ResourceKind, SharedArena, SlotKey, SlotLease};
use crate::context::DeviceContext;
use crate::queue::Queue;
use crate::{Result, VkoreError};

#[derive(Clone)]
pub struct Sequence {
    inner: Arc<SequenceInner>,
}

struct SequenceInner {
    lease: SlotLease,
    queue: Queue,
    total_timestamps: u32,
    command_pool: CommandPoolHandle,
    timestamp_pool: Option<QueryPoolHandle>,
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("key", &self.inner.lease.key())
            .field("queue", &self.inner.queue)
            .field("total_timestamps", &self.inner.total_timestamps)
            .finish()
    }
}

impl Sequence {
    pub(crate) fn create(
        context: &Arc<DeviceContext>,
        arena: &SharedArena,
        queue: Queue,
        total_timestamps: u32,
    ) -> Result<Sequence> {
        let family = queue.family_index();
        if total_timestamps > 0 {
            let supports_timestamps = context
                .queue_families()
                .get(family as usize)
                .map_or(false, |f| f.timestamp_valid_bits > 0);
            if !supports_timestamps {
                return Err(VkoreError::TimestampsUnsupported { family });
            }
        }

        let mut resources = GpuResources::new(Arc::clone(context));
        let command_pool = resources.create_command_pool(family)?;
        let timestamp_pool = if total_timestamps > 0 {
            Some(resources.create_timestamp_pool(total_timestamps)?)
        } else {
            None
        };
        tracing::debug!(
            "vkore: sequence on queue family {} ({} timestamps)",
            family,
            total_timestamps
        );

        let key = arena.lock().insert(ResourceKind::Sequence, resources);
        Ok(Sequence {
            inner: Arc::new(SequenceInner {
                lease: SlotLease::new(Arc::clone(arena), key),
                queue,
                total_timestamps,
                command_pool,
                timestamp_pool,
            }),
        })
    }

    pub fn queue(&self) -> Queue {
        self.inner.queue
    }

    pub fn queue_family_index(&self) -> u32 {
        self.inner.queue.family_index()
    }

    /// Maximum number of timestamps this sequence can latch (0 = profiling disabled).
    pub fn timestamp_capacity(&self) -> u32 {
        self.inner.total_timestamps
    }

    pub fn is_profiling(&self) -> bool {
        self.inner.timestamp_pool.is_some()
    }

    pub fn command_pool(&self) -> CommandPoolHandle {
        self.inner.command_pool
    }

    pub fn timestamp_pool(&self) -> Option<QueryPoolHandle> {
        self.inner.timestamp_pool
    }
}

impl ManagedResource for Sequence {
    const KIND: ResourceKind = ResourceKind::Sequence;

    fn key(&self) -> SlotKey {
        self.inner.lease.key()
    }

    fn is_init(&self) -> bool {
        self.inner.lease.is_live()
    }

    fn destroy(&self) {
        if self.inner.lease.release() {
            tracing::debug!("vkore: sequence {:?} destroyed explicitly", self.key());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ResourceArena;
    use crate::config::ManagerConfig;
    use crate::queue::provision_queues;
    use vkore_driver::{HostDeviceSpec, HostDriver, ObjectKind, QueueFamilyProperties, QueueFlags};

    fn setup(driver: Arc<HostDriver>) -> (Arc<DeviceContext>, Queue) {
        let (ctx, families) = DeviceContext::create(driver, &ManagerConfig::default()).unwrap();
        let queue = provision_queues(&ctx, &families).unwrap()[0];
        (Arc::new(ctx), queue)
    }

    #[test]
    fn test_plain_sequence_has_no_query_pool() {
        let driver = Arc::new(HostDriver::default());
        let (ctx, queue) = setup(driver.clone());
        let arena = ResourceArena::shared();
        let seq = Sequence::create(&ctx, &arena, queue, 0).unwrap();
        assert!(!seq.is_profiling());
        assert_eq!(seq.queue_family_index(), 0);
        assert_eq!(driver.live(ObjectKind::CommandPool), 1);
        assert_eq!(driver.live(ObjectKind::QueryPool), 0);
    }

    #[test]
    fn test_profiling_sequence_allocates_timestamps() {
        let driver = Arc::new(HostDriver::default());
        let (ctx, queue) = setup(driver.clone());
        let arena = ResourceArena::shared();
        let seq = Sequence::create(&ctx, &arena, queue, 16).unwrap();
        assert!(seq.is_profiling());
        assert_eq!(seq.timestamp_capacity(), 16);
        assert_eq!(driver.live(ObjectKind::QueryPool), 1);

        drop(seq);
        assert_eq!(driver.live(ObjectKind::QueryPool), 0);
        assert_eq!(driver.live(ObjectKind::CommandPool), 0);
    }

    #[test]
    fn test_timestamps_unsupported_family() {
        let spec = HostDeviceSpec::new("no-ts").with_queue_families(vec![QueueFamilyProperties {
            flags: QueueFlags::COMPUTE,
            queue_count: 1,
            timestamp_valid_bits: 0,
        }]);
        let driver = Arc::new(HostDriver::new(vec![spec]));
        let (ctx, queue) = setup(driver.clone());
        let arena = ResourceArena::shared();
        let err = Sequence::create(&ctx, &arena, queue, 4).unwrap_err();
        assert!(matches!(err, VkoreError::TimestampsUnsupported { family: 0 }));
        assert_eq!(driver.live(ObjectKind::CommandPool), 0);
        assert_eq!(arena.lock().live_count(), 0);
    }
}
