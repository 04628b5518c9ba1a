//! Non-owning registry of resources created by a manager.
//!
//! The registry only holds [`SlotKey`]s. It never keeps a resource alive and is only used
//! for bulk cleanup: [`sweep`](ResourceRegistry::sweep) forgets keys whose resource is
//! already gone, [`drain`](ResourceRegistry::drain) force-releases whatever is still live
//! and forgets everything.

use crate::arena::{ResourceArena, ResourceKind, SlotKey};

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    tensors: Vec<SlotKey>,
    sequences: Vec<SlotKey>,
    algorithms: Vec<SlotKey>,
}

/// Outcome of a [`ResourceRegistry::drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainStats {
    /// Entries whose resource was still live and has now been released.
    pub released: usize,
    /// Entries whose resource had already been released elsewhere.
    pub expired: usize,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self, kind: ResourceKind) -> &Vec<SlotKey> {
        match kind {
            ResourceKind::Tensor => &self.tensors,
            ResourceKind::Sequence => &self.sequences,
            ResourceKind::Algorithm => &self.algorithms,
        }
    }

    fn entries_mut(&mut self, kind: ResourceKind) -> &mut Vec<SlotKey> {
        match kind {
            ResourceKind::Tensor => &mut self.tensors,
            ResourceKind::Sequence => &mut self.sequences,
            ResourceKind::Algorithm => &mut self.algorithms,
        }
    }

    pub fn register(&mut self, kind: ResourceKind, key: SlotKey) {
        self.entries_mut(kind).push(key);
    }

    /// Tracked entries of `kind`, live or expired.
    pub fn len(&self, kind: ResourceKind) -> usize {
        self.entries(kind).len()
    }

    pub fn total(&self) -> usize {
        self.tensors.len() + self.sequences.len() + self.algorithms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Tracked keys of `kind`, in registration order.
    pub fn keys(&self, kind: ResourceKind) -> &[SlotKey] {
        self.entries(kind)
    }

    /// Forget every entry whose resource has already been released. Live resources are
    /// not touched. Returns the number of entries removed.
    pub fn sweep(&mut self, arena: &ResourceArena) -> usize {
        let before = self.total();
        for kind in ResourceKind::ALL {
            self.entries_mut(kind).retain(|&key| arena.is_live(key));
        }
        let removed = before - self.total();
        tracing::debug!("vkore: registry sweep removed {} expired entries", removed);
        removed
    }

    /// Release every still-live tracked resource, then forget all entries.
    ///
    /// Sequences go first, then algorithms, then tensors, so dependents are released
    /// before the tensors they were built on.
    pub fn drain(&mut self, arena: &mut ResourceArena) -> DrainStats {
        let mut stats = DrainStats::default();
        for kind in [
            ResourceKind::Sequence,
            ResourceKind::Algorithm,
            ResourceKind::Tensor,
        ] {
            for key in std::mem::take(self.entries_mut(kind)) {
                match arena.take(key) {
                    Some(occupant) => {
                        drop(occupant);
                        stats.released += 1;
                    }
                    None => stats.expired += 1,
                }
            }
        }
        tracing::debug!(
            "vkore: registry drain released {} resources ({} already expired)",
            stats.released,
            stats.expired
        );
        stats
    }
}
