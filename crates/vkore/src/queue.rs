//! Compute queue provisioning.
//!
//! Queue families are chosen once, when the device is opened, and their queue handles are
//! fetched once and cached by the manager; sequences pick from that cached set.

use vkore_driver::{QueueFamilyProperties, QueueHandle};

use crate::context::DeviceContext;
use crate::{Result, VkoreError};

/// A compute queue retrieved from the logical device.
///
/// Queues are never destroyed individually; they go away with their device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Queue {
    family_index: u32,
    handle: QueueHandle,
}

impl Queue {
    pub fn family_index(&self) -> u32 {
        self.family_index
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle
    }
}

/// First queue family that supports compute.
pub fn default_compute_family(families: &[QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .position(QueueFamilyProperties::supports_compute)
        .map(|i| i as u32)
}

/// Resolve the queue families to open.
///
/// An empty request selects the default compute family. Requested families are
/// deduplicated, keeping first-occurrence order, and each must exist and support compute.
pub fn select_queue_families(
    families: &[QueueFamilyProperties],
    requested: &[u32],
) -> Result<Vec<u32>> {
    if requested.is_empty() {
        return default_compute_family(families)
            .map(|family| vec![family])
            .ok_or(VkoreError::NoComputeQueue);
    }

    let mut selected = Vec::with_capacity(requested.len());
    for &family in requested {
        let props = families
            .get(family as usize)
            .ok_or(VkoreError::QueueFamilyMissing {
                family,
                available: families.len(),
            })?;
        if !props.supports_compute() {
            return Err(VkoreError::QueueFamilyNotCompute { family });
        }
        if !selected.contains(&family) {
            selected.push(family);
        }
    }
    Ok(selected)
}

/// Resolve the queue families to use on an adopted device.
///
/// Only the families in `enabled` (those the device was created with) qualify. An empty
/// request selects the first enabled family that supports compute.
pub fn select_enabled_families(
    families: &[QueueFamilyProperties],
    enabled: &[u32],
    requested: &[u32],
) -> Result<Vec<u32>> {
    if requested.is_empty() {
        return enabled
            .iter()
            .copied()
            .find(|&f| families.get(f as usize).is_some_and(|p| p.supports_compute()))
            .map(|family| vec![family])
            .ok_or(VkoreError::NoComputeQueue);
    }

    let selected = select_queue_families(families, requested)?;
    if let Some(&family) = selected.iter().find(|f| !enabled.contains(f)) {
        return Err(VkoreError::QueueFamilyNotEnabled { family });
    }
    Ok(selected)
}

/// Fetch queue 0 of every selected family.
pub fn provision_queues(context: &DeviceContext, families: &[u32]) -> Result<Vec<Queue>> {
    families
        .iter()
        .map(|&family_index| {
            let handle = context
                .driver()
                .get_queue(context.device(), family_index, 0)?;
            tracing::debug!("vkore: queue family {} -> {}", family_index, handle);
            Ok(Queue {
                family_index,
                handle,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkore_driver::QueueFlags;

    fn family(flags: QueueFlags) -> QueueFamilyProperties {
        QueueFamilyProperties {
            flags,
            queue_count: 1,
            timestamp_valid_bits: 64,
        }
    }

    fn families() -> Vec<QueueFamilyProperties> {
        vec![
            family(QueueFlags::GRAPHICS),
            family(QueueFlags::COMPUTE | QueueFlags::TRANSFER),
            family(QueueFlags::TRANSFER),
            family(QueueFlags::COMPUTE),
        ]
    }

    #[test]
    fn test_default_is_first_compute_family() {
        assert_eq!(select_queue_families(&families(), &[]).unwrap(), vec![1]);
    }

    #[test]
    fn test_requested_families_deduplicated_in_order() {
        let selected = select_queue_families(&families(), &[3, 1, 3, 1]).unwrap();
        assert_eq!(selected, vec![3, 1]);
    }

    #[test]
    fn test_missing_family() {
        let err = select_queue_families(&families(), &[1, 7]).unwrap_err();
        assert!(matches!(
            err,
            VkoreError::QueueFamilyMissing { family: 7, available: 4 }
        ));
    }

    #[test]
    fn test_non_compute_family_rejected() {
        let err = select_queue_families(&families(), &[2]).unwrap_err();
        assert!(matches!(err, VkoreError::QueueFamilyNotCompute { family: 2 }));
    }

    #[test]
    fn test_enabled_default_skips_non_compute() {
        let selected = select_enabled_families(&families(), &[2, 3, 1], &[]).unwrap();
        assert_eq!(selected, vec![3]);
    }

    #[test]
    fn test_enabled_rejects_family_not_on_device() {
        let err = select_enabled_families(&families(), &[1], &[1, 3]).unwrap_err();
        assert!(matches!(err, VkoreError::QueueFamilyNotEnabled { family: 3 }));
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_enabled_without_compute() {
        assert!(matches!(
            select_enabled_families(&families(), &[0, 2], &[]),
            Err(VkoreError::NoComputeQueue)
        ));
    }

    #[test]
    fn test_no_compute_family() {
        let fams = vec![family(QueueFlags::GRAPHICS)];
        assert!(matches!(
            select_queue_families(&fams, &[]),
            Err(VkoreError::NoComputeQueue)
        ));
    }
}
