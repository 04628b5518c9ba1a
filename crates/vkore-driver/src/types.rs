//! Descriptive records exchanged across the driver boundary.

use std::fmt;

/// Kind of physical device, mirroring the native device-type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceType {
    #[default]
    Other,
    IntegratedGpu,
    DiscreteGpu,
    VirtualGpu,
    Cpu,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Other => write!(f, "other"),
            DeviceType::IntegratedGpu => write!(f, "integrated-gpu"),
            DeviceType::DiscreteGpu => write!(f, "discrete-gpu"),
            DeviceType::VirtualGpu => write!(f, "virtual-gpu"),
            DeviceType::Cpu => write!(f, "cpu"),
        }
    }
}

/// Descriptive properties of a physical device.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalDeviceProperties {
    pub device_name: String,
    pub device_type: DeviceType,
    pub vendor_id: u32,
    pub device_id: u32,
    /// Packed API version (`major << 22 | minor << 12 | patch`).
    pub api_version: u32,
    pub driver_version: u32,
    pub max_compute_workgroup_count: [u32; 3],
    pub max_compute_workgroup_size: [u32; 3],
    pub max_compute_workgroup_invocations: u32,
    /// Nanoseconds per timestamp tick.
    pub timestamp_period: f32,
}

impl PhysicalDeviceProperties {
    /// Pack an API version the way the native API does.
    pub const fn make_api_version(major: u32, minor: u32, patch: u32) -> u32 {
        (major << 22) | (minor << 12) | patch
    }

    /// `(major, minor, patch)` of the supported API version.
    pub fn api_version_triple(&self) -> (u32, u32, u32) {
        (
            (self.api_version >> 22) & 0x7f,
            (self.api_version >> 12) & 0x3ff,
            self.api_version & 0xfff,
        )
    }
}

impl fmt::Display for PhysicalDeviceProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor, patch) = self.api_version_triple();
        write!(
            f,
            "{} ({}, vendor {:#06x}, device {:#06x}, api {}.{}.{})",
            self.device_name, self.device_type, self.vendor_id, self.device_id, major, minor, patch
        )
    }
}

/// Capability bits of a queue family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QueueFlags(u32);

impl QueueFlags {
    pub const GRAPHICS: QueueFlags = QueueFlags(0x1);
    pub const COMPUTE: QueueFlags = QueueFlags(0x2);
    pub const TRANSFER: QueueFlags = QueueFlags(0x4);

    pub const fn empty() -> Self {
        QueueFlags(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        QueueFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: QueueFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for QueueFlags {
    type Output = QueueFlags;

    fn bitor(self, rhs: QueueFlags) -> QueueFlags {
        QueueFlags(self.0 | rhs.0)
    }
}

/// Properties of one queue family on a physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyProperties {
    pub flags: QueueFlags,
    pub queue_count: u32,
    /// Valid bits in timestamps written on this family (0 = no timestamp support).
    pub timestamp_valid_bits: u32,
}

impl QueueFamilyProperties {
    pub fn supports_compute(&self) -> bool {
        self.flags.contains(QueueFlags::COMPUTE) && self.queue_count > 0
    }
}

/// Where a buffer's backing memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// Device-local memory, not mappable from the host.
    DeviceLocal,
    /// Host-visible, host-coherent memory.
    HostVisible,
}

impl fmt::Display for MemoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryLocation::DeviceLocal => write!(f, "device-local"),
            MemoryLocation::HostVisible => write!(f, "host-visible"),
        }
    }
}

/// Khronos validation layer.
pub const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Instance extension providing debug messengers.
pub const DEBUG_UTILS_EXTENSION: &str = "VK_EXT_debug_utils";

/// Parameters for instance creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceDesc {
    pub application_name: String,
    pub api_version: u32,
    pub extensions: Vec<String>,
    pub layers: Vec<String>,
    /// Install a debug messenger forwarding validation output to `tracing`. Requires
    /// [`DEBUG_UTILS_EXTENSION`] in `extensions`.
    pub debug_messenger: bool,
}

/// Parameters for logical device creation: one queue per listed family.
#[derive(Debug, Clone, Default)]
pub struct DeviceDesc {
    pub queue_families: Vec<u32>,
    pub extensions: Vec<String>,
}
