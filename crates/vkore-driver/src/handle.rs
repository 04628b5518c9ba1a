//! Typed handles for native GPU objects.
//!
//! Every handle is a plain 64-bit value as the native API hands it out. Handles confer no
//! ownership; whoever created an object decides when it is destroyed.

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Short object-type label used in diagnostics.
            pub const KIND: &'static str = $label;

            /// Wrap a raw native handle value.
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw native handle value.
            pub const fn as_raw(self) -> u64 {
                self.0
            }

            /// Whether this is the null handle.
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({:#x})", $label, self.0)
            }
        }
    };
}

define_handle!(
    /// API instance.
    InstanceHandle, "instance"
);
define_handle!(
    /// Physical GPU as enumerated by an instance.
    PhysicalDeviceHandle, "physical-device"
);
define_handle!(
    /// Logical device opened on a physical device.
    DeviceHandle, "device"
);
define_handle!(
    /// Execution queue retrieved from a logical device.
    QueueHandle, "queue"
);
define_handle!(BufferHandle, "buffer");
define_handle!(MemoryHandle, "memory");
define_handle!(ShaderModuleHandle, "shader-module");
define_handle!(CommandPoolHandle, "command-pool");
define_handle!(QueryPoolHandle, "query-pool");
