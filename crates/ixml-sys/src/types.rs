//! Wire types mirroring the vendor header, field for field.

use std::ffi::{c_char, c_uint, c_void};

/// Status code returned by every native call.
pub type Return = c_uint;

pub const SUCCESS: Return = 0;
pub const ERROR_UNINITIALIZED: Return = 1;
pub const ERROR_INVALID_ARGUMENT: Return = 2;
pub const ERROR_NOT_SUPPORTED: Return = 3;
pub const ERROR_NO_PERMISSION: Return = 4;
/// Deprecated: multiple initializations are allowed through ref counting.
pub const ERROR_ALREADY_INITIALIZED: Return = 5;
pub const ERROR_NOT_FOUND: Return = 6;
pub const ERROR_INSUFFICIENT_SIZE: Return = 7;
pub const ERROR_INSUFFICIENT_POWER: Return = 8;
pub const ERROR_DRIVER_NOT_LOADED: Return = 9;
pub const ERROR_TIMEOUT: Return = 10;
pub const ERROR_IRQ_ISSUE: Return = 11;
pub const ERROR_LIBRARY_NOT_FOUND: Return = 12;
pub const ERROR_FUNCTION_NOT_FOUND: Return = 13;
pub const ERROR_CORRUPTED_INFOROM: Return = 14;
pub const ERROR_GPU_IS_LOST: Return = 15;
pub const ERROR_RESET_REQUIRED: Return = 16;
pub const ERROR_OPERATING_SYSTEM: Return = 17;
pub const ERROR_LIB_RM_VERSION_MISMATCH: Return = 18;
pub const ERROR_IN_USE: Return = 19;
pub const ERROR_MEMORY: Return = 20;
pub const ERROR_NO_DATA: Return = 21;
pub const ERROR_VGPU_ECC_NOT_SUPPORTED: Return = 22;
pub const ERROR_INSUFFICIENT_RESOURCES: Return = 23;
pub const ERROR_FREQ_NOT_SUPPORTED: Return = 24;
pub const ERROR_ARGUMENT_VERSION_MISMATCH: Return = 25;
pub const ERROR_UNKNOWN: Return = 999;

/// Temperature sensor selectors.
pub const TEMPERATURE_GPU: c_uint = 0;

/// Clock domain selectors.
pub const CLOCK_GRAPHICS: c_uint = 0;
pub const CLOCK_SM: c_uint = 1;
pub const CLOCK_MEM: c_uint = 2;
pub const CLOCK_VIDEO: c_uint = 3;

/// Buffer guaranteed to hold any GPU UUID, including the terminator.
pub const DEVICE_UUID_BUFFER_SIZE: usize = 80;
/// Buffer guaranteed to hold the driver version string.
pub const SYSTEM_DRIVER_VERSION_BUFFER_SIZE: usize = 80;
/// Buffer guaranteed to hold any device name (v1 query).
pub const DEVICE_NAME_BUFFER_SIZE: usize = 64;
/// Buffer guaranteed to hold any device name (v2 query).
pub const DEVICE_NAME_V2_BUFFER_SIZE: usize = 96;
/// Buffer guaranteed to hold the current-format PCI bus id.
pub const DEVICE_PCI_BUS_ID_BUFFER_SIZE: usize = 32;
/// Buffer guaranteed to hold the legacy-format PCI bus id.
pub const DEVICE_PCI_BUS_ID_BUFFER_V2_SIZE: usize = 16;

/// The `version` value the v2 memory query expects on input.
pub const MEMORY_INFO_VERSION_2: c_uint = 2;

/// MIG instance ids carry this sentinel when MIG is disabled.
pub const VALUE_NOT_AVAILABLE: c_uint = 0xFFFF_FFFF;

/// Opaque driver-owned device handle. Never dereferenced on this side of
/// the boundary; identity is pointer identity.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawDevice(pub *mut c_void);

impl RawDevice {
    pub const fn null() -> Self {
        RawDevice(std::ptr::null_mut())
    }
}

/// Memory usage snapshot, v1 shape. `used` is the sum of reserved and
/// allocated memory.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    pub total: u64,
    pub free: u64,
    pub used: u64,
}

/// Memory usage snapshot, v2 shape. `version` must be set to
/// [`MEMORY_INFO_VERSION_2`] before the call; `used` includes `reserved`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MemoryV2 {
    pub version: c_uint,
    pub total: u64,
    pub reserved: u64,
    pub free: u64,
    pub used: u64,
}

/// GPU and memory activity percentages over the last sample window.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Utilization {
    pub gpu: c_uint,
    pub memory: c_uint,
}

/// One compute process holding a context on a device.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: c_uint,
    pub used_gpu_memory: u64,
    pub gpu_instance_id: c_uint,
    pub compute_instance_id: c_uint,
    pub used_gpu_cc_protected_memory: u64,
}

/// PCI identity and topology of a device.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PciInfo {
    pub bus_id_legacy: [c_char; DEVICE_PCI_BUS_ID_BUFFER_V2_SIZE],
    pub domain: c_uint,
    pub bus: c_uint,
    pub device: c_uint,
    pub pci_device_id: c_uint,
    pub pci_sub_system_id: c_uint,
    pub bus_id: [c_char; DEVICE_PCI_BUS_ID_BUFFER_SIZE],
}

impl Default for PciInfo {
    fn default() -> Self {
        PciInfo {
            bus_id_legacy: [0; DEVICE_PCI_BUS_ID_BUFFER_V2_SIZE],
            domain: 0,
            bus: 0,
            device: 0,
            pci_device_id: 0,
            pci_sub_system_id: 0,
            bus_id: [0; DEVICE_PCI_BUS_ID_BUFFER_SIZE],
        }
    }
}
