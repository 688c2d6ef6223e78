//! Owned snapshot values returned by telemetry queries.
//!
//! Each of these is constructed fresh per query from the `#[repr(C)]` wire
//! struct the driver filled; no raw buffer crosses the public boundary.

use std::ffi::c_char;

use serde::{Deserialize, Serialize};

use crate::error::IxmlError;

/// Memory usage snapshot, v1 shape. All amounts are bytes. `used` is the
/// allocated amount and does not include the driver's reserved carve-out.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total: u64,
    pub free: u64,
    pub used: u64,
}

/// Memory usage snapshot, v2 shape. All amounts are bytes.
///
/// `used` already includes `reserved`; subtract it to compare against the
/// v1 `used` amount.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInfoV2 {
    /// Structure format version reported by the driver, always 2.
    pub version: u32,
    pub total: u64,
    pub reserved: u64,
    pub free: u64,
    pub used: u64,
}

/// GPU and memory activity percentages over the last sample window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utilization {
    pub gpu: u32,
    pub memory: u32,
}

/// PCI identity and topology of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PciInfo {
    pub domain: u32,
    pub bus: u32,
    pub device: u32,
    /// Combined 16-bit device id and 16-bit vendor id.
    pub pci_device_id: u32,
    pub pci_sub_system_id: u32,
    /// `domain:bus:device.function`, current encoding.
    pub bus_id: String,
    /// `domain:bus:device.function`, legacy encoding.
    pub bus_id_legacy: String,
}

/// One compute process currently holding a context on a device.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Bytes of device memory used by the process.
    pub used_gpu_memory: u64,
    /// MIG GPU instance id; `None` when MIG is disabled.
    pub gpu_instance_id: Option<u32>,
    /// MIG compute instance id; `None` when MIG is disabled.
    pub compute_instance_id: Option<u32>,
    /// Bytes of confidential-compute protected memory used by the process.
    pub used_gpu_cc_protected_memory: u64,
}

/// GPU core voltage, split by the vendor extension into integer and
/// fractional parts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuVoltage {
    pub integer: u32,
    pub decimal: u32,
}

impl From<ixml_sys::Memory> for MemoryInfo {
    fn from(raw: ixml_sys::Memory) -> Self {
        MemoryInfo {
            total: raw.total,
            free: raw.free,
            used: raw.used,
        }
    }
}

impl From<ixml_sys::MemoryV2> for MemoryInfoV2 {
    fn from(raw: ixml_sys::MemoryV2) -> Self {
        MemoryInfoV2 {
            version: raw.version,
            total: raw.total,
            reserved: raw.reserved,
            free: raw.free,
            used: raw.used,
        }
    }
}

impl From<ixml_sys::Utilization> for Utilization {
    fn from(raw: ixml_sys::Utilization) -> Self {
        Utilization {
            gpu: raw.gpu,
            memory: raw.memory,
        }
    }
}

impl From<ixml_sys::ProcessInfo> for ProcessInfo {
    fn from(raw: ixml_sys::ProcessInfo) -> Self {
        let mig_id = |id: u32| (id != ixml_sys::VALUE_NOT_AVAILABLE).then_some(id);
        ProcessInfo {
            pid: raw.pid,
            used_gpu_memory: raw.used_gpu_memory,
            gpu_instance_id: mig_id(raw.gpu_instance_id),
            compute_instance_id: mig_id(raw.compute_instance_id),
            used_gpu_cc_protected_memory: raw.used_gpu_cc_protected_memory,
        }
    }
}

impl PciInfo {
    pub(crate) fn from_raw(raw: &ixml_sys::PciInfo) -> Result<Self, IxmlError> {
        Ok(PciInfo {
            domain: raw.domain,
            bus: raw.bus,
            device: raw.device,
            pci_device_id: raw.pci_device_id,
            pci_sub_system_id: raw.pci_sub_system_id,
            bus_id: string_from_buf(&raw.bus_id)?,
            bus_id_legacy: string_from_buf(&raw.bus_id_legacy)?,
        })
    }
}

/// Copies the logical content out of a driver-filled text buffer: bytes up
/// to the first NUL, decoded as UTF-8, with the padding whitespace some
/// firmware revisions append stripped.
pub(crate) fn string_from_buf(buf: &[c_char]) -> Result<String, IxmlError> {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    let text = std::str::from_utf8(&bytes)?;
    Ok(text.trim_end().to_owned())
}
