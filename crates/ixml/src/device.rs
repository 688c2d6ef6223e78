//! Opaque device handles and their telemetry queries.

use std::ffi::{c_char, c_int, c_uint};
use std::ptr;

use ixml_sys::{IxmlFnTable, RawDevice};

use crate::enums::{Clock, TemperatureSensor};
use crate::error::{check, IxmlError};
use crate::structs::{
    string_from_buf, GpuVoltage, MemoryInfo, MemoryInfoV2, PciInfo, ProcessInfo, Utilization,
};
use crate::Ixml;

/// How many times the two-phase process query restarts when the process
/// set keeps growing between the probe and the fill call.
const PROCESS_QUERY_ATTEMPTS: usize = 5;

/// An opaque, driver-owned reference to one physical (or MIG virtual) GPU.
///
/// Handles are only obtainable through [`Ixml::device_by_index`] and
/// [`Ixml::device_by_uuid`], compare by underlying pointer identity, and
/// borrow the `Ixml` they came from so they cannot outlive the library
/// reference. Every query below is a stateless, read-only snapshot.
#[derive(Clone, Copy)]
pub struct Device<'ixml> {
    raw: RawDevice,
    ixml: &'ixml Ixml,
}

// The native library is documented as safe for concurrent calls from
// multiple threads, and the handle itself is an opaque pointer the driver
// owns for the lifetime of the process.
unsafe impl Send for Device<'_> {}
unsafe impl Sync for Device<'_> {}

impl PartialEq for Device<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Device<'_> {}

impl std::fmt::Debug for Device<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Device").field(&self.raw.0).finish()
    }
}

impl<'ixml> Device<'ixml> {
    pub(crate) fn new(raw: RawDevice, ixml: &'ixml Ixml) -> Self {
        Device { raw, ixml }
    }

    fn table(&self) -> &IxmlFnTable {
        debug_assert!(
            self.ixml.registry().is_loaded(),
            "device handle used after library shutdown"
        );
        self.ixml.table()
    }

    /// Product name, e.g. "Iluvatar BI-V100".
    pub fn name(&self) -> Result<String, IxmlError> {
        let mut buf = [0 as c_char; ixml_sys::DEVICE_NAME_V2_BUFFER_SIZE];
        check(unsafe {
            (self.table().device_get_name)(self.raw, buf.as_mut_ptr(), buf.len() as c_uint)
        })?;
        string_from_buf(&buf)
    }

    /// Globally unique, immutable device UUID.
    pub fn uuid(&self) -> Result<String, IxmlError> {
        let mut buf = [0 as c_char; ixml_sys::DEVICE_UUID_BUFFER_SIZE];
        check(unsafe {
            (self.table().device_get_uuid)(self.raw, buf.as_mut_ptr(), buf.len() as c_uint)
        })?;
        string_from_buf(&buf)
    }

    /// Minor number of the device node (`/dev/<vendor><minor>`).
    pub fn minor_number(&self) -> Result<u32, IxmlError> {
        let mut minor: c_uint = 0;
        check(unsafe { (self.table().device_get_minor_number)(self.raw, &mut minor) })?;
        Ok(minor)
    }

    /// Current reading of the given temperature sensor, in degrees C.
    pub fn temperature(&self, sensor: TemperatureSensor) -> Result<u32, IxmlError> {
        let mut temp: c_uint = 0;
        check(unsafe {
            (self.table().device_get_temperature)(self.raw, sensor.as_c(), &mut temp)
        })?;
        Ok(temp)
    }

    /// Intended fan speed as a percentage of the maximum; may exceed 100.
    pub fn fan_speed(&self) -> Result<u32, IxmlError> {
        let mut speed: c_uint = 0;
        check(unsafe { (self.table().device_get_fan_speed)(self.raw, &mut speed) })?;
        Ok(speed)
    }

    /// Intended speed of the fan at `fan_idx`, zero indexed.
    pub fn fan_speed_for(&self, fan_idx: u32) -> Result<u32, IxmlError> {
        let mut speed: c_uint = 0;
        check(unsafe {
            (self.table().device_get_fan_speed_v2)(self.raw, fan_idx, &mut speed)
        })?;
        Ok(speed)
    }

    /// Current clock speed of the given domain, in MHz.
    pub fn clock_info(&self, clock: Clock) -> Result<u32, IxmlError> {
        let mut mhz: c_uint = 0;
        check(unsafe {
            (self.table().device_get_clock_info)(self.raw, clock.as_c(), &mut mhz)
        })?;
        Ok(mhz)
    }

    /// Memory usage snapshot, v1 shape.
    pub fn memory_info(&self) -> Result<MemoryInfo, IxmlError> {
        let mut raw = ixml_sys::Memory::default();
        check(unsafe { (self.table().device_get_memory_info)(self.raw, &mut raw) })?;
        Ok(raw.into())
    }

    /// Memory usage snapshot, v2 shape, which adds the system-reserved
    /// amount. Note that v2 `used` already includes `reserved`.
    pub fn memory_info_v2(&self) -> Result<MemoryInfoV2, IxmlError> {
        let mut raw = ixml_sys::MemoryV2 {
            version: ixml_sys::MEMORY_INFO_VERSION_2,
            ..Default::default()
        };
        check(unsafe { (self.table().device_get_memory_info_v2)(self.raw, &mut raw) })?;
        Ok(raw.into())
    }

    /// GPU and memory activity over the last sample window.
    pub fn utilization_rates(&self) -> Result<Utilization, IxmlError> {
        let mut raw = ixml_sys::Utilization::default();
        check(unsafe { (self.table().device_get_utilization_rates)(self.raw, &mut raw) })?;
        Ok(raw.into())
    }

    /// PCI identity and topology.
    pub fn pci_info(&self) -> Result<PciInfo, IxmlError> {
        let mut raw = ixml_sys::PciInfo::default();
        check(unsafe { (self.table().device_get_pci_info)(self.raw, &mut raw) })?;
        PciInfo::from_raw(&raw)
    }

    /// Enumeration index of this device. Not stable across
    /// re-initialization; prefer [`Device::uuid`] for identity.
    pub fn index(&self) -> Result<u32, IxmlError> {
        let mut index: c_uint = 0;
        check(unsafe { (self.table().device_get_index)(self.raw, &mut index) })?;
        Ok(index)
    }

    /// Power draw of the GPU and its circuitry, in milliwatts.
    pub fn power_usage(&self) -> Result<u32, IxmlError> {
        let mut milliwatts: c_uint = 0;
        check(unsafe { (self.table().device_get_power_usage)(self.raw, &mut milliwatts) })?;
        Ok(milliwatts)
    }

    /// Whether this device sits on the same physical board as `other`.
    pub fn on_same_board(&self, other: &Device<'_>) -> Result<bool, IxmlError> {
        let mut on_same_board: c_int = 0;
        check(unsafe {
            (self.table().device_on_same_board)(self.raw, other.raw, &mut on_same_board)
        })?;
        Ok(on_same_board != 0)
    }

    /// Board position of this device (vendor extension).
    pub fn board_position(&self) -> Result<u32, IxmlError> {
        let mut position: c_uint = 0;
        check(unsafe { (self.table().device_get_board_position)(self.raw, &mut position) })?;
        Ok(position)
    }

    /// GPU core voltage as integer and fractional parts (vendor extension).
    pub fn gpu_voltage(&self) -> Result<GpuVoltage, IxmlError> {
        let mut integer: c_uint = 0;
        let mut decimal: c_uint = 0;
        check(unsafe {
            (self.table().device_get_gpu_voltage)(self.raw, &mut integer, &mut decimal)
        })?;
        Ok(GpuVoltage { integer, decimal })
    }

    /// Processes currently holding a compute context on this device.
    ///
    /// The result cardinality is unknown in advance, so this probes with
    /// capacity zero to learn the required count, allocates exactly that
    /// many entries, and fills them. If the process set grows between the
    /// two calls the whole sequence restarts, a bounded number of times,
    /// before the size failure is surfaced.
    pub fn running_compute_processes(&self) -> Result<Vec<ProcessInfo>, IxmlError> {
        let query = self.table().device_get_compute_running_processes;
        let mut last_count: c_uint = 0;
        for _ in 0..PROCESS_QUERY_ATTEMPTS {
            let mut count: c_uint = 0;
            match unsafe { query(self.raw, &mut count, ptr::null_mut()) } {
                ixml_sys::SUCCESS => return Ok(Vec::new()),
                ixml_sys::ERROR_INSUFFICIENT_SIZE => {}
                other => return Err(IxmlError::from_code(other)),
            }

            let mut infos = vec![ixml_sys::ProcessInfo::default(); count as usize];
            let mut filled = count;
            match unsafe { query(self.raw, &mut filled, infos.as_mut_ptr()) } {
                ixml_sys::SUCCESS => {
                    infos.truncate(filled as usize);
                    return Ok(infos.into_iter().map(ProcessInfo::from).collect());
                }
                // The set grew between the probe and the fill; re-probe.
                ixml_sys::ERROR_INSUFFICIENT_SIZE => last_count = filled,
                other => return Err(IxmlError::from_code(other)),
            }
        }
        Err(IxmlError::InsufficientSize(Some(last_count)))
    }
}
