//! A mock driver standing in for the vendor `.so` in tests.
//!
//! The function table is built from plain `extern "C"` fns over a fixed
//! two-device fixture, so the lifecycle, marshaling and retry logic run
//! against the same ABI surface the real library presents.

use std::ffi::{c_char, c_int, c_uint, c_void, CStr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ixml_sys::*;

use crate::registry::Registry;
use crate::Ixml;

pub(crate) const DEVICE_COUNT: u32 = 2;
pub(crate) const FAN_COUNT: u32 = 4;

const UUIDS: [&str; 2] = [
    "GPU-8f6c0a14-0000-0000-0000-000000000001",
    "GPU-8f6c0a14-0000-0000-0000-000000000002",
];
const NAME: &str = "Iluvatar BI-V100";
const DRIVER_VERSION: &str = "4.2.0";

// 32 GiB total, 256 MiB reserved, 2 GiB allocated. The v1 `used` amount
// excludes the reserved carve-out; the v2 amount includes it.
const MEM_TOTAL: u64 = 32 << 30;
const MEM_RESERVED: u64 = 256 << 20;
const MEM_USED_V1: u64 = 2 << 30;

const PIDS: [c_uint; 3] = [101, 202, 303];

fn handle(index: usize) -> RawDevice {
    RawDevice((0x1000 * (index + 1)) as *mut c_void)
}

fn index_of(device: RawDevice) -> Option<usize> {
    (0..DEVICE_COUNT as usize).find(|&i| handle(i) == device)
}

unsafe fn write_text(dst: *mut c_char, cap: c_uint, text: &str) -> Return {
    if (cap as usize) <= text.len() {
        return ERROR_INSUFFICIENT_SIZE;
    }
    for (i, byte) in text.bytes().enumerate() {
        *dst.add(i) = byte as c_char;
    }
    *dst.add(text.len()) = 0;
    SUCCESS
}

unsafe extern "C" fn mock_init() -> Return {
    SUCCESS
}

unsafe extern "C" fn mock_shutdown() -> Return {
    SUCCESS
}

unsafe extern "C" fn mock_device_count(count: *mut c_uint) -> Return {
    *count = DEVICE_COUNT;
    SUCCESS
}

unsafe extern "C" fn mock_handle_by_index(index: c_uint, device: *mut RawDevice) -> Return {
    if index >= DEVICE_COUNT {
        return ERROR_INVALID_ARGUMENT;
    }
    *device = handle(index as usize);
    SUCCESS
}

unsafe extern "C" fn mock_handle_by_uuid(uuid: *const c_char, device: *mut RawDevice) -> Return {
    let Ok(wanted) = CStr::from_ptr(uuid).to_str() else {
        return ERROR_INVALID_ARGUMENT;
    };
    match UUIDS.iter().position(|&u| u == wanted) {
        Some(index) => {
            *device = handle(index);
            SUCCESS
        }
        None => ERROR_NOT_FOUND,
    }
}

unsafe extern "C" fn mock_minor_number(device: RawDevice, minor: *mut c_uint) -> Return {
    match index_of(device) {
        Some(index) => {
            *minor = index as c_uint;
            SUCCESS
        }
        None => ERROR_INVALID_ARGUMENT,
    }
}

unsafe extern "C" fn mock_uuid(device: RawDevice, buf: *mut c_char, len: c_uint) -> Return {
    match index_of(device) {
        Some(index) => write_text(buf, len, UUIDS[index]),
        None => ERROR_INVALID_ARGUMENT,
    }
}

unsafe extern "C" fn mock_name(device: RawDevice, buf: *mut c_char, len: c_uint) -> Return {
    match index_of(device) {
        Some(_) => write_text(buf, len, NAME),
        None => ERROR_INVALID_ARGUMENT,
    }
}

unsafe extern "C" fn mock_driver_version(buf: *mut c_char, len: c_uint) -> Return {
    write_text(buf, len, DRIVER_VERSION)
}

unsafe extern "C" fn mock_cuda_version(version: *mut c_int) -> Return {
    *version = 10020;
    SUCCESS
}

unsafe extern "C" fn mock_cuda_version_v2(version: *mut c_int) -> Return {
    *version = 11080;
    SUCCESS
}

unsafe extern "C" fn mock_temperature(
    device: RawDevice,
    sensor: c_uint,
    temp: *mut c_uint,
) -> Return {
    if index_of(device).is_none() || sensor != TEMPERATURE_GPU {
        return ERROR_INVALID_ARGUMENT;
    }
    *temp = 45;
    SUCCESS
}

unsafe extern "C" fn mock_fan_speed(device: RawDevice, speed: *mut c_uint) -> Return {
    match index_of(device) {
        Some(_) => {
            *speed = 30;
            SUCCESS
        }
        None => ERROR_INVALID_ARGUMENT,
    }
}

unsafe extern "C" fn mock_fan_speed_v2(
    device: RawDevice,
    fan: c_uint,
    speed: *mut c_uint,
) -> Return {
    if index_of(device).is_none() || fan >= FAN_COUNT {
        return ERROR_INVALID_ARGUMENT;
    }
    *speed = 30 + fan;
    SUCCESS
}

unsafe extern "C" fn mock_clock_info(
    device: RawDevice,
    clock: c_uint,
    mhz: *mut c_uint,
) -> Return {
    if index_of(device).is_none() {
        return ERROR_INVALID_ARGUMENT;
    }
    *mhz = match clock {
        CLOCK_GRAPHICS | CLOCK_SM => 1500,
        CLOCK_MEM => 1200,
        CLOCK_VIDEO => 1000,
        _ => return ERROR_INVALID_ARGUMENT,
    };
    SUCCESS
}

unsafe extern "C" fn mock_memory_info(device: RawDevice, memory: *mut Memory) -> Return {
    match index_of(device) {
        Some(_) => {
            *memory = Memory {
                total: MEM_TOTAL,
                free: MEM_TOTAL - MEM_USED_V1 - MEM_RESERVED,
                used: MEM_USED_V1,
            };
            SUCCESS
        }
        None => ERROR_INVALID_ARGUMENT,
    }
}

unsafe extern "C" fn mock_memory_info_v2(device: RawDevice, memory: *mut MemoryV2) -> Return {
    if index_of(device).is_none() {
        return ERROR_INVALID_ARGUMENT;
    }
    if (*memory).version != MEMORY_INFO_VERSION_2 {
        return ERROR_ARGUMENT_VERSION_MISMATCH;
    }
    *memory = MemoryV2 {
        version: MEMORY_INFO_VERSION_2,
        total: MEM_TOTAL,
        reserved: MEM_RESERVED,
        free: MEM_TOTAL - MEM_USED_V1 - MEM_RESERVED,
        used: MEM_USED_V1 + MEM_RESERVED,
    };
    SUCCESS
}

unsafe extern "C" fn mock_utilization(
    device: RawDevice,
    utilization: *mut Utilization,
) -> Return {
    match index_of(device) {
        Some(_) => {
            *utilization = Utilization { gpu: 37, memory: 12 };
            SUCCESS
        }
        None => ERROR_INVALID_ARGUMENT,
    }
}

unsafe extern "C" fn mock_pci_info(device: RawDevice, pci: *mut PciInfo) -> Return {
    let Some(index) = index_of(device) else {
        return ERROR_INVALID_ARGUMENT;
    };
    let bus = 0x3bu32 + index as u32;
    let mut out = PciInfo {
        domain: 0,
        bus,
        device: 0,
        pci_device_id: 0x1df6_10de,
        pci_sub_system_id: 0x12fa_10de,
        ..Default::default()
    };
    let current = format!("00000000:{bus:02X}:00.0");
    let legacy = format!("0000:{bus:02X}:00.0");
    write_text(out.bus_id.as_mut_ptr(), out.bus_id.len() as c_uint, &current);
    write_text(
        out.bus_id_legacy.as_mut_ptr(),
        out.bus_id_legacy.len() as c_uint,
        &legacy,
    );
    *pci = out;
    SUCCESS
}

unsafe extern "C" fn mock_index(device: RawDevice, index: *mut c_uint) -> Return {
    match index_of(device) {
        Some(i) => {
            *index = i as c_uint;
            SUCCESS
        }
        None => ERROR_INVALID_ARGUMENT,
    }
}

unsafe extern "C" fn mock_power_usage(device: RawDevice, milliwatts: *mut c_uint) -> Return {
    match index_of(device) {
        Some(_) => {
            *milliwatts = 250_000;
            SUCCESS
        }
        None => ERROR_INVALID_ARGUMENT,
    }
}

unsafe extern "C" fn mock_on_same_board(
    device1: RawDevice,
    device2: RawDevice,
    on_same_board: *mut c_int,
) -> Return {
    if index_of(device1).is_none() || index_of(device2).is_none() {
        return ERROR_INVALID_ARGUMENT;
    }
    *on_same_board = (device1 == device2) as c_int;
    SUCCESS
}

// Device 0 runs three compute processes; device 1 is idle.
unsafe extern "C" fn mock_processes(
    device: RawDevice,
    count: *mut c_uint,
    infos: *mut ProcessInfo,
) -> Return {
    let Some(index) = index_of(device) else {
        return ERROR_INVALID_ARGUMENT;
    };
    if index == 1 {
        *count = 0;
        return SUCCESS;
    }
    if (*count as usize) < PIDS.len() {
        *count = PIDS.len() as c_uint;
        return ERROR_INSUFFICIENT_SIZE;
    }
    for (i, &pid) in PIDS.iter().enumerate() {
        *infos.add(i) = ProcessInfo {
            pid,
            used_gpu_memory: (256 << 20) * (i as u64 + 1),
            gpu_instance_id: VALUE_NOT_AVAILABLE,
            compute_instance_id: VALUE_NOT_AVAILABLE,
            used_gpu_cc_protected_memory: 0,
        };
    }
    *count = PIDS.len() as c_uint;
    SUCCESS
}

// Reports one more process than whatever capacity the caller brought, so
// the fill phase never succeeds.
unsafe extern "C" fn mock_growing_processes(
    _device: RawDevice,
    count: *mut c_uint,
    infos: *mut ProcessInfo,
) -> Return {
    if infos.is_null() {
        *count = PIDS.len() as c_uint;
    } else {
        *count += 1;
    }
    ERROR_INSUFFICIENT_SIZE
}

unsafe extern "C" fn mock_board_position(device: RawDevice, position: *mut c_uint) -> Return {
    match index_of(device) {
        Some(index) => {
            *position = index as c_uint;
            SUCCESS
        }
        None => ERROR_INVALID_ARGUMENT,
    }
}

unsafe extern "C" fn mock_gpu_voltage(
    device: RawDevice,
    integer: *mut c_uint,
    decimal: *mut c_uint,
) -> Return {
    match index_of(device) {
        Some(_) => {
            *integer = 0;
            *decimal = 850;
            SUCCESS
        }
        None => ERROR_INVALID_ARGUMENT,
    }
}

fn table() -> IxmlFnTable {
    IxmlFnTable {
        init: mock_init,
        shutdown: mock_shutdown,
        device_get_count: mock_device_count,
        device_get_handle_by_index: mock_handle_by_index,
        device_get_handle_by_uuid: mock_handle_by_uuid,
        device_get_minor_number: mock_minor_number,
        device_get_uuid: mock_uuid,
        device_get_name: mock_name,
        system_get_driver_version: mock_driver_version,
        system_get_cuda_driver_version: mock_cuda_version,
        system_get_cuda_driver_version_v2: mock_cuda_version_v2,
        device_get_temperature: mock_temperature,
        device_get_fan_speed: mock_fan_speed,
        device_get_fan_speed_v2: mock_fan_speed_v2,
        device_get_clock_info: mock_clock_info,
        device_get_memory_info: mock_memory_info,
        device_get_memory_info_v2: mock_memory_info_v2,
        device_get_utilization_rates: mock_utilization,
        device_get_pci_info: mock_pci_info,
        device_get_index: mock_index,
        device_get_power_usage: mock_power_usage,
        device_on_same_board: mock_on_same_board,
        device_get_compute_running_processes: mock_processes,
        device_get_board_position: mock_board_position,
        device_get_gpu_voltage: mock_gpu_voltage,
    }
}

fn leaked_registry() -> &'static Registry {
    Box::leak(Box::new(Registry::new()))
}

/// An initialized `Ixml` over the standard fixture, on its own registry.
pub(crate) fn init() -> Ixml {
    let lib = Arc::new(IxmlLib::from_table(table()));
    Ixml::init_for_tests(leaked_registry(), lib).unwrap()
}

/// Fixture whose process set outgrows every fill attempt.
pub(crate) fn init_growing() -> Ixml {
    let mut t = table();
    t.device_get_compute_running_processes = mock_growing_processes;
    let lib = Arc::new(IxmlLib::from_table(t));
    Ixml::init_for_tests(leaked_registry(), lib).unwrap()
}

// Lifecycle fixtures carry their own call counters so parallel tests do
// not observe each other's init/shutdown activity.

pub(crate) static LIFECYCLE_INIT_CALLS: AtomicU32 = AtomicU32::new(0);
pub(crate) static LIFECYCLE_SHUTDOWN_CALLS: AtomicU32 = AtomicU32::new(0);

unsafe extern "C" fn lifecycle_init() -> Return {
    LIFECYCLE_INIT_CALLS.fetch_add(1, Ordering::SeqCst);
    SUCCESS
}

unsafe extern "C" fn lifecycle_shutdown() -> Return {
    LIFECYCLE_SHUTDOWN_CALLS.fetch_add(1, Ordering::SeqCst);
    SUCCESS
}

pub(crate) fn lifecycle_lib() -> Arc<IxmlLib> {
    let mut t = table();
    t.init = lifecycle_init;
    t.shutdown = lifecycle_shutdown;
    Arc::new(IxmlLib::from_table(t))
}

pub(crate) static CONCURRENT_INIT_CALLS: AtomicU32 = AtomicU32::new(0);
pub(crate) static CONCURRENT_SHUTDOWN_CALLS: AtomicU32 = AtomicU32::new(0);

unsafe extern "C" fn concurrent_init() -> Return {
    CONCURRENT_INIT_CALLS.fetch_add(1, Ordering::SeqCst);
    SUCCESS
}

unsafe extern "C" fn concurrent_shutdown() -> Return {
    CONCURRENT_SHUTDOWN_CALLS.fetch_add(1, Ordering::SeqCst);
    SUCCESS
}

pub(crate) fn concurrent_lib() -> Arc<IxmlLib> {
    let mut t = table();
    t.init = concurrent_init;
    t.shutdown = concurrent_shutdown;
    Arc::new(IxmlLib::from_table(t))
}

unsafe extern "C" fn failing_init() -> Return {
    ERROR_DRIVER_NOT_LOADED
}

pub(crate) fn failing_init_lib() -> Arc<IxmlLib> {
    let mut t = table();
    t.init = failing_init;
    Arc::new(IxmlLib::from_table(t))
}
