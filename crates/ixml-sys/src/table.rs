//! Symbol resolution for the ixml shared library.
//!
//! Every entry point is resolved once, up front, into a plain function
//! pointer. A missing symbol therefore fails at load time instead of at the
//! first call. The originating [`Library`] is kept alive next to the table
//! so the pointers stay valid.

use std::ffi::{c_char, c_int, c_uint, OsStr};

use libloading::Library;

use crate::types::{Memory, MemoryV2, PciInfo, ProcessInfo, RawDevice, Return, Utilization};

pub type InitFn = unsafe extern "C" fn() -> Return;
pub type ShutdownFn = unsafe extern "C" fn() -> Return;
pub type DeviceGetCountFn = unsafe extern "C" fn(*mut c_uint) -> Return;
pub type DeviceGetHandleByIndexFn = unsafe extern "C" fn(c_uint, *mut RawDevice) -> Return;
pub type DeviceGetHandleByUuidFn = unsafe extern "C" fn(*const c_char, *mut RawDevice) -> Return;
pub type DeviceGetMinorNumberFn = unsafe extern "C" fn(RawDevice, *mut c_uint) -> Return;
pub type DeviceGetTextFn = unsafe extern "C" fn(RawDevice, *mut c_char, c_uint) -> Return;
pub type SystemGetDriverVersionFn = unsafe extern "C" fn(*mut c_char, c_uint) -> Return;
pub type SystemGetCudaDriverVersionFn = unsafe extern "C" fn(*mut c_int) -> Return;
pub type DeviceGetTemperatureFn = unsafe extern "C" fn(RawDevice, c_uint, *mut c_uint) -> Return;
pub type DeviceGetScalarFn = unsafe extern "C" fn(RawDevice, *mut c_uint) -> Return;
pub type DeviceGetIndexedScalarFn =
    unsafe extern "C" fn(RawDevice, c_uint, *mut c_uint) -> Return;
pub type DeviceGetMemoryInfoFn = unsafe extern "C" fn(RawDevice, *mut Memory) -> Return;
pub type DeviceGetMemoryInfoV2Fn = unsafe extern "C" fn(RawDevice, *mut MemoryV2) -> Return;
pub type DeviceGetUtilizationRatesFn =
    unsafe extern "C" fn(RawDevice, *mut Utilization) -> Return;
pub type DeviceGetPciInfoFn = unsafe extern "C" fn(RawDevice, *mut PciInfo) -> Return;
pub type DeviceOnSameBoardFn = unsafe extern "C" fn(RawDevice, RawDevice, *mut c_int) -> Return;
pub type DeviceGetComputeRunningProcessesFn =
    unsafe extern "C" fn(RawDevice, *mut c_uint, *mut ProcessInfo) -> Return;
pub type DeviceGetGpuVoltageFn =
    unsafe extern "C" fn(RawDevice, *mut c_uint, *mut c_uint) -> Return;

/// The full set of entry points the binding layer calls.
#[derive(Copy, Clone)]
pub struct IxmlFnTable {
    pub init: InitFn,
    pub shutdown: ShutdownFn,
    pub device_get_count: DeviceGetCountFn,
    pub device_get_handle_by_index: DeviceGetHandleByIndexFn,
    pub device_get_handle_by_uuid: DeviceGetHandleByUuidFn,
    pub device_get_minor_number: DeviceGetMinorNumberFn,
    pub device_get_uuid: DeviceGetTextFn,
    pub device_get_name: DeviceGetTextFn,
    pub system_get_driver_version: SystemGetDriverVersionFn,
    pub system_get_cuda_driver_version: SystemGetCudaDriverVersionFn,
    pub system_get_cuda_driver_version_v2: SystemGetCudaDriverVersionFn,
    pub device_get_temperature: DeviceGetTemperatureFn,
    pub device_get_fan_speed: DeviceGetScalarFn,
    pub device_get_fan_speed_v2: DeviceGetIndexedScalarFn,
    pub device_get_clock_info: DeviceGetIndexedScalarFn,
    pub device_get_memory_info: DeviceGetMemoryInfoFn,
    pub device_get_memory_info_v2: DeviceGetMemoryInfoV2Fn,
    pub device_get_utilization_rates: DeviceGetUtilizationRatesFn,
    pub device_get_pci_info: DeviceGetPciInfoFn,
    pub device_get_index: DeviceGetScalarFn,
    pub device_get_power_usage: DeviceGetScalarFn,
    pub device_on_same_board: DeviceOnSameBoardFn,
    pub device_get_compute_running_processes: DeviceGetComputeRunningProcessesFn,
    pub device_get_board_position: DeviceGetScalarFn,
    pub device_get_gpu_voltage: DeviceGetGpuVoltageFn,
}

/// A loaded ixml library: the resolved function table plus the handle that
/// keeps it mapped.
pub struct IxmlLib {
    table: IxmlFnTable,
    _lib: Option<Library>,
}

impl IxmlLib {
    /// Loads the shared library at `path` and resolves every entry point.
    ///
    /// # Safety
    ///
    /// Loading a foreign library runs its initializers; the caller must
    /// trust the library at `path` to actually be the vendor driver.
    pub unsafe fn load(path: &OsStr) -> Result<Self, libloading::Error> {
        let lib = Library::new(path)?;
        let table = IxmlFnTable {
            init: *lib.get::<InitFn>(b"nvmlInit_v2\0")?,
            shutdown: *lib.get::<ShutdownFn>(b"nvmlShutdown\0")?,
            device_get_count: *lib.get::<DeviceGetCountFn>(b"nvmlDeviceGetCount_v2\0")?,
            device_get_handle_by_index: *lib
                .get::<DeviceGetHandleByIndexFn>(b"nvmlDeviceGetHandleByIndex_v2\0")?,
            device_get_handle_by_uuid: *lib
                .get::<DeviceGetHandleByUuidFn>(b"nvmlDeviceGetHandleByUUID\0")?,
            device_get_minor_number: *lib
                .get::<DeviceGetMinorNumberFn>(b"nvmlDeviceGetMinorNumber\0")?,
            device_get_uuid: *lib.get::<DeviceGetTextFn>(b"nvmlDeviceGetUUID\0")?,
            device_get_name: *lib.get::<DeviceGetTextFn>(b"nvmlDeviceGetName\0")?,
            system_get_driver_version: *lib
                .get::<SystemGetDriverVersionFn>(b"nvmlSystemGetDriverVersion\0")?,
            system_get_cuda_driver_version: *lib
                .get::<SystemGetCudaDriverVersionFn>(b"nvmlSystemGetCudaDriverVersion\0")?,
            system_get_cuda_driver_version_v2: *lib
                .get::<SystemGetCudaDriverVersionFn>(b"nvmlSystemGetCudaDriverVersion_v2\0")?,
            device_get_temperature: *lib
                .get::<DeviceGetTemperatureFn>(b"nvmlDeviceGetTemperature\0")?,
            device_get_fan_speed: *lib.get::<DeviceGetScalarFn>(b"nvmlDeviceGetFanSpeed\0")?,
            device_get_fan_speed_v2: *lib
                .get::<DeviceGetIndexedScalarFn>(b"nvmlDeviceGetFanSpeed_v2\0")?,
            device_get_clock_info: *lib
                .get::<DeviceGetIndexedScalarFn>(b"nvmlDeviceGetClockInfo\0")?,
            device_get_memory_info: *lib
                .get::<DeviceGetMemoryInfoFn>(b"nvmlDeviceGetMemoryInfo\0")?,
            device_get_memory_info_v2: *lib
                .get::<DeviceGetMemoryInfoV2Fn>(b"nvmlDeviceGetMemoryInfo_v2\0")?,
            device_get_utilization_rates: *lib
                .get::<DeviceGetUtilizationRatesFn>(b"nvmlDeviceGetUtilizationRates\0")?,
            device_get_pci_info: *lib.get::<DeviceGetPciInfoFn>(b"nvmlDeviceGetPciInfo_v3\0")?,
            device_get_index: *lib.get::<DeviceGetScalarFn>(b"nvmlDeviceGetIndex\0")?,
            device_get_power_usage: *lib
                .get::<DeviceGetScalarFn>(b"nvmlDeviceGetPowerUsage\0")?,
            device_on_same_board: *lib
                .get::<DeviceOnSameBoardFn>(b"nvmlDeviceOnSameBoard\0")?,
            device_get_compute_running_processes: *lib
                .get::<DeviceGetComputeRunningProcessesFn>(
                    b"nvmlDeviceGetComputeRunningProcesses\0",
                )?,
            device_get_board_position: *lib
                .get::<DeviceGetScalarFn>(b"ixmlDeviceGetBoardPosition\0")?,
            device_get_gpu_voltage: *lib
                .get::<DeviceGetGpuVoltageFn>(b"ixmlDeviceGetGPUVoltage\0")?,
        };
        Ok(IxmlLib {
            table,
            _lib: Some(lib),
        })
    }

    /// Builds a library from caller-supplied function pointers. Used to
    /// stand in a mock driver in tests.
    pub fn from_table(table: IxmlFnTable) -> Self {
        IxmlLib { table, _lib: None }
    }

    pub fn table(&self) -> &IxmlFnTable {
        &self.table
    }
}
