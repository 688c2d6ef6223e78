//! Safe bindings for the ixml GPU management library.
//!
//! ixml is an NVML-compatible, vendor-supplied shared library for device
//! enumeration and telemetry. This crate loads it at runtime, keeps the
//! process-wide init reference count coherent, and exposes one well-typed
//! operation per native capability. No telemetry logic lives here; every
//! operation is a read-only pass-through to the driver.
//!
//! ```no_run
//! use ixml::Ixml;
//!
//! # fn main() -> Result<(), ixml::IxmlError> {
//! let ixml = Ixml::init()?;
//! for i in 0..ixml.device_count()? {
//!     let device = ixml.device_by_index(i)?;
//!     println!("{}: {}", device.uuid()?, device.name()?);
//! }
//! # Ok(())
//! # }
//! ```

mod device;
mod enums;
mod error;
mod registry;
mod structs;

#[cfg(test)]
mod mock;

pub use device::Device;
pub use enums::{Clock, TemperatureSensor};
pub use error::IxmlError;
pub use structs::{GpuVoltage, MemoryInfo, MemoryInfoV2, PciInfo, ProcessInfo, Utilization};

use std::env;
use std::ffi::{c_char, c_int, c_uint, CString, OsStr, OsString};
use std::sync::Arc;

use ixml_sys::{IxmlFnTable, IxmlLib, RawDevice};

use crate::error::check;
use crate::registry::Registry;
use crate::structs::string_from_buf;

const PRIMARY_LIB: &str = "libixml.so.1";
const FALLBACK_LIB: &str = "libixml.so";
const LIB_PATH_ENV: &str = "IXML_LIB_PATH";

/// One reference on the initialized ixml library.
///
/// The first `Ixml` in the process loads the shared library and runs the
/// native init; further instances share the loaded table and only bump the
/// reference count. Dropping (or [`Ixml::shutdown`]) releases the
/// reference; the last release runs the native shutdown and unloads.
///
/// Device handles borrow their `Ixml`, so a handle can never outlive the
/// reference it was obtained through.
pub struct Ixml {
    lib: Arc<IxmlLib>,
    registry: &'static Registry,
}

impl std::fmt::Debug for Ixml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ixml").finish_non_exhaustive()
    }
}

impl Ixml {
    /// Initializes the library, loading it first if this is the only
    /// reference in the process.
    ///
    /// The library is looked up via the `IXML_LIB_PATH` environment
    /// variable, then `libixml.so.1`, then `libixml.so`.
    pub fn init() -> Result<Self, IxmlError> {
        IxmlBuilder::default().init()
    }

    /// Returns a builder for overriding the library path.
    pub fn builder() -> IxmlBuilder {
        IxmlBuilder::default()
    }

    fn init_with(
        registry: &'static Registry,
        explicit_path: Option<OsString>,
    ) -> Result<Self, IxmlError> {
        let lib = registry.acquire(|| load_lib(explicit_path))?;
        Ok(Ixml { lib, registry })
    }

    #[cfg(test)]
    pub(crate) fn init_for_tests(
        registry: &'static Registry,
        lib: Arc<IxmlLib>,
    ) -> Result<Self, IxmlError> {
        let lib = registry.acquire(move || Ok(lib))?;
        Ok(Ixml { lib, registry })
    }

    /// Releases this reference explicitly. Equivalent to dropping; the
    /// native shutdown only runs when the last reference goes away, and
    /// releasing past zero is a no-op by contract.
    pub fn shutdown(self) {}

    /// Number of accessible devices.
    pub fn device_count(&self) -> Result<u32, IxmlError> {
        let mut count: c_uint = 0;
        check(unsafe { (self.table().device_get_count)(&mut count) })?;
        Ok(count)
    }

    /// Acquires the handle for the device at `index`, valid for
    /// `0 <= index < device_count()`.
    ///
    /// Enumeration order is owned by the driver and is not stable across
    /// re-initialization; use [`Ixml::device_by_uuid`] for stable identity.
    pub fn device_by_index(&self, index: u32) -> Result<Device<'_>, IxmlError> {
        let mut raw = RawDevice::null();
        check(unsafe { (self.table().device_get_handle_by_index)(index, &mut raw) })?;
        Ok(Device::new(raw, self))
    }

    /// Acquires the handle for the device (or MIG instance) with the given
    /// UUID. Fails with [`IxmlError::NotFound`] when nothing matches.
    pub fn device_by_uuid(&self, uuid: &str) -> Result<Device<'_>, IxmlError> {
        let uuid = CString::new(uuid)?;
        let mut raw = RawDevice::null();
        check(unsafe { (self.table().device_get_handle_by_uuid)(uuid.as_ptr(), &mut raw) })?;
        Ok(Device::new(raw, self))
    }

    /// Version string of the system's graphics driver.
    pub fn sys_driver_version(&self) -> Result<String, IxmlError> {
        let mut buf = [0 as c_char; ixml_sys::SYSTEM_DRIVER_VERSION_BUFFER_SIZE];
        check(unsafe {
            (self.table().system_get_driver_version)(buf.as_mut_ptr(), buf.len() as c_uint)
        })?;
        string_from_buf(&buf)
    }

    /// CUDA driver version from the currently installed CUDA.
    pub fn sys_cuda_driver_version(&self) -> Result<i32, IxmlError> {
        let mut version: c_int = 0;
        check(unsafe { (self.table().system_get_cuda_driver_version)(&mut version) })?;
        Ok(version)
    }

    /// CUDA driver version as reported by the driver shared library
    /// itself (`cuDriverGetVersion`).
    pub fn sys_cuda_driver_version_v2(&self) -> Result<i32, IxmlError> {
        let mut version: c_int = 0;
        check(unsafe { (self.table().system_get_cuda_driver_version_v2)(&mut version) })?;
        Ok(version)
    }

    pub(crate) fn table(&self) -> &IxmlFnTable {
        self.lib.table()
    }

    pub(crate) fn registry(&self) -> &'static Registry {
        self.registry
    }
}

impl Drop for Ixml {
    fn drop(&mut self) {
        self.registry.release();
    }
}

/// Overrides for [`Ixml::init`].
#[derive(Debug, Default)]
pub struct IxmlBuilder {
    lib_path: Option<OsString>,
}

impl IxmlBuilder {
    /// Loads the library from `path` instead of the default candidates.
    pub fn lib_path(mut self, path: impl Into<OsString>) -> Self {
        self.lib_path = Some(path.into());
        self
    }

    pub fn init(self) -> Result<Ixml, IxmlError> {
        Ixml::init_with(registry::global(), self.lib_path)
    }
}

fn load_lib(explicit_path: Option<OsString>) -> Result<Arc<IxmlLib>, IxmlError> {
    let mut candidates: Vec<OsString> = Vec::with_capacity(3);
    if let Some(path) = explicit_path {
        candidates.push(path);
    } else if let Some(path) = env::var_os(LIB_PATH_ENV) {
        candidates.push(path);
    }
    candidates.push(OsStr::new(PRIMARY_LIB).to_os_string());
    candidates.push(OsStr::new(FALLBACK_LIB).to_os_string());

    let mut last_err: Option<libloading::Error> = None;
    for candidate in candidates {
        let candidate_display = candidate.to_string_lossy().into_owned();
        tracing::info!("loading ixml library from {}", candidate_display);
        match unsafe { IxmlLib::load(&candidate) } {
            Ok(lib) => return Ok(Arc::new(lib)),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load {}", candidate_display);
                last_err = Some(err);
            }
        }
    }
    match last_err {
        Some(err) => Err(IxmlError::LibLoading(err)),
        None => Err(IxmlError::LibraryNotFound),
    }
}
