//! Structured error taxonomy over the flat native status space.

use thiserror::Error;

/// Every failure a binding operation can report.
///
/// The first group mirrors the native status codes one to one; codes added
/// by future driver versions surface as [`IxmlError::Unrecognized`] so
/// callers can still branch on the named kinds.
#[derive(Error, Debug)]
pub enum IxmlError {
    #[error("the library has not been initialized")]
    Uninitialized,
    #[error("a supplied argument was invalid")]
    InvalidArgument,
    #[error("the requested operation is not available on the target device")]
    NotSupported,
    #[error("the current user does not have permission for this operation")]
    NoPermission,
    /// Deprecated by the driver; [`check`] treats it as success and this
    /// variant is never produced by the mapping. Kept so the full code
    /// space stays representable.
    #[error("the library was already initialized")]
    AlreadyInitialized,
    #[error("no object was found for the query")]
    NotFound,
    #[error("a supplied buffer was too small{}", insufficient_size_hint(.0))]
    InsufficientSize(Option<u32>),
    #[error("a device's external power cables are not properly attached")]
    InsufficientPower,
    #[error("the vendor driver is not loaded")]
    DriverNotLoaded,
    #[error("a user-provided timeout passed")]
    Timeout,
    #[error("the kernel detected an interrupt issue with a GPU")]
    IrqIssue,
    #[error("the shared library could not be found or loaded by the driver")]
    LibraryNotFound,
    #[error("the loaded library does not implement this function")]
    FunctionNotFound,
    #[error("the infoROM is corrupted")]
    CorruptedInforom,
    #[error("the GPU has fallen off the bus or is otherwise inaccessible")]
    GpuLost,
    #[error("the GPU requires a reset before it can be used again")]
    ResetRequired,
    #[error("the GPU control device has been blocked by the operating system")]
    OperatingSystem,
    #[error("a driver/library version mismatch was detected")]
    LibRmVersionMismatch,
    #[error("the GPU is currently in use")]
    InUse,
    #[error("insufficient memory")]
    InsufficientMemory,
    #[error("no data")]
    NoData,
    #[error("the requested vGPU operation is not available because ECC is enabled")]
    VgpuEccNotSupported,
    #[error("ran out of critical resources, other than memory")]
    InsufficientResources,
    #[error("the requested frequency is not supported")]
    FreqNotSupported,
    #[error("the provided struct version is invalid or unsupported")]
    ArgumentVersionMismatch,
    #[error("an internal driver error occurred")]
    Unknown,
    #[error("the driver returned an unrecognized status code {0}")]
    Unrecognized(u32),

    // Failures local to the binding layer.
    #[error("failed to load the ixml shared library: {0}")]
    LibLoading(#[from] libloading::Error),
    #[error("a string passed to a native call contained an interior NUL byte")]
    UnexpectedNul(#[from] std::ffi::NulError),
    #[error("a native string was not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

fn insufficient_size_hint(required: &Option<u32>) -> String {
    match required {
        Some(n) => format!(" (required capacity: {n})"),
        None => String::new(),
    }
}

impl IxmlError {
    /// Maps a raw status code to its error kind. `SUCCESS` has no error
    /// kind and maps to [`IxmlError::Unrecognized`]; use [`check`] for
    /// call results.
    pub fn from_code(code: ixml_sys::Return) -> Self {
        match code {
            ixml_sys::ERROR_UNINITIALIZED => IxmlError::Uninitialized,
            ixml_sys::ERROR_INVALID_ARGUMENT => IxmlError::InvalidArgument,
            ixml_sys::ERROR_NOT_SUPPORTED => IxmlError::NotSupported,
            ixml_sys::ERROR_NO_PERMISSION => IxmlError::NoPermission,
            ixml_sys::ERROR_ALREADY_INITIALIZED => IxmlError::AlreadyInitialized,
            ixml_sys::ERROR_NOT_FOUND => IxmlError::NotFound,
            ixml_sys::ERROR_INSUFFICIENT_SIZE => IxmlError::InsufficientSize(None),
            ixml_sys::ERROR_INSUFFICIENT_POWER => IxmlError::InsufficientPower,
            ixml_sys::ERROR_DRIVER_NOT_LOADED => IxmlError::DriverNotLoaded,
            ixml_sys::ERROR_TIMEOUT => IxmlError::Timeout,
            ixml_sys::ERROR_IRQ_ISSUE => IxmlError::IrqIssue,
            ixml_sys::ERROR_LIBRARY_NOT_FOUND => IxmlError::LibraryNotFound,
            ixml_sys::ERROR_FUNCTION_NOT_FOUND => IxmlError::FunctionNotFound,
            ixml_sys::ERROR_CORRUPTED_INFOROM => IxmlError::CorruptedInforom,
            ixml_sys::ERROR_GPU_IS_LOST => IxmlError::GpuLost,
            ixml_sys::ERROR_RESET_REQUIRED => IxmlError::ResetRequired,
            ixml_sys::ERROR_OPERATING_SYSTEM => IxmlError::OperatingSystem,
            ixml_sys::ERROR_LIB_RM_VERSION_MISMATCH => IxmlError::LibRmVersionMismatch,
            ixml_sys::ERROR_IN_USE => IxmlError::InUse,
            ixml_sys::ERROR_MEMORY => IxmlError::InsufficientMemory,
            ixml_sys::ERROR_NO_DATA => IxmlError::NoData,
            ixml_sys::ERROR_VGPU_ECC_NOT_SUPPORTED => IxmlError::VgpuEccNotSupported,
            ixml_sys::ERROR_INSUFFICIENT_RESOURCES => IxmlError::InsufficientResources,
            ixml_sys::ERROR_FREQ_NOT_SUPPORTED => IxmlError::FreqNotSupported,
            ixml_sys::ERROR_ARGUMENT_VERSION_MISMATCH => IxmlError::ArgumentVersionMismatch,
            ixml_sys::ERROR_UNKNOWN => IxmlError::Unknown,
            other => IxmlError::Unrecognized(other),
        }
    }
}

/// Translates a native call result. `ERROR_ALREADY_INITIALIZED` is
/// deprecated and documented as success-equivalent, so it passes.
pub(crate) fn check(code: ixml_sys::Return) -> Result<(), IxmlError> {
    match code {
        ixml_sys::SUCCESS | ixml_sys::ERROR_ALREADY_INITIALIZED => Ok(()),
        other => Err(IxmlError::from_code(other)),
    }
}
