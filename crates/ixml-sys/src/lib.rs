//! Raw ABI surface for the ixml GPU management library.
//!
//! The ixml library exposes an NVML-compatible C interface plus a couple of
//! vendor extension entry points. This crate declares the `#[repr(C)]` wire
//! structs, the status-code space and the documented buffer sizes, and
//! resolves every entry point into a plain function-pointer table via
//! `libloading`. Nothing here is safe to call directly; the `ixml` crate
//! provides the safe wrapper.

mod table;
mod types;

pub use table::*;
pub use types::*;
