use std::ffi::c_uint;

use serde::{Deserialize, Serialize};

/// Clock domains a device can report, in MHz.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clock {
    Graphics,
    Sm,
    Memory,
    Video,
}

impl Clock {
    pub(crate) fn as_c(self) -> c_uint {
        match self {
            Clock::Graphics => ixml_sys::CLOCK_GRAPHICS,
            Clock::Sm => ixml_sys::CLOCK_SM,
            Clock::Memory => ixml_sys::CLOCK_MEM,
            Clock::Video => ixml_sys::CLOCK_VIDEO,
        }
    }
}

/// Temperature sensors. The vendor header currently declares only the
/// GPU die sensor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureSensor {
    Gpu,
}

impl TemperatureSensor {
    pub(crate) fn as_c(self) -> c_uint {
        match self {
            TemperatureSensor::Gpu => ixml_sys::TEMPERATURE_GPU,
        }
    }
}
