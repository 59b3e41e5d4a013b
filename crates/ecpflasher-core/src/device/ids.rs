//! Known IDCODEs

use super::{DeviceFamily, KnownDevice};

const fn ecp5(name: &'static str, idcode: u32) -> KnownDevice {
    KnownDevice {
        name,
        idcode,
        family: DeviceFamily::Ecp5,
    }
}

const fn nx(name: &'static str, idcode: u32) -> KnownDevice {
    KnownDevice {
        name,
        idcode,
        family: DeviceFamily::Nx,
    }
}

/// Every device the tool knows by IDCODE
pub static KNOWN_DEVICES: &[KnownDevice] = &[
    // ECP5
    ecp5("LFE5U-12", 0x2111_1043),
    ecp5("LFE5U-25", 0x4111_1043),
    ecp5("LFE5U-45", 0x4111_2043),
    ecp5("LFE5U-85", 0x4111_3043),
    ecp5("LFE5UM-25", 0x0111_1043),
    ecp5("LFE5UM-45", 0x0111_2043),
    ecp5("LFE5UM-85", 0x0111_3043),
    ecp5("LFE5UM5G-25", 0x8111_1043),
    ecp5("LFE5UM5G-45", 0x8111_2043),
    ecp5("LFE5UM5G-85", 0x8111_3043),
    // Nexus
    nx("LIFCL-17", 0x010F_0043),
    nx("LIFCL-40-ES", 0x010F_1043),
    nx("LIFCL-40", 0x110F_1043),
    nx("LFD2NX-17", 0x310F_0043),
    nx("LFD2NX-40", 0x310F_1043),
    nx("LFCPNX-100", 0x010F_4043),
];
