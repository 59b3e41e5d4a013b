//! SPI flash status registers 1 and 2

use super::Field;

const SWP: &[(u8, &str)] = &[
    (0b00, "All sectors unprotected"),
    (0b01, "Some sectors protected"),
    (0b11, "All sectors protected"),
];

/// Status register 1
pub static SR1_FIELDS: &[Field] = &[
    Field::choice(7, "SPRL", "unlocked", "locked"),
    Field::choice(6, "SPM", "Byte/Page Prog Mode", "Sequential Prog Mode"),
    Field::choice(5, "EPE", "Erase/Prog success", "Erase/Prog error"),
    Field::choice(4, "WPP", "~WP asserted", "~WP deasserted"),
    Field::group(2, 2, "SWP", SWP),
    Field::choice(1, "WEL", "Not write enabled", "Write enabled"),
    Field::choice(0, "~RDY", "Ready", "Busy"),
];

/// Status register 2
pub static SR2_FIELDS: &[Field] = &[Field::choice(1, "QE", "disabled", "enabled")];
