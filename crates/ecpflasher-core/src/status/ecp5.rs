//! ECP5 configuration status register (32 bits)

use super::Field;

const CONFIG_TARGET: &[(u8, &str)] = &[(0b000, "SRAM"), (0b001, "eFuse")];

/// Bitstream engine error codes
const BSE_ERRORS: &[(u8, &str)] = &[
    (0b000, "No Error"),
    (0b001, "ID Error"),
    (0b010, "CMD Error - illegal command"),
    (0b011, "CRC Error"),
    (0b100, "PRMB Error - preamble error"),
    (0b101, "ABRT Error - configuration aborted by the user"),
    (0b110, "OVFL Error - data overflow error"),
    (0b111, "SDM Error - bitstream pass the size of SRAM array"),
];

/// Field layout
pub static FIELDS: &[Field] = &[
    Field::flag(0, "Transparent Mode"),
    Field::group(1, 3, "Config Target", CONFIG_TARGET),
    Field::flag(4, "JTAG Active"),
    Field::flag(5, "PWD Protection"),
    Field::flag(7, "Decrypt Enable"),
    Field::flag(8, "DONE"),
    Field::flag(9, "ISC Enable"),
    Field::choice(10, "Write Enable", "Not Writable", "Writable"),
    Field::choice(11, "Read Enable", "Not Readable", "Readable"),
    Field::flag(12, "Busy Flag"),
    Field::flag(13, "Fail Flag"),
    Field::flag(14, "Feature OTP"),
    Field::flag(15, "Decrypt Only"),
    Field::flag(16, "PWD Enable"),
    Field::flag(20, "Encrypt Preamble"),
    Field::flag(21, "Std Preamble"),
    Field::flag(22, "SPIm Fail 1"),
    Field::group(23, 3, "BSE Error Code", BSE_ERRORS),
    Field::flag(26, "Execution Error"),
    Field::flag(27, "ID Error"),
    Field::flag(28, "Invalid Command"),
    Field::flag(29, "SED Error"),
    Field::flag(30, "Bypass Mode"),
    Field::flag(31, "Flow Through Mode"),
];
