//! Nexus configuration status register (64 bits)

use super::Field;

const CONFIG_TARGET: &[(u8, &str)] = &[
    (0b000, "SRAM"),
    (0b001, "EFUSE Normal"),
    (0b010, "EFUSE Pseudo"),
    (0b011, "EFUSE Safe"),
];

const BSE_ERRORS: &[(u8, &str)] = &[
    (0b0000, "No Error"),
    (0b0001, "ID Error"),
    (0b0010, "CMD Error - illegal command"),
    (0b0011, "CRC Error"),
    (0b0100, "PRMB Error - preamble error"),
    (0b0101, "ABRT Error - configuration aborted by the user"),
    (0b0110, "OVFL Error - data overflow error"),
    (0b0111, "SDM Error - bitstream pass the size of SRAM array"),
    (0b1000, "Authentication Error"),
    (0b1001, "Authentication Setup Error"),
    (0b1010, "Bitstream Engine Timeout Error"),
];

const AUTH_MODE: &[(u8, &str)] = &[
    (0b00, "No Auth"),
    (0b01, "ECDSA"),
    (0b10, "HMAC"),
    (0b11, "No Auth"),
];

/// Field layout
pub static FIELDS: &[Field] = &[
    Field::flag(0, "Transparent Mode"),
    Field::group(1, 3, "Config Target", CONFIG_TARGET),
    Field::flag(4, "JTAG Active"),
    Field::flag(5, "PWD Protection"),
    Field::flag(6, "OTP"),
    Field::flag(8, "DONE"),
    Field::flag(9, "ISC Enable"),
    Field::choice(10, "Write Enable", "Not Writable", "Writable"),
    Field::choice(11, "Read Enable", "Not Readable", "Readable"),
    Field::flag(12, "Busy Flag"),
    Field::flag(13, "Fail Flag"),
    Field::flag(15, "Decrypt Only"),
    Field::flag(16, "PWD Enable"),
    Field::flag(17, "PWD All"),
    Field::flag(18, "CID EN"),
    Field::flag(21, "Encrypt Preamble"),
    Field::flag(22, "Std Preamble"),
    Field::flag(23, "SPIm Fail 1"),
    Field::group(24, 4, "BSE Error Code", BSE_ERRORS),
    Field::flag(28, "Execution Error"),
    Field::flag(29, "ID Error"),
    Field::flag(30, "Invalid Command"),
    Field::flag(31, "WDT Busy"),
    Field::flag(33, "Dry Run DONE"),
    // Error code of the previous bitstream
    Field::group(34, 4, "BSE Error 1 Code", BSE_ERRORS),
    Field::flag(38, "Bypass Mode"),
    Field::flag(39, "Flow Through Mode"),
    Field::flag(42, "SFDP Timeout"),
    Field::flag(43, "Key Destroy Pass"),
    Field::flag(44, "INITN"),
    Field::flag(45, "I3C Parity Error 2"),
    Field::flag(46, "Init Bus ID Error"),
    Field::flag(47, "I3C Parity Error 1"),
    Field::group(48, 2, "Authentication Mode", AUTH_MODE),
    Field::flag(50, "Authentication Done"),
    Field::flag(51, "Dry Run Authentication Done"),
    Field::flag(52, "JTAG Locked"),
    Field::flag(53, "SSPI Locked"),
    Field::flag(54, "I2C/I3C Locked"),
    Field::flag(55, "PUB Read Lock"),
    Field::flag(56, "PUB Write Lock"),
    Field::flag(57, "FEA Read Lock"),
    Field::flag(58, "FEA Write Lock"),
    Field::flag(59, "AES Read Lock"),
    Field::flag(60, "AES Write Lock"),
    Field::flag(61, "PWD Read Lock"),
    Field::flag(62, "PWD Write Lock"),
    Field::flag(63, "Global Lock"),
];
