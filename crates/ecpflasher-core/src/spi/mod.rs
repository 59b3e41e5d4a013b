//! SPI over JTAG
//!
//! The ECP5/NX background SPI mode ties the flash chip select to Shift-DR:
//! CS is asserted while the TAP sits in Shift-DR and released when it
//! leaves. Every DR bit shifted in between reaches the flash.
//!
//! JTAG shifts LSB first while SPI NOR flash expects MSB first, so every
//! byte crossing the bridge is bit-reversed on the way out and back.

mod bridge;
pub mod opcodes;

/// Reflect the bits of a byte (bit 0 <-> bit 7, and so on)
#[inline]
pub const fn reverse_bits(byte: u8) -> u8 {
    byte.reverse_bits()
}

/// Reflect the bits of every byte in place
pub fn reverse_buffer(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        *byte = reverse_bits(*byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_bits_is_involution() {
        for b in 0..=255u8 {
            assert_eq!(reverse_bits(reverse_bits(b)), b);
        }
    }

    #[test]
    fn test_reverse_bits_values() {
        assert_eq!(reverse_bits(0x01), 0x80);
        assert_eq!(reverse_bits(0x9F), 0xF9);
        assert_eq!(reverse_bits(0x06), 0x60);
        assert_eq!(reverse_bits(0xFF), 0xFF);
    }

    #[test]
    fn test_reverse_buffer() {
        let mut buf = [0x03, 0x00, 0x80];
        reverse_buffer(&mut buf);
        assert_eq!(buf, [0xC0, 0x00, 0x01]);
    }
}
