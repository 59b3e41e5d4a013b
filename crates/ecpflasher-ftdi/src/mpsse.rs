//! MPSSE command stream builder
//!
//! Collects the commands for one USB write together with the number of
//! bytes the adapter will answer with, so the driver can issue a single
//! write followed by a single read.

use crate::protocol::*;

/// Commands queued for one round trip
#[derive(Debug, Default)]
pub(crate) struct CommandBuffer {
    buf: Vec<u8>,
    response_len: usize,
}

impl CommandBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Bytes the adapter sends back once the buffer has executed
    pub(crate) fn response_len(&self) -> usize {
        self.response_len
    }

    /// Raw bytes, e.g. the setup sequence
    pub(crate) fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Clock `levels` out on TMS, first level first, holding TDI at `tdi`
    pub(crate) fn tms(&mut self, levels: impl IntoIterator<Item = bool>, tdi: bool) -> &mut Self {
        let mut packed = 0u8;
        let mut count = 0usize;
        for level in levels {
            if level {
                packed |= 1 << count;
            }
            count += 1;
            if count == MAX_TMS_BITS {
                self.push_tms(packed, count, tdi);
                packed = 0;
                count = 0;
            }
        }
        if count > 0 {
            self.push_tms(packed, count, tdi);
        }
        self
    }

    fn push_tms(&mut self, packed: u8, count: usize, tdi: bool) {
        let tdi_bit = if tdi { 0x80 } else { 0x00 };
        self.buf
            .extend_from_slice(&[MPSSE_WRITE_TMS, (count - 1) as u8, packed | tdi_bit]);
    }

    /// Full-duplex byte shift, LSB first
    ///
    /// `data` must not be longer than [`MAX_SHIFT_CHUNK`].
    pub(crate) fn shift_bytes(&mut self, data: &[u8]) -> &mut Self {
        debug_assert!(!data.is_empty() && data.len() <= MAX_SHIFT_CHUNK);
        let len = (data.len() - 1) as u16;
        self.buf.push(MPSSE_SHIFT_BYTES);
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(data);
        self.response_len += data.len();
        self
    }

    /// Full-duplex shift of the low `count` bits of `value` (1-7)
    pub(crate) fn shift_bits(&mut self, value: u8, count: usize) -> &mut Self {
        debug_assert!((1..8).contains(&count));
        self.buf
            .extend_from_slice(&[MPSSE_SHIFT_BITS, (count - 1) as u8, value]);
        self.response_len += 1;
        self
    }

    /// Clock one bit with TMS high, sampling TDO
    pub(crate) fn exit_bit(&mut self, tdi: bool) -> &mut Self {
        let tdi_bit = if tdi { 0x80 } else { 0x00 };
        self.buf
            .extend_from_slice(&[MPSSE_WRITE_TMS_READ, 0x00, 0x01 | tdi_bit]);
        self.response_len += 1;
        self
    }

    /// Clock `cycles` TCK periods without moving TMS or TDI
    pub(crate) fn clocks(&mut self, cycles: u32) -> &mut Self {
        let mut bytes = cycles / 8;
        while bytes > 0 {
            let n = bytes.min(0x1_0000);
            let len = (n - 1) as u16;
            self.buf.push(CLOCK_BYTES);
            self.buf.extend_from_slice(&len.to_le_bytes());
            bytes -= n;
        }
        let bits = cycles % 8;
        if bits > 0 {
            self.buf.extend_from_slice(&[CLOCK_BITS, (bits - 1) as u8]);
        }
        self
    }

    /// Ask the adapter to flush its answer right away
    pub(crate) fn send_immediate(&mut self) -> &mut Self {
        self.buf.push(SEND_IMMEDIATE);
        self
    }
}

/// Bits returned by a bit shift of `count` bits arrive in the top of the byte
pub(crate) fn align_bits(received: u8, count: usize) -> u8 {
    received >> (8 - count)
}

/// TDO sampled by an [`CommandBuffer::exit_bit`] command
pub(crate) fn exit_bit_value(received: u8) -> bool {
    received & 0x80 != 0
}

/// Setup sequence: 12 MHz base clock, TCK divider, no loopback, pin levels
pub(crate) fn setup_sequence(divider: u32) -> [u8; 8] {
    let div = (divider - 1) as u16;
    let [lo, hi] = div.to_le_bytes();
    [
        EN_DIV_5,
        TCK_DIVISOR,
        lo,
        hi,
        LOOPBACK_END,
        SET_BITS_LOW,
        PINS_INITIAL,
        PINS_DIRECTION,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tms_splits_long_paths() {
        let mut cmd = CommandBuffer::new();
        cmd.tms([true; 9], false);
        assert_eq!(
            cmd.as_bytes(),
            [MPSSE_WRITE_TMS, 6, 0x7F, MPSSE_WRITE_TMS, 1, 0x03]
        );
        assert_eq!(cmd.response_len(), 0);
    }

    #[test]
    fn test_tms_carries_tdi() {
        let mut cmd = CommandBuffer::new();
        cmd.tms([true, false, false], true);
        assert_eq!(cmd.as_bytes(), [MPSSE_WRITE_TMS, 2, 0x81]);
    }

    #[test]
    fn test_shift_and_exit() {
        let mut cmd = CommandBuffer::new();
        cmd.shift_bytes(&[0xAA, 0x55])
            .shift_bits(0x05, 3)
            .exit_bit(true)
            .send_immediate();
        assert_eq!(
            cmd.as_bytes(),
            [
                MPSSE_SHIFT_BYTES,
                0x01,
                0x00,
                0xAA,
                0x55,
                MPSSE_SHIFT_BITS,
                0x02,
                0x05,
                MPSSE_WRITE_TMS_READ,
                0x00,
                0x81,
                SEND_IMMEDIATE
            ]
        );
        assert_eq!(cmd.response_len(), 4);
    }

    #[test]
    fn test_idle_clocks() {
        let mut cmd = CommandBuffer::new();
        cmd.clocks(32);
        assert_eq!(cmd.as_bytes(), [CLOCK_BYTES, 3, 0]);

        let mut cmd = CommandBuffer::new();
        cmd.clocks(5);
        assert_eq!(cmd.as_bytes(), [CLOCK_BITS, 4]);

        let mut cmd = CommandBuffer::new();
        cmd.clocks(0);
        assert!(cmd.is_empty());
    }

    #[test]
    fn test_bit_alignment() {
        assert_eq!(align_bits(0b1010_0000, 3), 0b101);
        assert_eq!(align_bits(0xFF, 7), 0x7F);
        assert!(exit_bit_value(0x80));
        assert!(!exit_bit_value(0x7F));
    }

    #[test]
    fn test_setup_sequence() {
        assert_eq!(
            setup_sequence(1),
            [0x8B, 0x86, 0x00, 0x00, 0x85, 0x80, 0x08, 0x0B]
        );
        assert_eq!(setup_sequence(0x1_0000)[2..4], [0xFF, 0xFF]);
    }
}
