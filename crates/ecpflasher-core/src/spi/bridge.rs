//! SPI transactions framed as DR scans

use super::reverse_buffer;
use crate::error::{Error, Result};
use crate::jtag::{JtagTap, TapState};
use crate::session::Session;

impl<T: JtagTap> Session<T> {
    /// One complete SPI exchange
    ///
    /// Sends the first `bits` bits of `buf` MSB first and overwrites them
    /// with the flash response. Chip select is released when the scan
    /// leaves Shift-DR at the end. If a held transaction is already open
    /// the bits are appended to it and it is closed.
    pub fn transact_spi(&mut self, buf: &mut [u8], bits: usize) -> Result<()> {
        let bytes = bits.div_ceil(8);
        if bytes > buf.len() {
            return Err(Error::BufferTooSmall);
        }
        let window = &mut buf[..bytes];
        reverse_buffer(window);
        let result = self.shift_spi(window, bits, false, true);
        reverse_buffer(window);
        result
    }

    /// Part of a held SPI transaction
    ///
    /// Like [`transact_spi`](Self::transact_spi) but the TAP stays in
    /// Shift-DR afterwards, so chip select stays asserted and the next
    /// `stream_spi`/`transact_spi` call continues the same transaction.
    pub fn stream_spi(&mut self, buf: &mut [u8], bits: usize) -> Result<()> {
        let bytes = bits.div_ceil(8);
        if bytes > buf.len() {
            return Err(Error::BufferTooSmall);
        }
        let window = &mut buf[..bytes];
        reverse_buffer(window);
        let result = self.shift_spi(window, bits, true, false);
        reverse_buffer(window);
        result
    }

    /// Full-byte [`transact_spi`](Self::transact_spi)
    pub fn transact(&mut self, buf: &mut [u8]) -> Result<()> {
        let bits = buf.len() * 8;
        self.transact_spi(buf, bits)
    }

    /// Full-byte [`stream_spi`](Self::stream_spi)
    pub fn stream(&mut self, buf: &mut [u8]) -> Result<()> {
        let bits = buf.len() * 8;
        self.stream_spi(buf, bits)
    }

    /// Close a held transaction without shifting more data
    pub fn end_spi(&mut self) -> Result<()> {
        if self.state() == TapState::ShiftDr {
            self.go_to_state(TapState::PauseDr)?;
        }
        Ok(())
    }

    fn shift_spi(&mut self, data: &mut [u8], bits: usize, enter: bool, exit: bool) -> Result<()> {
        if enter || self.state() != TapState::ShiftDr {
            self.go_to_state(TapState::ShiftDr)?;
        }
        self.shift(data, bits, exit)
    }
}

#[cfg(test)]
mod tests {
    use crate::jtag::TapState;
    use crate::session::Session;
    use crate::testing::MockTap;

    #[test]
    fn test_transact_reverses_both_ways() {
        // Echo back what was sent on the wire, shifted by one byte
        let tap = MockTap::with_responder(|_, data| {
            data.rotate_right(1);
            data[0] = 0x80;
        });
        let mut session = Session::new(tap);
        let mut buf = [0x9F, 0x00];
        session.transact(&mut buf).unwrap();

        assert_eq!(session.tap().shifts[0].tx, [0xF9, 0x00]);
        assert!(session.tap().shifts[0].exit);
        assert_eq!(buf, [0x01, 0x9F]);
        assert_eq!(session.state(), TapState::PauseDr);
    }

    #[test]
    fn test_held_transaction_stays_in_shift_dr() {
        let mut session = Session::new(MockTap::new());
        let mut header = [0x03, 0x00, 0x10, 0x00];
        session.stream(&mut header).unwrap();
        assert_eq!(session.state(), TapState::ShiftDr);

        let mut data = [0u8; 16];
        session.stream(&mut data).unwrap();
        assert_eq!(session.state(), TapState::ShiftDr);
        assert!(!session.tap().shifts[1].exit);

        session.end_spi().unwrap();
        assert_eq!(session.state(), TapState::PauseDr);
    }

    #[test]
    fn test_transact_joins_open_transaction() {
        let mut session = Session::new(MockTap::new());
        let mut header = [0x02, 0x00, 0x00, 0x00];
        session.stream(&mut header).unwrap();
        let calls = session.tap().calls;

        let mut data = [0xAA; 4];
        session.transact(&mut data).unwrap();
        // Only the shift itself, no state change in between
        assert_eq!(session.tap().calls, calls + 1);
        assert_eq!(session.state(), TapState::PauseDr);
    }

    #[test]
    fn test_partial_byte() {
        let mut session = Session::new(MockTap::new());
        let mut buf = [0xFF; 2];
        session.transact_spi(&mut buf, 2).unwrap();
        assert_eq!(session.tap().shifts[0].bits, 2);
        assert_eq!(session.tap().shifts[0].tx.len(), 1);
    }
}
