//! SPI NOR flash model
//!
//! Bit-level: the FPGA model feeds MOSI bits (MSB first) while chip select
//! is asserted and gets MISO bits back. Write commands take effect when
//! chip select is released, like on a real part. While a write is in
//! progress the part reports BUSY for a configurable number of status
//! reads and ignores every other write command.

use alloc::vec;
use alloc::vec::Vec;

use ecpflasher_core::spi::opcodes;

const PAGE_SIZE: usize = 256;
const SR1_WRITABLE: u8 = opcodes::SR1_SWP | opcodes::SR1_SPRL;

/// Emulated SPI NOR flash
pub struct SpiFlash {
    data: Vec<u8>,
    jedec: [u8; 3],
    sr1: u8,
    sr2: u8,
    sr3: u8,
    locked: bool,
    wel: bool,
    busy_polls: u32,
    busy: u32,

    selected: bool,
    bit: u8,
    in_byte: u8,
    out_byte: u8,
    count: usize,
    header: [u8; 4],
    payload: Vec<u8>,
    ops: Vec<u8>,
}

impl SpiFlash {
    /// Erased flash of `size` bytes
    pub fn new(size: usize, jedec: [u8; 3], busy_polls: u32) -> Self {
        Self {
            data: vec![0xFF; size],
            jedec,
            sr1: 0,
            sr2: 0,
            sr3: 0,
            locked: false,
            wel: false,
            busy_polls,
            busy: 0,
            selected: false,
            bit: 0,
            in_byte: 0,
            out_byte: 0xFF,
            count: 0,
            header: [0; 4],
            payload: Vec::new(),
            ops: Vec::new(),
        }
    }

    /// Set status register 1 protection bits; `locked` makes them read-only
    pub fn set_protection(&mut self, sr1: u8, locked: bool) {
        self.sr1 = sr1 & SR1_WRITABLE;
        self.locked = locked;
    }

    /// Flash contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable flash contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// First byte of every completed transaction, in order
    pub fn ops(&self) -> &[u8] {
        &self.ops
    }

    /// Status register 1 as a status read would return it, without
    /// advancing the busy countdown
    pub fn status1(&self) -> u8 {
        let mut value = self.sr1;
        if self.wel {
            value |= opcodes::SR1_WEL;
        }
        if self.busy > 0 {
            value |= opcodes::SR1_BUSY;
        }
        value
    }

    /// Whether chip select is asserted
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Assert chip select
    pub fn select(&mut self) {
        self.selected = true;
        self.bit = 0;
        self.count = 0;
        self.payload.clear();
        self.out_byte = self.respond(0);
    }

    /// Clock one bit while selected
    pub fn clock(&mut self, mosi: bool) -> bool {
        let miso = self.out_byte & (0x80 >> self.bit) != 0;
        self.in_byte = (self.in_byte << 1) | mosi as u8;
        self.bit += 1;
        if self.bit == 8 {
            self.receive(self.in_byte);
            self.bit = 0;
            self.in_byte = 0;
            self.out_byte = self.respond(self.count);
        }
        miso
    }

    /// Release chip select and execute the completed command
    pub fn deselect(&mut self) {
        self.selected = false;
        if self.count > 0 {
            self.execute();
            self.ops.push(self.header[0]);
        }
        self.bit = 0;
        self.count = 0;
    }

    fn receive(&mut self, byte: u8) {
        if self.count < self.header.len() {
            self.header[self.count] = byte;
        } else if self.header[0] == opcodes::PP {
            self.payload.push(byte);
        }
        self.count += 1;
    }

    fn address(&self) -> usize {
        u32::from_be_bytes([0, self.header[1], self.header[2], self.header[3]]) as usize
    }

    fn read_at(&self, offset: usize) -> u8 {
        self.data[(self.address() + offset) % self.data.len()]
    }

    /// MISO byte for position `pos` of the transaction
    fn respond(&mut self, pos: usize) -> u8 {
        if pos == 0 {
            return 0xFF;
        }
        match self.header[0] {
            opcodes::RDSR => {
                let value = self.status1();
                if pos == 1 && self.busy > 0 {
                    self.busy -= 1;
                }
                value
            }
            opcodes::RDSR2 => self.sr2,
            opcodes::RDSR3 => self.sr3,
            opcodes::RDID => self.jedec.get(pos - 1).copied().unwrap_or(0),
            opcodes::READ if pos >= 4 => self.read_at(pos - 4),
            opcodes::FAST_READ if pos >= 5 => self.read_at(pos - 5),
            _ => 0xFF,
        }
    }

    fn protected(&self) -> bool {
        self.sr1 & opcodes::SR1_SWP != 0
    }

    fn start_write(&mut self) {
        self.wel = false;
        self.busy = self.busy_polls;
    }

    fn execute(&mut self) {
        let op = self.header[0];
        let is_write = matches!(
            op,
            opcodes::WREN
                | opcodes::WRSR
                | opcodes::PP
                | opcodes::SE_20
                | opcodes::BE_52
                | opcodes::BE_D8
                | opcodes::CE_C7
        );
        if is_write && self.busy > 0 {
            log::warn!("dummy flash: command 0x{:02X} ignored while busy", op);
            return;
        }

        match op {
            opcodes::WREN => self.wel = true,
            opcodes::WRDI => self.wel = false,
            opcodes::WRSR if self.count >= 2 && self.wel => {
                if !self.locked {
                    self.sr1 = self.header[1] & SR1_WRITABLE;
                }
                self.start_write();
            }
            opcodes::PP if self.count >= 4 && self.wel => {
                if self.protected() {
                    log::debug!("dummy flash: page program blocked by protection");
                } else {
                    let addr = self.address() % self.data.len();
                    let base = addr & !(PAGE_SIZE - 1);
                    for (i, &byte) in self.payload.iter().enumerate() {
                        let at = base + (addr % PAGE_SIZE + i) % PAGE_SIZE;
                        self.data[at] &= byte;
                    }
                }
                self.start_write();
            }
            opcodes::SE_20 | opcodes::BE_52 | opcodes::BE_D8 if self.count >= 4 && self.wel => {
                let size = match op {
                    opcodes::SE_20 => 4 * 1024,
                    opcodes::BE_52 => 32 * 1024,
                    _ => 64 * 1024,
                };
                if self.protected() {
                    log::debug!("dummy flash: erase blocked by protection");
                } else {
                    let begin = (self.address() % self.data.len()) & !(size - 1);
                    let end = (begin + size).min(self.data.len());
                    self.data[begin..end].fill(0xFF);
                }
                self.start_write();
            }
            opcodes::CE_C7 if self.wel => {
                if !self.protected() {
                    self.data.fill(0xFF);
                }
                self.start_write();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transact(flash: &mut SpiFlash, tx: &[u8]) -> Vec<u8> {
        flash.select();
        let mut rx = Vec::new();
        for &byte in tx {
            let mut out = 0u8;
            for i in 0..8 {
                let miso = flash.clock(byte & (0x80 >> i) != 0);
                out = (out << 1) | miso as u8;
            }
            rx.push(out);
        }
        flash.deselect();
        rx
    }

    #[test]
    fn test_jedec_id() {
        let mut flash = SpiFlash::new(4096, [0xEF, 0x40, 0x18], 0);
        assert_eq!(transact(&mut flash, &[0x9F, 0, 0, 0]), [0xFF, 0xEF, 0x40, 0x18]);
    }

    #[test]
    fn test_program_needs_write_enable() {
        let mut flash = SpiFlash::new(4096, [0; 3], 0);
        transact(&mut flash, &[0x02, 0, 0, 0, 0x12]);
        assert_eq!(flash.data()[0], 0xFF);

        transact(&mut flash, &[0x06]);
        transact(&mut flash, &[0x02, 0, 0, 0, 0x12]);
        assert_eq!(flash.data()[0], 0x12);
        assert_eq!(transact(&mut flash, &[0x03, 0, 0, 0, 0]), [0xFF, 0xFF, 0xFF, 0xFF, 0x12]);
    }

    #[test]
    fn test_busy_countdown() {
        let mut flash = SpiFlash::new(4096, [0; 3], 2);
        transact(&mut flash, &[0x06]);
        transact(&mut flash, &[0x20, 0, 0, 0]);
        assert_eq!(transact(&mut flash, &[0x05, 0])[1] & 1, 1);
        // Ignored while busy
        transact(&mut flash, &[0x06]);
        assert_eq!(transact(&mut flash, &[0x05, 0])[1], 0x01);
        assert_eq!(transact(&mut flash, &[0x05, 0])[1], 0x00);
    }

    #[test]
    fn test_page_wrap() {
        let mut flash = SpiFlash::new(4096, [0; 3], 0);
        transact(&mut flash, &[0x06]);
        transact(&mut flash, &[0x02, 0, 0, 0xFF, 0xA0, 0xA1]);
        assert_eq!(flash.data()[0xFF], 0xA0);
        assert_eq!(flash.data()[0x00], 0xA1);
        assert_eq!(flash.data()[0x100], 0xFF);
    }
}
