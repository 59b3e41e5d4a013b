//! Erase region arithmetic

use core::ops::Range;

use crate::error::{Error, Result};
use crate::protocol::{EraseBlock, MAX_FLASH_SIZE};

/// Block-aligned span covering a write
///
/// `begin` is the offset rounded down and `end` the end of the data
/// rounded up to the block size, so the region is the smallest run of
/// whole blocks containing `[offset, offset + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseRegion {
    begin: u32,
    end: u32,
    block: EraseBlock,
}

impl EraseRegion {
    /// Region for `len` bytes at `offset`
    pub fn new(offset: u32, len: usize, block: EraseBlock) -> Result<Self> {
        let size = block.size() as u64;
        let start = offset as u64;
        let stop = start + len as u64;
        if stop > MAX_FLASH_SIZE as u64 {
            return Err(Error::AddressOutOfBounds);
        }
        let begin = start / size * size;
        let end = stop.div_ceil(size) * size;
        Ok(Self {
            begin: begin as u32,
            end: end as u32,
            block,
        })
    }

    /// First erased address
    pub fn begin(&self) -> u32 {
        self.begin
    }

    /// One past the last erased address
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Bytes covered
    pub fn len(&self) -> u32 {
        self.end - self.begin
    }

    /// Whether there is nothing to erase
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Block size
    pub fn block(&self) -> EraseBlock {
        self.block
    }

    /// Address range
    pub fn range(&self) -> Range<u32> {
        self.begin..self.end
    }

    /// Start address of every block, in ascending order
    pub fn blocks(&self) -> impl Iterator<Item = u32> {
        (self.begin..self.end).step_by(self.block.size() as usize)
    }

    /// Number of blocks
    pub fn block_count(&self) -> usize {
        (self.len() / self.block.size()) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    const BLOCKS: [EraseBlock; 3] = [EraseBlock::Sector4K, EraseBlock::Block32K, EraseBlock::Block64K];

    #[test]
    fn test_region_properties() {
        let offsets = [0u32, 1, 255, 4095, 4096, 0x7FFF, 0x1_0001, 0x12_3456];
        let lengths = [0usize, 1, 255, 256, 4096, 4097, 65536, 100_000];
        for block in BLOCKS {
            let size = block.size();
            for &offset in &offsets {
                for &len in &lengths {
                    let r = EraseRegion::new(offset, len, block).unwrap();
                    let stop = offset + len as u32;
                    assert!(r.begin() <= offset);
                    assert!(r.end() >= stop);
                    assert_eq!(r.begin() % size, 0);
                    assert_eq!(r.end() % size, 0);
                    // Minimal: shrinking either side by a block loses coverage
                    assert!(r.begin() + size > offset);
                    assert!(r.end() < stop + size);
                }
            }
        }
    }

    #[test]
    fn test_blocks() {
        let r = EraseRegion::new(0x1000, 0x2_0000, EraseBlock::Block64K).unwrap();
        assert_eq!(r.begin(), 0);
        assert_eq!(r.end(), 0x3_0000);
        let blocks: Vec<u32> = r.blocks().collect();
        assert_eq!(blocks, [0, 0x1_0000, 0x2_0000]);
        assert_eq!(r.block_count(), 3);
    }

    #[test]
    fn test_empty_aligned() {
        let r = EraseRegion::new(0x8000, 0, EraseBlock::Block32K).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.blocks().count(), 0);
    }

    #[test]
    fn test_out_of_bounds() {
        assert_eq!(
            EraseRegion::new(MAX_FLASH_SIZE - 1, 2, EraseBlock::Sector4K),
            Err(Error::AddressOutOfBounds)
        );
        let r = EraseRegion::new(MAX_FLASH_SIZE - 1, 1, EraseBlock::Block64K).unwrap();
        assert_eq!(r.end(), MAX_FLASH_SIZE);
    }
}
