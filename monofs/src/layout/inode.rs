//! The 72-byte inode record and its block mapping: `NDIRECT` direct
//! slots, then one indirect block holding `INDIRECT_COUNT` more
//! indices. Index 0 never names a data block, so a zero slot always
//! means "unassigned".

use std::sync::Arc;

use crate::block_cache;
use crate::vfs::FileKind;
use crate::BlockDevice;
use crate::DataBlock;
use crate::{BLOCK_SIZE, INDIRECT_COUNT, NDIRECT};

/// A data block repurposed to hold block indices.
type IndirectBlock = [u32; INDIRECT_COUNT];

#[derive(Debug, Default)]
#[repr(C)]
pub struct DiskInode {
    /// Own table index; 0 marks the null record
    pub inum: u32,
    /// UNIX mode word, type bits included
    pub mode: u32,
    /// In-memory reference hint, reserved-zero
    pub refs: u32,
    /// Hard links held by directory entries
    pub links: u32,
    /// Bytes
    pub size: u32,
    direct: [u32; NDIRECT],
    indirect: u32,
}

impl DiskInode {
    /// Fresh record: everything zero but identity and mode.
    #[inline]
    pub fn init(&mut self, inum: u32, mode: u32) {
        *self = Self {
            inum,
            mode,
            ..Default::default()
        };
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        FileKind::of_mode(self.mode).contains(FileKind::Directory)
    }

    #[inline]
    pub fn indirect(&self) -> u32 {
        self.indirect
    }

    #[inline]
    pub fn set_indirect(&mut self, block_id: u32) {
        self.indirect = block_id;
    }

    /// The block index stored for file block `index`, or `None` when
    /// the slot cannot exist (out of range, or the indirect block is
    /// not allocated).
    pub fn block_at(&self, index: usize, block_device: &Arc<dyn BlockDevice>) -> Option<u32> {
        if index < NDIRECT {
            return Some(self.direct[index]);
        }
        if index >= NDIRECT + INDIRECT_COUNT || self.indirect == 0 {
            return None;
        }
        let block_id = block_cache::get(self.indirect as usize, block_device.clone())
            .lock()
            .map(0, |indirect: &IndirectBlock| indirect[index - NDIRECT]);
        Some(block_id)
    }

    /// Stores `block_id` in the slot for file block `index`. Indirect
    /// slots require the indirect block to exist already.
    pub fn set_block_at(&mut self, index: usize, block_id: u32, block_device: &Arc<dyn BlockDevice>) {
        if index < NDIRECT {
            self.direct[index] = block_id;
            return;
        }
        assert!(index < NDIRECT + INDIRECT_COUNT && self.indirect != 0);
        block_cache::get(self.indirect as usize, block_device.clone())
            .lock()
            .map_mut(0, |indirect: &mut IndirectBlock| {
                indirect[index - NDIRECT] = block_id
            });
    }

    /// Fills `buf` from byte `offset`, stopping at the end of the file.
    pub fn read_at(&self, offset: usize, buf: &mut [u8], block_device: &Arc<dyn BlockDevice>) -> usize {
        let mut start = offset;
        let end = (start + buf.len()).min(self.size as usize);

        if start >= end {
            return 0;
        }

        let mut read_size = 0;
        loop {
            let block_index = start / BLOCK_SIZE;
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_read_size = current_block_end - start;
            let dest = &mut buf[read_size..read_size + block_read_size];

            let block_id = self
                .block_at(block_index, block_device)
                .expect("file block within size must be mapped");
            block_cache::get(block_id as usize, block_device.clone())
                .lock()
                .map(0, |data: &DataBlock| {
                    let src = &data[start % BLOCK_SIZE..start % BLOCK_SIZE + block_read_size];
                    dest.copy_from_slice(src);
                });

            read_size += block_read_size;

            if current_block_end == end {
                break;
            }

            start = current_block_end;
        }

        read_size
    }

    /// Copies `buf` in at byte `offset`, stopping at the end of the
    /// file. Growing is the caller's business.
    pub fn write_at(&mut self, offset: usize, buf: &[u8], block_device: &Arc<dyn BlockDevice>) -> usize {
        let mut start = offset;
        let end = (start + buf.len()).min(self.size as usize);

        if start >= end {
            return 0;
        }

        let mut written_size = 0;
        loop {
            let block_index = start / BLOCK_SIZE;
            let current_block_end = ((block_index + 1) * BLOCK_SIZE).min(end);
            let block_write_size = current_block_end - start;
            let src = &buf[written_size..written_size + block_write_size];

            let block_id = self
                .block_at(block_index, block_device)
                .expect("file block within size must be mapped");
            block_cache::get(block_id as usize, block_device.clone())
                .lock()
                .map_mut(0, |data: &mut DataBlock| {
                    let dest =
                        &mut data[start % BLOCK_SIZE..start % BLOCK_SIZE + block_write_size];
                    dest.copy_from_slice(src);
                });

            written_size += block_write_size;

            if current_block_end == end {
                break;
            }

            start = current_block_end;
        }

        written_size
    }

    /// Data blocks needed to hold `size` bytes.
    #[inline]
    pub fn count_data_blocks(size: u32) -> usize {
        (size as usize).div_ceil(BLOCK_SIZE)
    }

    /// Every volume block the file owns: its data blocks plus the
    /// indirect block when allocated.
    pub fn owned_blocks(&self, block_device: &Arc<dyn BlockDevice>) -> Vec<u32> {
        let count = Self::count_data_blocks(self.size);
        let mut blocks = Vec::with_capacity(count + 1);

        for index in 0..count {
            match self.block_at(index, block_device) {
                Some(block_id) if block_id != 0 => blocks.push(block_id),
                _ => (),
            }
        }
        if self.indirect != 0 {
            blocks.push(self.indirect);
        }

        blocks
    }
}
