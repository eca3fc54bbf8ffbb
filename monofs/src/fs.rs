//! # Volume manager layer
//!
//! Builds the volume layout and runs it: format-on-first-mount, the
//! root bootstrap, both allocators, and the inode table geometry.

use std::mem;
use std::sync::Arc;

use spin::Mutex;

use crate::block_cache;
use crate::layout::{Bitmap, DiskInode};
use crate::BlockDevice;
use crate::DataBlock;
use crate::Inode;
use crate::{INODE_COUNT, RESERVED_BLOCKS, ROOT_INODE, TOTAL_BLOCKS};

const INODE_SIZE: usize = mem::size_of::<DiskInode>();
/// Records never straddle a block; the 40-byte block tail stays zero.
const INODES_PER_BLOCK: usize = crate::BLOCK_SIZE / INODE_SIZE;

/// Byte offsets of the two allocation maps inside block 0.
const BLOCK_BITMAP_OFFSET: usize = 0;
const INODE_BITMAP_OFFSET: usize = TOTAL_BLOCKS / 8;

const ROOT_DIR_MODE: u32 = 0o040755;

pub struct MonoFileSystem {
    block_device: Arc<dyn BlockDevice>,
    block_bitmap: Bitmap,
    inode_bitmap: Bitmap,
}

impl MonoFileSystem {
    /// Opens the volume, formatting it first when block 0 has never
    /// been written (even the bookkeeping block's own bit is clear).
    /// Every open re-verifies the root directory.
    pub fn open(block_device: Arc<dyn BlockDevice>) -> Arc<Mutex<Self>> {
        block_cache::purge();

        let fs = Self {
            block_device: block_device.clone(),
            block_bitmap: Bitmap::new(0, BLOCK_BITMAP_OFFSET),
            inode_bitmap: Bitmap::new(0, INODE_BITMAP_OFFSET),
        };

        if !fs.block_bitmap.get(&block_device, 0) {
            fs.format();
        }
        fs.init_root();

        Arc::new(Mutex::new(fs))
    }

    /// One-time layout: wipe every block, then reserve the bookkeeping
    /// block, the inode table, and the null inode.
    fn format(&self) {
        log::info!("formatting volume: {TOTAL_BLOCKS} blocks, {INODE_COUNT} inodes");

        for block_id in 0..TOTAL_BLOCKS {
            block_cache::get(block_id, self.block_device.clone())
                .lock()
                .map_mut(0, |block: &mut DataBlock| block.fill(0));
        }

        for block_id in 0..RESERVED_BLOCKS {
            self.block_bitmap.set(&self.block_device, block_id as u32);
        }
        self.inode_bitmap.set(&self.block_device, 0);
    }

    /// Root bootstrap: inode 1 must be allocated and carry a directory
    /// mode; anything else gets force-overwritten.
    fn init_root(&self) {
        let (block_id, offset) = self.disk_inode_pos(ROOT_INODE);
        let cache = block_cache::get(block_id as usize, self.block_device.clone());
        let mut cache = cache.lock();
        let root: &mut DiskInode = cache.get_mut(offset);

        if self.inode_bitmap.get(&self.block_device, ROOT_INODE) && root.is_dir() {
            return;
        }

        self.inode_bitmap.set(&self.block_device, ROOT_INODE);
        root.init(ROOT_INODE, ROOT_DIR_MODE);
        drop(cache);
        block_cache::sync_all();
    }

    /// Takes the lowest free block and hands it over zeroed.
    pub fn alloc_block(&mut self) -> Option<u32> {
        let block_id = self.block_bitmap.alloc(&self.block_device)?;
        block_cache::get(block_id as usize, self.block_device.clone())
            .lock()
            .map_mut(0, |block: &mut DataBlock| block.fill(0));
        log::debug!("alloc_block -> {block_id}");
        Some(block_id)
    }

    /// Returns a block to the free pool; its contents become garbage.
    /// Freeing twice is a reported no-op. The reserved region is off
    /// limits.
    pub fn free_block(&mut self, block_id: u32) {
        assert!(
            (block_id as usize) >= RESERVED_BLOCKS && (block_id as usize) < TOTAL_BLOCKS,
            "freeing reserved block {block_id}"
        );
        if !self.block_bitmap.dealloc(&self.block_device, block_id) {
            log::warn!("free_block: block {block_id} already free");
        }
    }

    /// Writes a fresh record with `mode` and returns its index.
    pub fn alloc_inode(&mut self, mode: u32) -> Option<u32> {
        let inum = self.inode_bitmap.alloc(&self.block_device)?;
        let (block_id, offset) = self.disk_inode_pos(inum);
        block_cache::get(block_id as usize, self.block_device.clone())
            .lock()
            .map_mut(offset, |node: &mut DiskInode| node.init(inum, mode));
        log::debug!("alloc_inode({mode:o}) -> {inum}");
        Some(inum)
    }

    /// Clears the allocation bit only; the caller has already released
    /// the record's blocks.
    pub fn dealloc_inode(&mut self, inum: u32) {
        if !self.inode_bitmap.dealloc(&self.block_device, inum) {
            log::warn!("dealloc_inode: inode {inum} already free");
        }
    }

    /// A record is live iff it is not the null inode and its bit is set.
    pub fn inode_allocated(&self, inum: u32) -> bool {
        inum != 0
            && (inum as usize) < INODE_COUNT
            && self.inode_bitmap.get(&self.block_device, inum)
    }

    /// Table position of record `inum`: block ID and in-block offset.
    pub fn disk_inode_pos(&self, inum: u32) -> (u32, usize) {
        let block_id = 1 + inum / INODES_PER_BLOCK as u32;
        let offset = inum as usize % INODES_PER_BLOCK * INODE_SIZE;
        (block_id, offset)
    }

    /// Populations of the block and inode maps, for accounting.
    pub fn bitmap_counts(&self) -> (usize, usize) {
        (
            self.block_bitmap.count(&self.block_device),
            self.inode_bitmap.count(&self.block_device),
        )
    }

    pub fn root_inode(fs: &Arc<Mutex<Self>>) -> Inode {
        let block_device = fs.lock().block_device.clone();
        let (block_id, block_offset) = fs.lock().disk_inode_pos(ROOT_INODE);
        Inode::new(block_id, block_offset, fs.clone(), block_device)
    }
}
