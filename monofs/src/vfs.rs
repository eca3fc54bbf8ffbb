//! # Inode layer
//!
//! In-memory handles over on-disk records: file I/O with on-demand
//! growth and tail-release shrinking, plus the directory operations
//! layered over the same byte stream.
//!
//! A handle is a window, not a copy; every mutation lands in the block
//! cache immediately and is visible to every other handle.

use std::sync::Arc;

use enumflags2::{bitflags, BitFlags};
use spin::Mutex;

use crate::block_cache;
use crate::layout::{DirEntry, DiskInode};
use crate::BlockDevice;
use crate::MonoFileSystem;
use crate::{Error, Result};
use crate::{BLOCK_SIZE, INDIRECT_COUNT, NDIRECT};

/// The file-type bits of the mode word.
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory = 0o040000,
    Regular = 0o100000,
}

impl FileKind {
    /// Type bits of a mode word, permissions stripped.
    #[inline]
    pub fn of_mode(mode: u32) -> BitFlags<Self> {
        BitFlags::from_bits_truncate(mode)
    }
}

/// POSIX-shaped inode metadata. Times are not tracked and stay zero.
#[derive(Debug, Default)]
pub struct Stat {
    pub ino: u32,
    pub mode: u32,
    pub links: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    /// Preferred I/O granule
    pub block_size: u32,
    /// Data blocks backing `size`
    pub blocks: u32,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
}

pub struct Inode {
    /// Table block holding the record
    block_id: usize,
    /// Record offset inside that block
    block_offset: usize,
    fs: Arc<Mutex<MonoFileSystem>>,
    block_device: Arc<dyn BlockDevice>,
}

impl Inode {
    #[inline]
    pub fn new(
        block_id: u32,
        block_offset: usize,
        fs: Arc<Mutex<MonoFileSystem>>,
        block_device: Arc<dyn BlockDevice>,
    ) -> Self {
        Self {
            block_id: block_id as usize,
            block_offset,
            fs,
            block_device,
        }
    }

    /// Table index of the record.
    pub fn inum(&self) -> u32 {
        let _fs = self.fs.lock();
        self.on_disk(|node| node.inum)
    }

    pub fn is_dir(&self) -> bool {
        let _fs = self.fs.lock();
        self.on_disk(DiskInode::is_dir)
    }

    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> usize {
        let _fs = self.fs.lock();
        self.on_disk(|node| node.read_at(offset, buf, &self.block_device))
    }

    /// Writes at `offset`, growing the file first. When growth stops
    /// short the write is short too; a write that lands nothing is an
    /// error, never `Ok(0)`.
    pub fn write_at(&self, offset: usize, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(Error::InvalidArgument);
        }
        let mut fs = self.fs.lock();

        let grown = self.grow(offset + buf.len(), &mut fs);
        let written = self.on_disk_mut(|node| node.write_at(offset, buf, &self.block_device));
        block_cache::sync_all();

        if written == 0 {
            Err(grown.err().unwrap_or(Error::NoSpace))
        } else {
            Ok(written)
        }
    }

    /// Sets the file to exactly `new_size` bytes, growing or releasing
    /// blocks as needed.
    pub fn resize(&self, new_size: usize) -> Result<()> {
        let mut fs = self.fs.lock();

        let size = self.on_disk(|node| node.size) as usize;
        let result = if new_size > size {
            self.grow(new_size, &mut fs)
        } else {
            if new_size < size {
                self.shrink(new_size, &mut fs);
            }
            Ok(())
        };
        block_cache::sync_all();
        result
    }

    pub fn stat(&self) -> Stat {
        let _fs = self.fs.lock();
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        self.on_disk(|node| Stat {
            ino: node.inum,
            mode: node.mode,
            links: node.links,
            uid,
            gid,
            size: node.size,
            block_size: BLOCK_SIZE as u32,
            blocks: DiskInode::count_data_blocks(node.size) as u32,
            ..Default::default()
        })
    }

    /// Every volume block the file currently owns, indirect included.
    pub fn owned_blocks(&self) -> Vec<u32> {
        let _fs = self.fs.lock();
        self.on_disk(|node| node.owned_blocks(&self.block_device))
    }

    /// Shrinks to nothing and returns the record to the table.
    /// Idempotent: a record that is already free stays free.
    pub fn free(&self) {
        let mut fs = self.fs.lock();
        let inum = self.on_disk(|node| node.inum);
        if !fs.inode_allocated(inum) {
            return;
        }
        self.release(&mut fs);
        block_cache::sync_all();
    }
}

/// Directory operations. A directory's byte stream is a dense array of
/// [`DirEntry`] slots; it only ever grows, tombstones are reused in
/// place and never compacted out.
impl Inode {
    /// Inode number bound to `name`, if any slot carries it.
    pub fn lookup(&self, name: &str) -> Option<u32> {
        let _fs = self.fs.lock();
        self.on_disk(|dir| self.lookup_slot(dir, name).map(|(_, entry)| entry.inum()))
    }

    /// The `index`-th live entry, tombstones not counted.
    pub fn read_entry(&self, index: usize) -> Option<DirEntry> {
        let _fs = self.fs.lock();
        self.on_disk(|dir| {
            let slots = dir.size as usize / DirEntry::SIZE;
            let mut live = 0;
            for slot in 0..slots {
                let entry = self.read_slot(dir, slot);
                if !entry.is_tombstone() {
                    if live == index {
                        return Some(entry);
                    }
                    live += 1;
                }
            }
            None
        })
    }

    /// Binds `name` to `inum`: the first tombstone slot wins, else a
    /// fresh slot is appended past the end. The target gains a link.
    /// Duplicate names are not rejected; the older entry keeps winning
    /// lookups.
    pub fn put(&self, name: &str, inum: u32) -> Result<()> {
        let mut fs = self.fs.lock();

        let dir_inum = self.on_disk(|dir| dir.inum);
        if !fs.inode_allocated(dir_inum) || !fs.inode_allocated(inum) {
            return Err(Error::InvalidState);
        }

        let (offset, size) = self.on_disk(|dir| {
            let slots = dir.size as usize / DirEntry::SIZE;
            let offset = (0..slots)
                .find(|&slot| self.read_slot(dir, slot).is_tombstone())
                .map_or(dir.size as usize, |slot| slot * DirEntry::SIZE);
            (offset, dir.size as usize)
        });

        // appending writes past the end; make room first
        if offset == size {
            self.grow(size + DirEntry::SIZE, &mut fs)?;
        }

        let entry = DirEntry::new(name, inum);
        let written =
            self.on_disk_mut(|dir| dir.write_at(offset, entry.as_bytes(), &self.block_device));
        if written != DirEntry::SIZE {
            return Err(Error::NoSpace);
        }

        self.inode(&fs, inum).on_disk_mut(|node| node.links += 1);
        block_cache::sync_all();
        Ok(())
    }

    /// Removes `name`: the target loses a link and is released once no
    /// links remain; the slot becomes a reusable tombstone.
    pub fn delete(&self, name: &str) -> Result<()> {
        let mut fs = self.fs.lock();

        let (slot, entry) = self
            .on_disk(|dir| self.lookup_slot(dir, name))
            .ok_or(Error::NotFound)?;
        let inum = entry.inum();
        if !fs.inode_allocated(inum) {
            return Err(Error::InvalidState);
        }

        let target = self.inode(&fs, inum);
        let links = target.on_disk_mut(|node| {
            node.links = node.links.saturating_sub(1);
            node.links
        });
        if links == 0 {
            target.release(&mut fs);
        }

        let tombstone = DirEntry::default();
        self.on_disk_mut(|dir| {
            dir.write_at(slot * DirEntry::SIZE, tombstone.as_bytes(), &self.block_device)
        });
        block_cache::sync_all();
        Ok(())
    }

    /// Names of the live entries, in slot order.
    pub fn list(&self) -> Result<Vec<String>> {
        let _fs = self.fs.lock();
        self.on_disk(|dir| {
            if !dir.is_dir() {
                return Err(Error::NotADirectory);
            }
            let slots = dir.size as usize / DirEntry::SIZE;
            let mut names = Vec::new();
            for slot in 0..slots {
                let entry = self.read_slot(dir, slot);
                if !entry.is_tombstone() {
                    names.push(entry.name().to_owned());
                }
            }
            Ok(names)
        })
    }
}

impl Inode {
    /// Reads the mapped record.
    fn on_disk<V>(&self, f: impl FnOnce(&DiskInode) -> V) -> V {
        block_cache::get(self.block_id, self.block_device.clone())
            .lock()
            .map(self.block_offset, f)
    }

    /// Mutates the mapped record in place.
    fn on_disk_mut<V>(&self, f: impl FnOnce(&mut DiskInode) -> V) -> V {
        block_cache::get(self.block_id, self.block_device.clone())
            .lock()
            .map_mut(self.block_offset, f)
    }

    /// Handle for another record of the same volume.
    fn inode(&self, fs: &MonoFileSystem, inum: u32) -> Inode {
        let (block_id, block_offset) = fs.disk_inode_pos(inum);
        Self::new(block_id, block_offset, self.fs.clone(), self.block_device.clone())
    }

    fn read_slot(&self, dir: &DiskInode, slot: usize) -> DirEntry {
        let mut entry = DirEntry::default();
        let read = dir.read_at(slot * DirEntry::SIZE, entry.as_bytes_mut(), &self.block_device);
        assert_eq!(read, DirEntry::SIZE);
        entry
    }

    /// First slot whose stored name matches, with its contents.
    fn lookup_slot(&self, dir: &DiskInode, name: &str) -> Option<(usize, DirEntry)> {
        let slots = dir.size as usize / DirEntry::SIZE;
        (0..slots).find_map(|slot| {
            let entry = self.read_slot(dir, slot);
            (entry.name() == name).then_some((slot, entry))
        })
    }

    /// Extends the file to `new_size` bytes, allocating data blocks one
    /// at a time and the indirect block on demand. When allocation runs
    /// out the blocks already gained stay committed and the size lands
    /// on the block boundary reached.
    fn grow(&self, new_size: usize, fs: &mut MonoFileSystem) -> Result<()> {
        self.on_disk_mut(|node| {
            if new_size <= node.size as usize {
                return Ok(());
            }

            let mut current = DiskInode::count_data_blocks(node.size);
            let target = new_size.div_ceil(BLOCK_SIZE);

            while current < target {
                if current >= NDIRECT + INDIRECT_COUNT {
                    node.size = (current * BLOCK_SIZE) as u32;
                    return Err(Error::NoSpace);
                }
                if current >= NDIRECT && node.indirect() == 0 {
                    let Some(block_id) = fs.alloc_block() else {
                        node.size = (current * BLOCK_SIZE) as u32;
                        return Err(Error::NoSpace);
                    };
                    node.set_indirect(block_id);
                }
                let Some(block_id) = fs.alloc_block() else {
                    node.size = (current * BLOCK_SIZE) as u32;
                    return Err(Error::NoSpace);
                };
                node.set_block_at(current, block_id, &self.block_device);
                current += 1;
            }

            node.size = new_size as u32;
            Ok(())
        })
    }

    /// Releases blocks from the tail down to `new_size` bytes, dropping
    /// the indirect block once the file fits in the direct slots.
    fn shrink(&self, new_size: usize, fs: &mut MonoFileSystem) {
        self.on_disk_mut(|node| {
            let current = DiskInode::count_data_blocks(node.size);
            let target = new_size.div_ceil(BLOCK_SIZE);

            for index in (target..current).rev() {
                match node.block_at(index, &self.block_device) {
                    Some(block_id) if block_id != 0 => {
                        fs.free_block(block_id);
                        node.set_block_at(index, 0, &self.block_device);
                    }
                    _ => (),
                }
            }

            if target <= NDIRECT && node.indirect() != 0 {
                fs.free_block(node.indirect());
                node.set_indirect(0);
            }

            node.size = new_size as u32;
        })
    }

    /// Frees every block the record owns and clears its table bit.
    fn release(&self, fs: &mut MonoFileSystem) {
        self.shrink(0, fs);
        let inum = self.on_disk(|node| node.inum);
        fs.dealloc_inode(inum);
    }
}
