//! # Storage façade
//!
//! Path-addressed operations over one mounted volume: the API the
//! mount bridge drives. Resolution always starts at the root; every
//! mutation funnels through the inode layer below.

use std::sync::Arc;

use spin::Mutex;

use crate::block_cache;
use crate::path::Path;
use crate::vfs::{Inode, Stat};
use crate::BlockDevice;
use crate::MonoFileSystem;
use crate::{Error, Result};

pub struct Storage {
    fs: Arc<Mutex<MonoFileSystem>>,
    block_device: Arc<dyn BlockDevice>,
}

impl Storage {
    /// Mounts the volume behind `block_device`, formatting it on first
    /// use.
    pub fn open(block_device: Arc<dyn BlockDevice>) -> Self {
        let fs = MonoFileSystem::open(block_device.clone());
        Self { fs, block_device }
    }

    /// The root directory's handle.
    pub fn root(&self) -> Inode {
        MonoFileSystem::root_inode(&self.fs)
    }

    /// Walks `path` from the root down to its inode.
    pub fn resolve(&self, path: &str) -> Result<Inode> {
        if !path.is_absolute() {
            return Err(Error::InvalidArgument);
        }

        let mut node = self.root();
        let Some(relative) = path.root_relative() else {
            return Ok(node);
        };
        for component in relative.split('/').filter(|c| !c.is_empty()) {
            if !node.is_dir() {
                log::error!("resolve: middle component of {path:?} is not a directory");
                return Err(Error::NotFound);
            }
            let inum = node.lookup(component).ok_or(Error::NotFound)?;
            node = self.inode(inum);
        }

        Ok(node)
    }

    /// Does `path` name anything?
    pub fn access(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    pub fn stat(&self, path: &str) -> Result<Stat> {
        Ok(self.resolve(path)?.stat())
    }

    /// Reads up to `buf.len()` bytes at `offset`; returns how many
    /// landed (0 past the end of the file).
    pub fn read(&self, path: &str, buf: &mut [u8], offset: usize) -> Result<usize> {
        let node = self.resolve(path)?;
        Ok(node.read_at(offset, buf))
    }

    /// Writes `buf` at `offset`, extending the file as needed; short
    /// when the volume fills up mid-write.
    pub fn write(&self, path: &str, buf: &[u8], offset: usize) -> Result<usize> {
        self.resolve(path)?.write_at(offset, buf)
    }

    /// Grows or shrinks the file to exactly `size` bytes.
    pub fn truncate(&self, path: &str, size: usize) -> Result<()> {
        self.resolve(path)?.resize(size)
    }

    /// Creates a fresh inode with `mode` and binds it under its parent
    /// directory. An existing entry of the same name is not rejected.
    pub fn mknod(&self, path: &str, mode: u32) -> Result<()> {
        let (parent_path, name) = path.parent_file().ok_or(Error::InvalidArgument)?;
        let parent = self.resolve(parent_path)?;
        if !parent.is_dir() {
            return Err(Error::NotADirectory);
        }

        let inum = self.fs.lock().alloc_inode(mode).ok_or(Error::NoInodes)?;
        if let Err(e) = parent.put(name, inum) {
            // keep allocations paired
            self.inode(inum).free();
            return Err(e);
        }
        Ok(())
    }

    /// Drops the directory entry at `path`; the file itself goes once
    /// its last link does.
    pub fn unlink(&self, path: &str) -> Result<()> {
        let (parent_path, name) = path.parent_file().ok_or(Error::InvalidArgument)?;
        let parent = self.resolve(parent_path)?;
        parent.delete(name)
    }

    /// Removes a directory iff nothing live remains in it; leftover
    /// tombstones count as empty.
    pub fn rmdir(&self, path: &str) -> Result<()> {
        let node = self.resolve(path)?;
        if !node.is_dir() {
            return Err(Error::NotADirectory);
        }
        if node.read_entry(0).is_some() {
            return Err(Error::DirectoryNotEmpty);
        }
        self.unlink(path)
    }

    /// Moves `from` to `to`. A regular file whose destination resolves
    /// to a directory moves into it under its current name. The new
    /// binding is created before the old one is dropped, so the target
    /// never dangles.
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let node = self.resolve(from)?;
        let (from_parent, from_name) = from.parent_file().ok_or(Error::InvalidArgument)?;
        let from_dir = self.resolve(from_parent)?;

        let into_dir = if node.is_dir() {
            None
        } else {
            self.resolve(to).ok().filter(Inode::is_dir)
        };

        let (to_dir, to_name);
        match into_dir {
            Some(dir) => {
                to_dir = dir;
                to_name = from_name;
            }
            None => {
                let (to_parent, name) = to.parent_file().ok_or(Error::InvalidArgument)?;
                to_dir = self.resolve(to_parent)?;
                to_name = name;
            }
        }
        if !to_dir.is_dir() {
            return Err(Error::NotADirectory);
        }

        to_dir.put(to_name, node.inum())?;
        from_dir.delete(from_name)?;
        Ok(())
    }

    /// Names in the directory at `path`, in slot order.
    pub fn list(&self, path: &str) -> Result<Vec<String>> {
        self.resolve(path)?.list()
    }

    /// Populations of the block and inode maps.
    pub fn allocation_counts(&self) -> (usize, usize) {
        self.fs.lock().bitmap_counts()
    }

    /// Durability point: pushes every dirty block down to the device.
    pub fn sync(&self) {
        block_cache::sync_all();
    }

    fn inode(&self, inum: u32) -> Inode {
        let (block_id, block_offset) = self.fs.lock().disk_inode_pos(inum);
        Inode::new(block_id, block_offset, self.fs.clone(), self.block_device.clone())
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        block_cache::sync_all();
    }
}
