//! # monofs
//!
//! A persistent, inode-structured single-volume file system over a
//! fixed-size block image. The volume layout is
//! bookkeeping block (both allocation maps) | inode table | data blocks.

/* overall architecture, top down */

// storage façade: the path-addressed operation set
mod storage;
pub use storage::Storage;

// path resolver helpers
mod path;
pub use path::Path;

// inode layer: file I/O and directory operations over records
mod vfs;
pub use vfs::{FileKind, Inode, Stat};

// volume manager: format/open and the two allocators
mod fs;
pub use fs::MonoFileSystem;

// on-disk data structures
mod layout;
pub use layout::{DirEntry, DiskInode};

// block cache: typed in-memory views over device blocks
mod block_cache;

// block device interface
mod block_dev;
pub use block_dev::BlockDevice;

mod error;
pub use error::{Error, Result};

pub const BLOCK_SIZE: usize = 4096;
pub const TOTAL_BLOCKS: usize = 256;
pub const INODE_COUNT: usize = 256;

/// Direct block slots per inode record.
pub const NDIRECT: usize = 12;
/// Block indices held by the indirect block.
pub const INDIRECT_COUNT: usize = BLOCK_SIZE / size_of::<u32>();

/// The root directory's fixed inode number; inode 0 is the null record.
pub const ROOT_INODE: u32 = 1;

/// Blocks occupied by the inode table, starting at block 1.
pub const INODE_TABLE_BLOCKS: usize =
    (INODE_COUNT * size_of::<layout::DiskInode>()).div_ceil(BLOCK_SIZE);
/// Blocks reserved at format time: the bookkeeping block plus the table.
pub const RESERVED_BLOCKS: usize = 1 + INODE_TABLE_BLOCKS;

/// What the block mapping can address.
pub const MAX_FILE_SIZE: usize = (NDIRECT + INDIRECT_COUNT) * BLOCK_SIZE;

type DataBlock = [u8; BLOCK_SIZE];
