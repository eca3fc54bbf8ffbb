//! # On-disk data structures
//!
//! What the volume's bytes mean:
//! block 0 carries both allocation maps back-to-back, blocks 1..=5 the
//! inode table, everything after is data.

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::DiskInode;

/// Directory slot, also an on-disk record
mod dir_entry;
pub use dir_entry::DirEntry;
