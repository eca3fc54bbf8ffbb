use std::mem;

use monofs::{DirEntry, DiskInode};
use monofs::{
    BLOCK_SIZE, INDIRECT_COUNT, INODE_TABLE_BLOCKS, MAX_FILE_SIZE, NDIRECT, RESERVED_BLOCKS,
};

#[test]
fn on_disk_records() {
    assert_eq!(72, mem::size_of::<DiskInode>());
    assert_eq!(64, mem::size_of::<DirEntry>());
    assert_eq!(DirEntry::SIZE, mem::size_of::<DirEntry>());
}

#[test]
fn volume_geometry() {
    assert_eq!(1024, INDIRECT_COUNT);
    assert_eq!(5, INODE_TABLE_BLOCKS);
    assert_eq!(6, RESERVED_BLOCKS);
    assert_eq!((NDIRECT + INDIRECT_COUNT) * BLOCK_SIZE, MAX_FILE_SIZE);
}
