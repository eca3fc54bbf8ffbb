//! # Block device interface
//!
//! [`BlockDevice`] abstracts the backing volume as an array of
//! `BLOCK_SIZE`-byte blocks. Implementations are the device drivers;
//! everything above reaches the bytes through this trait only.

use core::any::Any;

pub trait BlockDevice: Send + Sync + Any {
    fn read_block(&self, block_id: usize, buf: &mut [u8]);
    fn write_block(&self, block_id: usize, buf: &[u8]);
}
