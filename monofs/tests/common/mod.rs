use std::sync::{Arc, Mutex};

use monofs::{BlockDevice, BLOCK_SIZE, TOTAL_BLOCKS};

/// RAM-backed volume for exercising the core without host files.
pub struct MemDisk(Mutex<Vec<u8>>);

impl MemDisk {
    pub fn new() -> Self {
        Self(Mutex::new(vec![0; TOTAL_BLOCKS * BLOCK_SIZE]))
    }

    pub fn open() -> Arc<dyn BlockDevice> {
        Arc::new(Self::new())
    }
}

impl BlockDevice for MemDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let data = self.0.lock().unwrap();
        let start = block_id * BLOCK_SIZE;
        buf.copy_from_slice(&data[start..start + BLOCK_SIZE]);
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut data = self.0.lock().unwrap();
        let start = block_id * BLOCK_SIZE;
        data[start..start + BLOCK_SIZE].copy_from_slice(buf);
    }
}
