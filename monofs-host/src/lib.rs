
use std::fs::{File, OpenOptions};
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use monofs::BlockDevice;
use monofs::{BLOCK_SIZE, TOTAL_BLOCKS};

/// The backing image as a block device. Created and forced to the full
/// volume size on first use (zero-filled by the host file system), and
/// fsynced when the last handle goes away.
pub struct ImageFile(Mutex<File>);

impl ImageFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        fd.set_len((TOTAL_BLOCKS * BLOCK_SIZE) as u64)?;

        Ok(Self(Mutex::new(fd)))
    }
}

impl BlockDevice for ImageFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .expect("seeking error");
        assert_eq!(file.read(buf).unwrap(), BLOCK_SIZE, "not a complete block!");
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .expect("seeking error");
        assert_eq!(
            file.write(buf).unwrap(),
            BLOCK_SIZE,
            "not a complete block!"
        );
    }
}

impl Drop for ImageFile {
    fn drop(&mut self) {
        // the release half of the mount contract
        if let Ok(file) = self.0.lock() {
            let _ = file.sync_all();
        }
    }
}
