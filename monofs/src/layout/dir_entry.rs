use std::{ptr, slice};

/// Capacity of the name field; the final byte always stays NUL.
const NAME_LEN: usize = 48;

/// One directory slot: a name bound to an inode number, padded out to
/// 64 bytes. A zero `inum` marks a tombstone left behind by delete,
/// reusable by a later put.
#[derive(Debug, Clone)]
#[repr(C)]
pub struct DirEntry {
    name: [u8; NAME_LEN],
    inum: u32,
    _reserved: [u8; 12],
}

impl DirEntry {
    /// Slot size is fixed at 64 bytes.
    pub const SIZE: usize = 64;

    pub fn new(name: &str, inum: u32) -> Self {
        let bytes = name.as_bytes();
        let len = bytes.len().min(NAME_LEN - 1);
        let mut name = [0; NAME_LEN];
        name[..len].copy_from_slice(&bytes[..len]);

        Self {
            name,
            inum,
            _reserved: [0; 12],
        }
    }

    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|&c| c == 0).unwrap();
        std::str::from_utf8(&self.name[..len]).unwrap()
    }

    #[inline]
    pub fn inum(&self) -> u32 {
        self.inum
    }

    /// A vacated slot waiting for reuse.
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.inum == 0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), Self::SIZE) }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(ptr::from_mut(self).cast(), Self::SIZE) }
    }
}

impl Default for DirEntry {
    fn default() -> Self {
        Self {
            name: [0; NAME_LEN],
            inum: 0,
            _reserved: [0; 12],
        }
    }
}
