//! # Block cache layer
//!
//! Every block access goes through an in-memory copy of the block;
//! repeated accesses hit the same copy, and typed views over the copy
//! are how the upper layers read records in place.
//!
//! Writing back does not remove a cache; eviction is the manager's
//! business and only touches blocks nobody holds.

use std::mem;
use std::sync::Arc;

use spin::Mutex;

use crate::BlockDevice;
use crate::BLOCK_SIZE;

static BLOCK_CACHE_MANAGER: Mutex<BlockCacheManager> = Mutex::new(BlockCacheManager::new());

/// Distinct devices may both own a given block ID, so cached blocks are
/// keyed by device identity as well.
type CacheKey = (usize, usize);

/// Global cache bookkeeping: lookup and eviction.
struct BlockCacheManager {
    queue: Vec<(CacheKey, Arc<Mutex<BlockCache>>)>,
}

#[inline]
fn key_of(block_id: usize, block_device: &Arc<dyn BlockDevice>) -> CacheKey {
    (Arc::as_ptr(block_device).cast::<u8>() as usize, block_id)
}

#[inline]
pub fn get(block_id: usize, block_device: Arc<dyn BlockDevice>) -> Arc<Mutex<BlockCache>> {
    BLOCK_CACHE_MANAGER.lock().get(block_id, block_device)
}

pub fn sync_all() {
    // snapshot first: holding the manager while taking block locks
    // would deadlock against a holder waiting for the manager
    let caches: Vec<Arc<Mutex<BlockCache>>> = BLOCK_CACHE_MANAGER
        .lock()
        .queue
        .iter()
        .map(|(_, cache)| Arc::clone(cache))
        .collect();

    for cache in caches {
        cache.lock().sync();
    }
}

/// Drops every cache nobody else holds, writing dirty ones back first.
/// Opening a volume starts from here so a reused device address can
/// never be served another device's stale blocks.
pub fn purge() {
    BLOCK_CACHE_MANAGER
        .lock()
        .queue
        .retain(|(_, cache)| Arc::strong_count(cache) > 1);
}

/// One block's bytes held in memory.
#[repr(C)]
pub struct BlockCache {
    /// The cached data; kept first so typed views stay aligned
    data: [u8; BLOCK_SIZE],
    block_id: usize,
    block_device: Arc<dyn BlockDevice>,
    modified: bool,
}

impl BlockCache {
    pub fn new(block_id: usize, block_device: Arc<dyn BlockDevice>) -> Self {
        let mut data = [0; BLOCK_SIZE];
        block_device.read_block(block_id, &mut data);

        Self {
            data,
            block_id,
            block_device,
            modified: false,
        }
    }

    pub fn sync(&mut self) {
        if self.modified {
            self.modified = false;
            self.block_device.write_block(self.block_id, &self.data);
        }
    }

    pub fn get<T: Sized>(&self, offset: usize) -> &T {
        let type_size = mem::size_of::<T>();
        assert!(type_size + offset <= BLOCK_SIZE);
        let addr = self.offset(offset).cast();
        unsafe { &*addr }
    }

    pub fn get_mut<T: Sized>(&mut self, offset: usize) -> &mut T {
        let type_size = mem::size_of::<T>();
        assert!(type_size + offset <= BLOCK_SIZE);
        self.modified = true;
        let addr = self.offset(offset).cast_mut().cast();
        unsafe { &mut *addr }
    }

    #[inline]
    pub fn map<T: Sized, V>(&self, offset: usize, f: impl FnOnce(&T) -> V) -> V {
        f(self.get(offset))
    }

    #[inline]
    pub fn map_mut<T: Sized, V>(&mut self, offset: usize, f: impl FnOnce(&mut T) -> V) -> V {
        f(self.get_mut(offset))
    }
}

impl BlockCache {
    #[inline]
    fn offset(&self, count: usize) -> *const u8 {
        &self.data[count]
    }
}

impl Drop for BlockCache {
    fn drop(&mut self) {
        self.sync();
    }
}

impl BlockCacheManager {
    /// Upper bound on live caches
    const CAPACITY: usize = 64;

    const fn new() -> Self {
        Self { queue: Vec::new() }
    }

    fn get(
        &mut self,
        block_id: usize,
        block_device: Arc<dyn BlockDevice>,
    ) -> Arc<Mutex<BlockCache>> {
        let key = key_of(block_id, &block_device);

        if let Some(cache) = self
            .queue
            .iter()
            .find_map(|(k, cache)| (key == *k).then_some(cache))
        {
            return Arc::clone(cache);
        };

        // full: write back an idle block to make room
        if self.queue.len() == Self::CAPACITY {
            let index = self
                .queue
                .iter()
                .position(|(_, cache)| Arc::strong_count(cache) == 1)
                .expect("run out of block cache");
            self.queue.remove(index);
        }

        let block_cache = Arc::new(Mutex::new(BlockCache::new(block_id, block_device)));
        self.queue.push((key, block_cache.clone()));

        block_cache
    }
}
