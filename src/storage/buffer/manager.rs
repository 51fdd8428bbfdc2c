use std::collections::VecDeque;
use std::sync::Arc;
use parking_lot::{Mutex, RwLock};
use log::trace;

use crate::common::types::{
    Frame, FrameId, FramePtr, Lsn, Page, PageId, PagePtr, INVALID_PAGE_ID,
};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::guard::PageGuard;
use crate::storage::buffer::replacer::LRUKReplacer;
use crate::storage::disk::PageStore;
use crate::storage::hash::extendible::DEFAULT_BUCKET_SIZE;
use crate::storage::hash::ExtendibleHashTable;
use crate::storage::wal::LogSink;

/// Pool bookkeeping guarded by the BPM latch. The latch is held across every
/// composite update so that the free list, page table and replacer are only
/// ever edited together.
struct PoolState {
    free_list: VecDeque<FrameId>,
    next_page_id: PageId,
}

pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<FramePtr>,
    page_table: ExtendibleHashTable<PageId, FrameId>,
    replacer: Mutex<LRUKReplacer>,
    latch: Mutex<PoolState>,
    store: Arc<dyn PageStore>,
    log_sink: Option<Arc<dyn LogSink>>,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, store: Arc<dyn PageStore>, replacer_k: usize) -> Self {
        assert!(pool_size >= 1, "pool_size must be at least 1");

        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for frame_id in 0..pool_size {
            let page = Arc::new(RwLock::new(Page::new(INVALID_PAGE_ID)));
            frames.push(Arc::new(RwLock::new(Frame::new(frame_id, page))));
            free_list.push_back(frame_id);
        }

        Self {
            pool_size,
            frames,
            page_table: ExtendibleHashTable::new(DEFAULT_BUCKET_SIZE),
            replacer: Mutex::new(LRUKReplacer::new(pool_size, replacer_k)),
            latch: Mutex::new(PoolState {
                free_list,
                next_page_id: 0,
            }),
            store,
            log_sink: None,
        }
    }

    /// Attach a write-ahead-log sink; it is forced up to a page's LSN before
    /// that page's dirty bytes are written back
    pub fn with_log_sink(mut self, log_sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(log_sink);
        self
    }

    /// Override the page table's bucket capacity. Only meaningful before the
    /// pool is used; the (empty) page table is rebuilt.
    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.page_table = ExtendibleHashTable::new(bucket_size);
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Create a new page, pinned in a frame. Fails with `PoolExhausted` when
    /// every frame is pinned.
    pub fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        let mut state = self.latch.lock();

        let frame_id = self.acquire_frame(&mut state)?;
        let page_id = state.next_page_id;
        state.next_page_id += 1;

        if let Err(err) = self.page_table.insert(page_id, frame_id) {
            self.release_frame(&mut state, frame_id);
            return Err(err.into());
        }

        let frame = &self.frames[frame_id];
        {
            let mut frame_guard = frame.write();
            frame_guard.pin_count = 1;
            frame_guard.is_dirty = false;
            let mut page_guard = frame_guard.page.write();
            page_guard.reset();
            page_guard.page_id = page_id;
        }

        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        trace!("new page {} in frame {}", page_id, frame_id);
        Ok((frame.read().page.clone(), page_id))
    }

    /// Fetch a page, pinning it. A hit bumps the pin count; a miss loads
    /// the page from the store into a victim frame.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidPageId(page_id));
        }

        let mut state = self.latch.lock();

        if let Some(frame_id) = self.page_table.find(&page_id) {
            let frame = &self.frames[frame_id];
            frame.write().pin_count += 1;

            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);

            trace!("fetch page {}: hit in frame {}", page_id, frame_id);
            return Ok(frame.read().page.clone());
        }

        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id];

        let read_result = {
            let frame_guard = frame.read();
            let mut page_guard = frame_guard.page.write();
            page_guard.reset();
            page_guard.page_id = page_id;
            self.store.read_page(page_id, &mut page_guard)
        };
        if let Err(err) = read_result {
            self.release_frame(&mut state, frame_id);
            return Err(err.into());
        }

        if let Err(err) = self.page_table.insert(page_id, frame_id) {
            self.release_frame(&mut state, frame_id);
            return Err(err.into());
        }

        {
            let mut frame_guard = frame.write();
            frame_guard.pin_count = 1;
            frame_guard.is_dirty = false;
        }
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        trace!("fetch page {}: miss, loaded into frame {}", page_id, frame_id);
        Ok(frame.read().page.clone())
    }

    /// Release one pin on a page, OR-ing `is_dirty` into its dirty flag.
    /// Returns false if the page is not resident or not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let _state = self.latch.lock();

        let Some(frame_id) = self.page_table.find(&page_id) else {
            return false;
        };

        let frame = &self.frames[frame_id];
        let mut frame_guard = frame.write();
        if frame_guard.pin_count == 0 {
            return false;
        }

        frame_guard.pin_count -= 1;
        if is_dirty {
            frame_guard.is_dirty = true;
        }
        if frame_guard.pin_count == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }

        true
    }

    /// Write a resident page through to the store and clear its dirty flag.
    /// Does not unpin. Returns `Ok(false)` if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        let _state = self.latch.lock();

        let Some(frame_id) = self.page_table.find(&page_id) else {
            return Ok(false);
        };

        let frame = &self.frames[frame_id];
        {
            let frame_guard = frame.read();
            let page_guard = frame_guard.page.read();
            self.flush_wal(page_guard.lsn)?;
            self.store.write_page(&page_guard)?;
        }
        frame.write().is_dirty = false;

        trace!("flushed page {}", page_id);
        Ok(true)
    }

    /// Write every resident page through to the store
    pub fn flush_all(&self) -> Result<(), BufferPoolError> {
        let _state = self.latch.lock();

        for frame in &self.frames {
            {
                let frame_guard = frame.read();
                let page_guard = frame_guard.page.read();
                if page_guard.page_id == INVALID_PAGE_ID {
                    continue;
                }
                self.flush_wal(page_guard.lsn)?;
                self.store.write_page(&page_guard)?;
            }
            frame.write().is_dirty = false;
        }

        Ok(())
    }

    /// Drop a page from the pool and deallocate it in the store. Returns
    /// `Ok(true)` if the page was not resident to begin with, `Ok(false)`
    /// if it is pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool, BufferPoolError> {
        let mut state = self.latch.lock();

        let Some(frame_id) = self.page_table.find(&page_id) else {
            return Ok(true);
        };

        let frame = &self.frames[frame_id];
        if frame.read().pin_count > 0 {
            return Ok(false);
        }

        self.page_table.remove(&page_id);
        self.replacer.lock().remove(frame_id);
        {
            let mut frame_guard = frame.write();
            frame_guard.is_dirty = false;
            frame_guard.page.write().reset();
        }
        state.free_list.push_back(frame_id);
        self.store.deallocate_page(page_id)?;

        trace!("deleted page {} from frame {}", page_id, frame_id);
        Ok(true)
    }

    /// Fetch a page behind a scoped pin that unpins itself on drop
    pub fn fetch_page_guarded(&self, page_id: PageId) -> Result<PageGuard<'_>, BufferPoolError> {
        let page = self.fetch_page(page_id)?;
        Ok(PageGuard::new(self, page, page_id))
    }

    /// Create a new page behind a scoped pin that unpins itself on drop
    pub fn new_page_guarded(&self) -> Result<PageGuard<'_>, BufferPoolError> {
        let (page, page_id) = self.new_page()?;
        Ok(PageGuard::new(self, page, page_id))
    }

    /// Obtain a frame for reuse: from the free list if possible, otherwise
    /// by evicting a victim, writing its contents back first if dirty
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId, BufferPoolError> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = match self.replacer.lock().evict() {
            Some(id) => id,
            None => return Err(BufferPoolError::PoolExhausted),
        };
        let frame = &self.frames[frame_id];

        let (old_page_id, dirty) = {
            let frame_guard = frame.read();
            let page_guard = frame_guard.page.read();
            (page_guard.page_id, frame_guard.is_dirty)
        };

        if dirty {
            let write_result = {
                let frame_guard = frame.read();
                let page_guard = frame_guard.page.read();
                self.flush_wal(page_guard.lsn)
                    .and_then(|_| self.store.write_page(&page_guard).map_err(BufferPoolError::from))
            };
            if let Err(err) = write_result {
                // The victim keeps its dirty contents and stays resident;
                // hand it back to the replacer so a retry can find it.
                let mut replacer = self.replacer.lock();
                replacer.record_access(frame_id);
                replacer.set_evictable(frame_id, true);
                return Err(err);
            }
            frame.write().is_dirty = false;
        }

        if old_page_id != INVALID_PAGE_ID {
            self.page_table.remove(&old_page_id);
            trace!("evicted page {} from frame {}", old_page_id, frame_id);
        }

        Ok(frame_id)
    }

    /// Return a frame acquired by `acquire_frame` to the free list after a
    /// failed load or registration
    fn release_frame(&self, state: &mut PoolState, frame_id: FrameId) {
        let frame = &self.frames[frame_id];
        {
            let mut frame_guard = frame.write();
            frame_guard.pin_count = 0;
            frame_guard.is_dirty = false;
            frame_guard.page.write().reset();
        }
        state.free_list.push_back(frame_id);
    }

    fn flush_wal(&self, lsn: Lsn) -> Result<(), BufferPoolError> {
        if let Some(ref sink) = self.log_sink {
            sink.flush_up_to(lsn).map_err(BufferPoolError::Wal)?;
        }
        Ok(())
    }
}
