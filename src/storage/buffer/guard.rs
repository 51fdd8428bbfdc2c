use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::types::{Page, PageId, PagePtr};
use crate::storage::buffer::manager::BufferPoolManager;

/// Scoped pin on a buffer pool page. Dropping the guard releases the pin,
/// OR-ing in the dirty bit if `mark_dirty` was called.
pub struct PageGuard<'a> {
    pool: &'a BufferPoolManager,
    page: PagePtr,
    page_id: PageId,
    dirty: bool,
}

impl<'a> PageGuard<'a> {
    pub(crate) fn new(pool: &'a BufferPoolManager, page: PagePtr, page_id: PageId) -> Self {
        Self {
            pool,
            page,
            page_id,
            dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Record that the page was modified; applied when the pin is released
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Read access to the page's bytes
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Write access to the page's bytes; pair with `mark_dirty`
    pub fn write(&mut self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, self.dirty);
    }
}
