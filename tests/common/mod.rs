use std::collections::HashMap;
use std::sync::Arc;
use anyhow::Result;
use parking_lot::Mutex;
use tempfile::NamedTempFile;

use ponddb::common::types::{Page, PageId, PAGE_SIZE};
use ponddb::storage::buffer::BufferPoolManager;
use ponddb::storage::disk::{DiskManager, PageStore, PageStoreError};

// Create a buffer pool manager backed by a temporary database file
#[allow(dead_code)]
pub fn create_test_buffer_pool(pool_size: usize) -> Result<(Arc<BufferPoolManager>, NamedTempFile)> {
    let file = NamedTempFile::new()?;
    let disk = Arc::new(DiskManager::new(file.path())?);
    let pool = Arc::new(BufferPoolManager::new(pool_size, disk, 2));
    Ok((pool, file))
}

/// In-memory PageStore that remembers which pages were read and written,
/// in order, so tests can observe the pool's I/O
#[allow(dead_code)]
pub struct RecordingStore {
    pages: Mutex<HashMap<PageId, Box<[u8; PAGE_SIZE]>>>,
    reads: Mutex<Vec<PageId>>,
    writes: Mutex<Vec<PageId>>,
}

#[allow(dead_code)]
impl RecordingStore {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(HashMap::new()),
            reads: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn reads(&self) -> Vec<PageId> {
        self.reads.lock().clone()
    }

    pub fn writes(&self) -> Vec<PageId> {
        self.writes.lock().clone()
    }

    /// The bytes last written for a page, if any write was observed
    pub fn stored(&self, page_id: PageId) -> Option<Box<[u8; PAGE_SIZE]>> {
        self.pages.lock().get(&page_id).cloned()
    }
}

/// Shared event trail for observing the order of WAL flushes and page writes
#[allow(dead_code)]
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// PageStore double that appends each write to a shared event log
#[allow(dead_code)]
pub struct EventStore {
    pub events: EventLog,
}

impl PageStore for EventStore {
    fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<(), PageStoreError> {
        page.data.fill(0);
        page.page_id = page_id;
        Ok(())
    }

    fn write_page(&self, page: &Page) -> Result<(), PageStoreError> {
        self.events.lock().push(format!("write page {}", page.page_id));
        Ok(())
    }

    fn deallocate_page(&self, _page_id: PageId) -> Result<(), PageStoreError> {
        Ok(())
    }
}

/// LogSink double that appends each forced flush to the same event log
#[allow(dead_code)]
pub struct EventSink {
    pub events: EventLog,
}

impl ponddb::storage::wal::LogSink for EventSink {
    fn flush_up_to(&self, lsn: u64) -> std::io::Result<()> {
        self.events.lock().push(format!("wal flush to {}", lsn));
        Ok(())
    }
}

impl PageStore for RecordingStore {
    fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<(), PageStoreError> {
        self.reads.lock().push(page_id);
        match self.pages.lock().get(&page_id) {
            Some(bytes) => page.data.copy_from_slice(&bytes[..]),
            None => page.data.fill(0),
        }
        page.page_id = page_id;
        Ok(())
    }

    fn write_page(&self, page: &Page) -> Result<(), PageStoreError> {
        self.writes.lock().push(page.page_id);
        self.pages.lock().insert(page.page_id, Box::new(page.data));
        Ok(())
    }

    fn deallocate_page(&self, _page_id: PageId) -> Result<(), PageStoreError> {
        Ok(())
    }
}
