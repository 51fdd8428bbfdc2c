use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use parking_lot::Mutex;

use crate::common::types::{Page, PageId, PAGE_SIZE};
use crate::storage::disk::{PageStore, PageStoreError};

/// DiskManager is a file-backed PageStore: one database file, one page per
/// PAGE_SIZE-aligned slot
pub struct DiskManager {
    db_file: Mutex<File>,
}

impl DiskManager {
    /// Create a new DiskManager with the specified database file
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, PageStoreError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(db_path)?;

        Ok(Self {
            db_file: Mutex::new(file),
        })
    }

    /// Calculate the offset of a page in the file
    fn page_offset(page_id: PageId) -> u64 {
        page_id as u64 * PAGE_SIZE as u64
    }
}

impl PageStore for DiskManager {
    fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<(), PageStoreError> {
        if page_id < 0 {
            return Err(PageStoreError::InvalidPageId(page_id));
        }

        let offset = Self::page_offset(page_id);
        let mut buffer = [0u8; PAGE_SIZE];

        {
            let mut file = self.db_file.lock();

            let file_size = file.metadata()?.len();

            // A page past the end of the file has never been written;
            // it reads back as zeroes.
            if offset >= file_size {
                page.data = buffer;
                page.page_id = page_id;
                return Ok(());
            }

            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buffer)?;
        }

        page.data.copy_from_slice(&buffer);
        page.page_id = page_id;

        Ok(())
    }

    fn write_page(&self, page: &Page) -> Result<(), PageStoreError> {
        if page.page_id < 0 {
            return Err(PageStoreError::InvalidPageId(page.page_id));
        }

        let offset = Self::page_offset(page.page_id);

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&page.data)?;
        file.flush()?;

        Ok(())
    }

    fn deallocate_page(&self, _page_id: PageId) -> Result<(), PageStoreError> {
        // Page IDs are monotonic and never reused; the slot simply goes cold.
        Ok(())
    }
}
