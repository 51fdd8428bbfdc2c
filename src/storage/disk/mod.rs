pub mod disk_manager;

pub use disk_manager::DiskManager;

use thiserror::Error;

use crate::common::types::{Page, PageId};

#[derive(Error, Debug)]
pub enum PageStoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),
}

/// Backing store for pages. The buffer pool writes every evicted dirty page
/// through this interface and reads every missed page from it.
pub trait PageStore: Send + Sync {
    /// Read the page with the given ID into `page`
    fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<(), PageStoreError>;

    /// Write the page's bytes to the store
    fn write_page(&self, page: &Page) -> Result<(), PageStoreError>;

    /// Release the page's storage. Page IDs are never recycled by the
    /// buffer pool, so this may be a no-op.
    fn deallocate_page(&self, page_id: PageId) -> Result<(), PageStoreError>;
}
