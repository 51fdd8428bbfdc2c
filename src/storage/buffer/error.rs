use thiserror::Error;

use crate::common::types::PageId;
use crate::storage::disk::PageStoreError;
use crate::storage::hash::HashTableError;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    #[error("no free frames and no evictable pages")]
    PoolExhausted,

    #[error("page table error: {0}")]
    PageTable(#[from] HashTableError),

    #[error("page store error: {0}")]
    Store(#[from] PageStoreError),

    #[error("log flush error: {0}")]
    Wal(#[source] std::io::Error),
}
