// Export public modules
pub mod common;
pub mod storage;

// Re-export key items for convenient access
pub use storage::buffer::BufferPoolManager;
pub use storage::buffer::BufferPoolError;
pub use storage::buffer::PageGuard;
pub use storage::buffer::replacer::LRUKReplacer;
pub use storage::disk::{DiskManager, PageStore, PageStoreError};
pub use storage::hash::{ExtendibleHashTable, HashTableError, StableHash};
pub use storage::wal::LogSink;
