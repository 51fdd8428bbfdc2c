use std::io;

use crate::common::types::Lsn;

/// Write-ahead-log collaborator. When one is configured, the buffer pool
/// forces the log up to a page's LSN before that page's dirty bytes reach
/// the page store (log-before-data ordering). Without one, the pool makes
/// no crash-consistency claim.
pub trait LogSink: Send + Sync {
    fn flush_up_to(&self, lsn: Lsn) -> io::Result<()>;
}
