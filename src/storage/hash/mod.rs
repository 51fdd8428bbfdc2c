pub mod extendible;

pub use extendible::{ExtendibleHashTable, HashTableError, StableHash};
