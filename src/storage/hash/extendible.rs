use std::mem;
use parking_lot::Mutex;
use thiserror::Error;

/// Default bucket capacity when none is configured
pub const DEFAULT_BUCKET_SIZE: usize = 4;

/// Default split-retry ceiling per insert
const DEFAULT_MAX_SPLITS: u32 = 16;

/// Keys deeper than this cannot be addressed by a 64-bit hash
const MAX_GLOBAL_DEPTH: u32 = 63;

#[derive(Error, Debug)]
pub enum HashTableError {
    #[error("bucket split limit reached while inserting")]
    CapacityExceeded,
}

/// Hash used for directory addressing. Integer keys hash to themselves, so
/// the directory index is simply the key's low `global_depth` bits.
pub trait StableHash {
    fn stable_hash(&self) -> u64;
}

macro_rules! impl_stable_hash_int {
    ($($t:ty),*) => {
        $(impl StableHash for $t {
            fn stable_hash(&self) -> u64 {
                *self as u64
            }
        })*
    };
}

impl_stable_hash_int!(i32, i64, u32, u64, usize);

#[derive(Debug)]
struct Bucket<K, V> {
    items: Vec<(K, V)>,
    depth: u32,
}

impl<K, V> Bucket<K, V> {
    fn new(depth: u32) -> Self {
        Self {
            items: Vec::new(),
            depth,
        }
    }
}

#[derive(Debug)]
struct Directory<K, V> {
    global_depth: u32,
    /// One slot per directory index; the value indexes into `buckets`.
    /// Multiple slots may reference the same bucket.
    dir: Vec<usize>,
    buckets: Vec<Bucket<K, V>>,
}

impl<K, V> Directory<K, V> {
    fn index_of(&self, hash: u64) -> usize {
        let mask = (1u64 << self.global_depth) - 1;
        (hash & mask) as usize
    }
}

/// Extendible hash table: a directory of 2^global_depth slots over a set of
/// buckets, each with its own local depth. A full bucket splits, doubling
/// the directory when its local depth has caught up with the global depth.
///
/// All operations serialize on a single internal mutex.
#[derive(Debug)]
pub struct ExtendibleHashTable<K, V> {
    bucket_size: usize,
    max_splits: u32,
    inner: Mutex<Directory<K, V>>,
}

impl<K: StableHash + Eq, V> ExtendibleHashTable<K, V> {
    /// Create a table with a single empty bucket at depth 0
    pub fn new(bucket_size: usize) -> Self {
        assert!(bucket_size >= 1, "bucket_size must be at least 1");
        Self {
            bucket_size,
            max_splits: DEFAULT_MAX_SPLITS,
            inner: Mutex::new(Directory {
                global_depth: 0,
                dir: vec![0],
                buckets: vec![Bucket::new(0)],
            }),
        }
    }

    /// Override the per-insert split ceiling
    pub fn with_max_splits(mut self, max_splits: u32) -> Self {
        self.max_splits = max_splits;
        self
    }

    pub fn global_depth(&self) -> u32 {
        self.inner.lock().global_depth
    }

    /// Local depth of the bucket referenced by the given directory index
    pub fn local_depth(&self, dir_index: usize) -> u32 {
        let inner = self.inner.lock();
        inner.buckets[inner.dir[dir_index]].depth
    }

    pub fn num_buckets(&self) -> usize {
        self.inner.lock().buckets.len()
    }

    /// Look up the value stored under `key`
    pub fn find(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let inner = self.inner.lock();
        let bucket = inner.dir[inner.index_of(key.stable_hash())];
        inner.buckets[bucket]
            .items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Insert or overwrite the value under `key`, splitting buckets as
    /// needed. Fails with `CapacityExceeded` if the key cannot be placed
    /// within the split ceiling.
    pub fn insert(&self, key: K, value: V) -> Result<(), HashTableError> {
        let mut inner = self.inner.lock();
        let hash = key.stable_hash();
        let mut remaining_splits = self.max_splits;

        loop {
            let bucket_idx = inner.dir[inner.index_of(hash)];
            let bucket = &mut inner.buckets[bucket_idx];

            if let Some(slot) = bucket.items.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = value;
                return Ok(());
            }

            if bucket.items.len() < self.bucket_size {
                bucket.items.push((key, value));
                return Ok(());
            }

            // Full bucket: split it and retry under the deeper mask.
            if remaining_splits == 0 {
                return Err(HashTableError::CapacityExceeded);
            }
            remaining_splits -= 1;
            Self::split(&mut inner, bucket_idx)?;
        }
    }

    /// Remove the entry for `key`, reporting whether it was present.
    /// Buckets are never merged and the directory never shrinks.
    pub fn remove(&self, key: &K) -> bool {
        let mut inner = self.inner.lock();
        let bucket_idx = inner.dir[inner.index_of(key.stable_hash())];
        let items = &mut inner.buckets[bucket_idx].items;
        match items.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                items.remove(pos);
                true
            }
            None => false,
        }
    }

    fn split(inner: &mut Directory<K, V>, bucket_idx: usize) -> Result<(), HashTableError> {
        if inner.buckets[bucket_idx].depth == inner.global_depth {
            if inner.global_depth >= MAX_GLOBAL_DEPTH {
                return Err(HashTableError::CapacityExceeded);
            }
            // Double the directory; the new half mirrors the old half.
            let old_half = inner.dir.clone();
            inner.dir.extend(old_half);
            inner.global_depth += 1;
        }

        let depth = inner.buckets[bucket_idx].depth + 1;
        inner.buckets[bucket_idx].depth = depth;
        let sibling_idx = inner.buckets.len();
        inner.buckets.push(Bucket::new(depth));

        // Directory slots that referenced the full bucket and have the new
        // depth bit set now reference the sibling.
        let bit = 1u64 << (depth - 1);
        for (i, slot) in inner.dir.iter_mut().enumerate() {
            if *slot == bucket_idx && (i as u64) & bit != 0 {
                *slot = sibling_idx;
            }
        }

        // Redistribute the old entries between the pair by the same bit.
        let items = mem::take(&mut inner.buckets[bucket_idx].items);
        for (k, v) in items {
            let target = if k.stable_hash() & bit != 0 {
                sibling_idx
            } else {
                bucket_idx
            };
            inner.buckets[target].items.push((k, v));
        }

        Ok(())
    }
}
