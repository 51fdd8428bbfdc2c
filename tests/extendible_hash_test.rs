use std::sync::Arc;

use ponddb::storage::hash::ExtendibleHashTable;

#[test]
fn test_insert_find_remove_with_splits() {
    let table = ExtendibleHashTable::new(2);

    table.insert(1, "a").unwrap();
    table.insert(2, "b").unwrap();
    table.insert(3, "c").unwrap();
    table.insert(4, "d").unwrap();
    table.insert(5, "e").unwrap();
    table.insert(6, "f").unwrap();
    table.insert(7, "g").unwrap();
    table.insert(8, "h").unwrap();
    table.insert(9, "i").unwrap();

    assert_eq!(2, table.local_depth(0));
    assert_eq!(3, table.local_depth(1));
    assert_eq!(2, table.local_depth(2));
    assert_eq!(2, table.local_depth(3));

    assert_eq!(table.find(&9), Some("i"));
    assert_eq!(table.find(&8), Some("h"));
    assert_eq!(table.find(&2), Some("b"));
    assert_eq!(table.find(&10), None);

    assert!(table.remove(&8));
    assert!(table.remove(&4));
    assert!(table.remove(&1));
    assert!(!table.remove(&20));
    assert_eq!(table.find(&8), None);
}

#[test]
fn test_insert_split_raises_global_depth() {
    let table = ExtendibleHashTable::new(2);
    assert_eq!(0, table.global_depth());
    assert_eq!(1, table.num_buckets());

    for key in 1..=6 {
        table.insert(key, key).unwrap();
    }
    assert_eq!(2, table.global_depth());
}

#[test]
fn test_insert_multiple_splits_in_one_insert() {
    // 0 and 1024 agree on the low ten bits, so placing 4 next to them
    // takes several consecutive splits.
    let table = ExtendibleHashTable::new(2);
    table.insert(0, 0).unwrap();
    table.insert(1024, 1024).unwrap();
    table.insert(4, 4).unwrap();
    assert_eq!(4, table.num_buckets());

    assert_eq!(table.find(&0), Some(0));
    assert_eq!(table.find(&1024), Some(1024));
    assert_eq!(table.find(&4), Some(4));
}

#[test]
fn test_bucket_count_with_wider_buckets() {
    let table = ExtendibleHashTable::new(4);

    for key in [4, 12, 16, 64, 31, 10, 51, 15, 18, 20, 7, 23] {
        table.insert(key, "a").unwrap();
    }

    assert_eq!(6, table.num_buckets());
}

#[test]
fn test_local_depth_of_shallow_bucket_after_deep_splits() {
    let table = ExtendibleHashTable::new(4);

    for key in [4, 12, 16, 64, 5, 10, 51, 15, 18, 20, 7, 21] {
        table.insert(key, key).unwrap();
    }

    // The odd keys' bucket has split less often than the directory doubled.
    assert_eq!(2, table.local_depth(5));

    table.insert(11, 11).unwrap();
    table.insert(19, 19).unwrap();
    assert_eq!(table.find(&15), Some(15));
}

#[test]
fn test_directory_invariants_hold_after_workload() {
    let table = ExtendibleHashTable::new(2);
    for key in 0..64 {
        table.insert(key, key).unwrap();
    }

    // No bucket is ever deeper than the directory.
    let global_depth = table.global_depth();
    for dir_index in 0..(1usize << global_depth) {
        assert!(table.local_depth(dir_index) <= global_depth);
    }

    for key in 0..64 {
        assert_eq!(table.find(&key), Some(key));
    }

    // Removing half the keys leaves the other half reachable.
    for key in (0..64).step_by(2) {
        assert!(table.remove(&key));
    }
    for key in (1..64).step_by(2) {
        assert_eq!(table.find(&key), Some(key));
    }
    for key in (0..64).step_by(2) {
        assert_eq!(table.find(&key), None);
    }
}

#[test]
fn test_concurrent_inserts() {
    const NUM_RUNS: usize = 50;
    const NUM_THREADS: i32 = 3;

    // Run the concurrent workload repeatedly to shake out interleavings.
    for _ in 0..NUM_RUNS {
        let table = Arc::new(ExtendibleHashTable::new(2));
        let mut threads = Vec::new();

        for tid in 0..NUM_THREADS {
            let table = Arc::clone(&table);
            threads.push(std::thread::spawn(move || {
                table.insert(tid, tid).unwrap();
            }));
        }
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(table.global_depth(), 1);
        for key in 0..NUM_THREADS {
            assert_eq!(table.find(&key), Some(key));
        }
    }
}
