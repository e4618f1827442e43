//! Integration tests for the buffer manager.
//!
//! These tests verify cross-component behavior that unit tests don't cover.

use gridstore::storage::page::{FreeSpaceQuery, Positioning, LANE_HEADER_SIZE};
use gridstore::{BufferConfig, BufferManager, CursorState, Error, FileColdStore};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;
use tracing_subscriber::EnvFilter;

/// Route engine events to the test writer; `RUST_LOG=gridstore=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config() -> BufferConfig {
    BufferConfig::default()
        .with_hotstore_size_limit(64 * 1024)
        .with_default_page_size(4096)
        .with_max_page_size(16 * 1024)
        .with_freespace_capacity(8)
        .with_lane_capacity(4)
}

/// Three 16-byte zones on a fresh 4K page: exact accounting and contents.
#[test]
fn test_three_zone_lane_accounting() {
    let manager = BufferManager::in_memory(config()).unwrap();
    let mut cursor = manager.buf_alloc(16, 3, Positioning::FirstFit).unwrap();
    let page_id = cursor.lane().page_id;

    {
        let mut cache = manager.lock();
        let page = cache.page(page_id).unwrap();
        assert_eq!(page.header_size(), 221);
        let used = 3 * (28 + 16) + LANE_HEADER_SIZE;
        assert_eq!(page.free_space(FreeSpaceQuery::Approx), page.payload_capacity() - used);
        assert_eq!(page.free_space(FreeSpaceQuery::Exact), page.payload_capacity() - used);
    }

    cursor.open().unwrap();
    for tag in [0xAAu8, 0xBB, 0xCC] {
        assert!(cursor.next().unwrap());
        cursor.write(0, &[tag; 16]).unwrap();
    }
    assert!(!cursor.next().unwrap());
    assert_eq!(cursor.state(), CursorState::Closed);

    cursor.open().unwrap();
    let mut seen = Vec::new();
    while cursor.next().unwrap() {
        seen.push(cursor.read(|data| data.to_vec()).unwrap());
    }
    assert_eq!(seen, vec![vec![0xAA; 16], vec![0xBB; 16], vec![0xCC; 16]]);
}

/// Allocating and freeing restores the page's free space.
#[test]
fn test_alloc_free_round_trip() {
    let manager = BufferManager::in_memory(config()).unwrap();
    let first = manager.buf_alloc(8, 1, Positioning::FirstFit).unwrap();
    let page_id = first.lane().page_id;
    let before = manager
        .lock()
        .page(page_id)
        .unwrap()
        .free_space(FreeSpaceQuery::Approx);

    let cursor = manager.buf_alloc(32, 10, Positioning::SmallestFit).unwrap();
    assert_eq!(cursor.lane().page_id, page_id);
    manager.buf_free(cursor).unwrap();

    let mut cache = manager.lock();
    let page = cache.page(page_id).unwrap();
    assert_eq!(page.free_space(FreeSpaceQuery::Approx), before);
    assert_eq!(page.lanes_in_use(), 1);
}

/// Lanes survive eviction to a file cold store and promotion back.
#[test]
fn test_file_cold_store_eviction_and_promotion() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = FileColdStore::create(dir.path().join("cold.db")).unwrap();
    let manager = BufferManager::new(config(), Box::new(store)).unwrap();

    let mut cursor = manager.buf_alloc(8, 2, Positioning::FirstFit).unwrap();
    cursor.open().unwrap();
    let mut value = 7u64;
    while cursor.next().unwrap() {
        cursor.write(0, &value.to_le_bytes()).unwrap();
        value += 1;
    }

    let page_id = cursor.lane().page_id;
    manager.lock().evict(page_id).unwrap();
    assert!(!manager.lock().is_hot(page_id));
    assert_eq!(manager.lock().cold_page_ids(), vec![page_id]);

    cursor.open().unwrap();
    let mut values = Vec::new();
    while cursor.next().unwrap() {
        values.push(cursor.read(|d| u64::from_le_bytes(d.try_into().unwrap())).unwrap());
    }
    assert_eq!(values, vec![7, 8]);
    assert!(manager.lock().is_hot(page_id));
    assert_eq!(manager.stats().cold_fetches, 1);
}

/// Repeated eviction and promotion of one page keeps the file at one slot.
#[test]
fn test_file_cold_store_does_not_grow() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cold.db");
    let manager =
        BufferManager::new(config(), Box::new(FileColdStore::create(&path).unwrap())).unwrap();

    let cursor = manager.buf_alloc(8, 1, Positioning::FirstFit).unwrap();
    let page_id = cursor.lane().page_id;
    for _ in 0..100 {
        manager.lock().evict(page_id).unwrap();
        manager.lock().page(page_id).unwrap();
    }

    assert!(manager.lock().cold_page_ids().is_empty());
    let file_size = std::fs::metadata(&path).unwrap().len();
    assert!(file_size <= 4096 + 64, "cold store file grew to {file_size} bytes");
}

/// Evicted pages can be read by a new manager over the same file.
#[test]
fn test_reopen_file_cold_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cold.db");

    let lane = {
        let manager =
            BufferManager::new(config(), Box::new(FileColdStore::create(&path).unwrap())).unwrap();
        let mut cursor = manager.buf_alloc(4, 1, Positioning::FirstFit).unwrap();
        cursor.open().unwrap();
        assert!(cursor.next().unwrap());
        cursor.write(0, b"grid").unwrap();
        cursor.close();

        let lane = cursor.lane();
        drop(cursor);
        manager.lock().evict(lane.page_id).unwrap();
        lane
    };

    let manager =
        BufferManager::new(config(), Box::new(FileColdStore::open(&path).unwrap())).unwrap();
    let mut cache = manager.lock();
    let zones = cache.zones(lane).unwrap();
    assert_eq!(zones.len(), 1);
    assert_eq!(cache.zone_data(zones[0], 4).unwrap(), b"grid");
}

/// A page pinned by an open cursor cannot be evicted.
#[test]
fn test_pinned_page_refuses_eviction() {
    let manager = BufferManager::in_memory(config()).unwrap();
    let mut cursor = manager.buf_alloc(8, 1, Positioning::FirstFit).unwrap();
    let page_id = cursor.lane().page_id;

    cursor.open().unwrap();
    let err = manager.lock().evict(page_id).unwrap_err();
    assert!(matches!(err, Error::PagePinned { pin_count: 1, .. }));

    cursor.close();
    manager.lock().evict(page_id).unwrap();
}

/// Filling past the hot-store limit evicts, and evicted data reads back.
#[test]
fn test_hot_store_limit_under_pressure() {
    init_tracing();
    let manager = BufferManager::in_memory(config()).unwrap();
    let limit = config().hotstore_size_limit;

    let mut cursors = Vec::new();
    for tag in 0u8..24 {
        let mut cursor = manager.buf_alloc(3000, 1, Positioning::FirstFit).unwrap();
        cursor.open().unwrap();
        assert!(cursor.next().unwrap());
        cursor.write(0, &[tag; 3000]).unwrap();
        cursor.close();
        cursors.push(cursor);
        assert!(manager.lock().hot_bytes() <= limit);
    }
    assert!(manager.stats().evictions > 0);

    for (tag, cursor) in cursors.iter_mut().enumerate() {
        cursor.open().unwrap();
        assert!(cursor.next().unwrap());
        let ok = cursor.read(|data| data.iter().all(|&b| b == tag as u8)).unwrap();
        assert!(ok, "lane {tag} lost its contents");
        cursor.close();
    }
}

/// Cursors on different threads share one manager.
#[test]
fn test_concurrent_cursors() {
    let manager = Arc::new(BufferManager::in_memory(config()).unwrap());

    let handles: Vec<_> = (0u8..4)
        .map(|tag| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                let mut cursor = manager.buf_alloc(16, 4, Positioning::FirstFit).unwrap();
                cursor.open().unwrap();
                while cursor.next().unwrap() {
                    cursor.write(0, &[tag; 16]).unwrap();
                }
                cursor.open().unwrap();
                while cursor.next().unwrap() {
                    assert!(cursor.read(|d| d.iter().all(|&b| b == tag)).unwrap());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(manager.stats().zones_appended, 16);
}
