//! Exercises `KeyedMap`'s load-bearing invariants: uniqueness, the 0.75 load
//! factor, resize-preserves-lookups, sweep correctness, and concurrent put/get.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use shieldns::cache::keyed_map::{KeyedMap, PutOutcome, Record};

#[test]
fn put_is_add_then_update_for_the_same_url() {
    let map = KeyedMap::new();
    assert_eq!(
        map.put(Record::new("example.com", "1.2.3.4", 0)).unwrap(),
        PutOutcome::Added
    );
    assert_eq!(
        map.put(Record::new("example.com", "5.6.7.8", 0)).unwrap(),
        PutOutcome::Updated
    );
    assert_eq!(map.size(), 1);
    assert_eq!(map.get("example.com").unwrap().ip, "5.6.7.8");
}

#[test]
fn put_rejects_empty_url() {
    let map = KeyedMap::new();
    assert!(map.put(Record::new("", "1.2.3.4", 0)).is_err());
}

#[test]
fn remove_unlinks_and_reports_presence() {
    let map = KeyedMap::new();
    map.put(Record::new("a.test", "1.1.1.1", 0)).unwrap();
    assert!(map.remove("a.test"));
    assert!(!map.remove("a.test"));
    assert!(map.get("a.test").is_none());
    assert_eq!(map.size(), 0);
}

/// Sweep removes expired/malformed entries and leaves the rest untouched.
#[test]
fn sweep_evicts_expired_and_malformed_entries_only() {
    let map = KeyedMap::new();
    let now = shieldns::cache::keyed_map::now_unix();

    map.put(Record::new("a.test", "1.1.1.1", now - 1)).unwrap();
    map.put(Record::new("b.test", "2.2.2.2", now + 1000)).unwrap();
    map.put(Record::new("c.test", "not-an-ip", 0)).unwrap();
    map.put(Record::new("d.test", "3.3.3.3", 0)).unwrap();

    let removed = map.sweep();

    assert_eq!(removed, 2);
    assert!(map.get("a.test").is_none());
    assert!(map.get("b.test").is_some());
    assert!(map.get("c.test").is_none());
    assert!(map.get("d.test").is_some());
}

#[test]
fn wipe_clears_entries_but_keeps_capacity() {
    let map = KeyedMap::new();
    let capacity_before = map.capacity();
    map.put(Record::new("a.test", "1.1.1.1", 0)).unwrap();
    map.wipe();
    assert_eq!(map.size(), 0);
    assert_eq!(map.capacity(), capacity_before);
}

/// A map started at a small capacity doubles once insertion would push load
/// above 0.75, and every previously inserted url is still retrievable.
#[test]
fn resize_preserves_every_previously_inserted_record() {
    let map = KeyedMap::with_capacity(16);
    let n = 13; // 13/16 = 0.8125 > 0.75, forces a resize on the 13th insert
    for i in 0..n {
        map.put(Record::new(format!("host{i}.test"), "9.9.9.9", 0))
            .unwrap();
    }

    assert!(map.capacity() > 16);
    assert_eq!(map.size(), n);
    for i in 0..n {
        assert!(
            map.get(&format!("host{i}.test")).is_some(),
            "host{i}.test should survive a resize"
        );
    }
}

#[test]
fn load_factor_never_exceeds_three_quarters() {
    let map = KeyedMap::with_capacity(16);
    for i in 0..500 {
        map.put(Record::new(format!("host{i}.test"), "9.9.9.9", 0))
            .unwrap();
        assert!(map.size() as f64 / map.capacity() as f64 <= 0.75);
    }
}

/// 8 writer threads each insert 10,000 distinct urls while a reader thread
/// polls a rotating subset; the map must end up with every url, each mapped to
/// its own ip, with no crash or lost update.
#[test]
fn concurrent_put_and_get_is_sound() {
    let map = Arc::new(KeyedMap::new());
    let writers: Vec<_> = (0..8)
        .map(|t| {
            let map = map.clone();
            thread::spawn(move || {
                for i in 0..10_000 {
                    let url = format!("t{t}-host{i}.test");
                    let ip = format!("10.{}.{}.{}", t, (i / 256) % 256, i % 256);
                    map.put(Record::new(url, ip, 0)).unwrap();
                }
            })
        })
        .collect();

    let reader_map = map.clone();
    let reader = thread::spawn(move || {
        for round in 0..2_000 {
            let t = round % 8;
            let i = (round * 37) % 10_000;
            let _ = reader_map.get(&format!("t{t}-host{i}.test"));
        }
    });

    for w in writers {
        w.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(map.size(), 80_000);

    let mut seen = HashSet::new();
    for t in 0..8 {
        for i in 0..10_000 {
            let url = format!("t{t}-host{i}.test");
            let record = map.get(&url).unwrap_or_else(|| panic!("{url} missing"));
            let expected_ip = format!("10.{}.{}.{}", t, (i / 256) % 256, i % 256);
            assert_eq!(record.ip, expected_ip);
            seen.insert(url);
        }
    }
    assert_eq!(seen.len(), 80_000);
}
