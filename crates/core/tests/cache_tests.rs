// ═══════════════════════════════════════════════════════════════════
// Cache Tests — TtlCache freshness, lazy eviction, overwrite, restore
// ═══════════════════════════════════════════════════════════════════

use std::collections::HashMap;

use currency_sync_core::cache::{CacheEntry, TtlCache};

const TTL: i64 = 30 * 60_000;

#[test]
fn miss_on_empty_cache() {
    let mut cache: TtlCache<f64> = TtlCache::new("rates", TTL);
    assert_eq!(cache.get("USD", 0), None);
}

#[test]
fn hit_just_before_ttl_elapses() {
    let mut cache = TtlCache::new("rates", TTL);
    cache.put("USD", 7.2, 1_000);
    assert_eq!(cache.get("USD", 1_000 + TTL - 1), Some(7.2));
    assert_eq!(cache.len(), 1);
}

#[test]
fn miss_just_after_ttl_elapses_and_entry_is_gone() {
    let mut cache = TtlCache::new("rates", TTL);
    cache.put("USD", 7.2, 1_000);

    assert_eq!(cache.get("USD", 1_000 + TTL + 1), None);
    assert!(cache.is_empty());
    assert_eq!(cache.captured_at("USD"), None);

    // Still gone even if read at a time that would have been fresh.
    assert_eq!(cache.get("USD", 1_000), None);
}

#[test]
fn expired_read_only_evicts_that_key() {
    let mut cache = TtlCache::new("series", TTL);
    cache.put("USD-CNY", vec![1.0], 0);
    cache.put("USD-EUR", vec![2.0], TTL);

    assert_eq!(cache.get("USD-CNY", TTL + 1), None);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("USD-EUR", TTL + 1), Some(vec![2.0]));
}

#[test]
fn no_eviction_without_a_read() {
    let mut cache = TtlCache::new("rates", TTL);
    cache.put("USD", 1.0, 0);
    cache.put("EUR", 2.0, 0);
    // Time passing alone never shrinks the cache.
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.captured_at("EUR"), Some(0));
}

#[test]
fn put_overwrites_value_and_capture_time() {
    let mut cache = TtlCache::new("rates", TTL);
    cache.put("USD", 1.0, 0);
    cache.put("USD", 2.0, TTL);

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.captured_at("USD"), Some(TTL));
    assert_eq!(cache.get("USD", TTL + TTL - 1), Some(2.0));
}

#[test]
fn clear_removes_everything() {
    let mut cache = TtlCache::new("rates", TTL);
    cache.put("USD", 1.0, 0);
    cache.put("EUR", 2.0, 0);
    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.get("USD", 0), None);
}

#[test]
fn remove_returns_value() {
    let mut cache = TtlCache::new("rates", TTL);
    cache.put("USD", 1.0, 0);
    assert_eq!(cache.remove("USD"), Some(1.0));
    assert_eq!(cache.remove("USD"), None);
}

#[test]
fn restored_entries_keep_capture_time() {
    let entries = HashMap::from([(
        "USD".to_string(),
        CacheEntry {
            value: 3.5,
            captured_at: 10_000,
        },
    )]);
    let mut cache = TtlCache::from_entries("rates", TTL, entries);

    assert_eq!(cache.ttl_millis(), TTL);
    assert_eq!(cache.get("USD", 10_000 + TTL), Some(3.5));
    assert_eq!(cache.get("USD", 10_000 + TTL + 1), None);
}

#[test]
fn entries_serialize_as_value_and_capture_time() {
    let mut cache = TtlCache::new("rates", TTL);
    cache.put("USD", 1.5, 42);
    let json = serde_json::to_value(cache.entries()).unwrap();
    assert_eq!(json["USD"]["value"], 1.5);
    assert_eq!(json["USD"]["captured_at"], 42);
}
