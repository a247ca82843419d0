//! Integration Tests for the Cache API
//!
//! Exercises the public operations end to end on a real tokio runtime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mini_cache::{Cache, CacheError, JanitorState, PurgeExpiredPolicy};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Cache whose janitor stays out of the way unless a test waits for it.
fn create_test_cache() -> Cache {
    init_tracing();
    Cache::builder()
        .sweep_interval(Duration::from_secs(3600))
        .build()
        .unwrap()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Field {
    field: String,
}

// == Set / Get ==

#[tokio::test]
async fn test_set_and_get_various_types() {
    let cache = create_test_cache();
    let ttl = Some(Duration::from_secs(3));

    cache.set("int", &1, ttl).await.unwrap();
    cache.set("string", "abc", ttl).await.unwrap();
    cache.set("slice", &[1, 2, 3], ttl).await.unwrap();
    cache
        .set("struct", &Field { field: "cba".to_string() }, ttl)
        .await
        .unwrap();
    cache
        .set("map", &HashMap::from([(1, "hello".to_string())]), ttl)
        .await
        .unwrap();

    assert_eq!(cache.get::<i32>("int").await.unwrap(), Some(1));
    assert_eq!(cache.get::<String>("string").await.unwrap(), Some("abc".to_string()));
    assert_eq!(cache.get::<Vec<i32>>("slice").await.unwrap(), Some(vec![1, 2, 3]));
    assert_eq!(
        cache.get::<Field>("struct").await.unwrap(),
        Some(Field { field: "cba".to_string() })
    );
    assert_eq!(
        cache.get::<HashMap<i32, String>>("map").await.unwrap(),
        Some(HashMap::from([(1, "hello".to_string())]))
    );
    assert_eq!(cache.keys().await, 5);
}

#[tokio::test]
async fn test_get_missing_key() {
    let cache = create_test_cache();

    assert_eq!(cache.get::<String>("nope").await.unwrap(), None);
    assert_eq!(cache.stats().await.misses, 1);
}

// == TTL ==

#[tokio::test]
async fn test_ttl_expiry_on_read() {
    let cache = create_test_cache();

    cache.set("short", "v", Some(Duration::from_millis(100))).await.unwrap();
    assert_eq!(cache.get::<String>("short").await.unwrap(), Some("v".to_string()));

    sleep(Duration::from_millis(150)).await;

    // still counted until something removes it
    assert!(cache.exists("short").await);
    assert_eq!(cache.get::<String>("short").await.unwrap(), None);
    assert!(!cache.exists("short").await);
    assert_eq!(cache.keys().await, 0);
    assert_eq!(cache.used_bytes().await, 0);
}

#[tokio::test]
async fn test_ttl_expiry_by_janitor() {
    init_tracing();
    let cache = Cache::builder()
        .sweep_interval(Duration::from_millis(50))
        .build()
        .unwrap();

    cache.set("short", &1, Some(Duration::from_millis(50))).await.unwrap();
    cache.set("forever", &2, None).await.unwrap();
    assert_eq!(cache.keys().await, 2);

    sleep(Duration::from_millis(300)).await;

    // removed without any read touching it
    assert!(!cache.exists("short").await);
    assert_eq!(cache.keys().await, 1);
    assert_eq!(cache.used_bytes().await, ("forever".len() + 1) as u64);
    assert_eq!(cache.stats().await.expirations, 1);

    cache.close().await;
}

#[tokio::test]
async fn test_never_expire() {
    init_tracing();
    let cache = Cache::builder()
        .sweep_interval(Duration::from_millis(20))
        .build()
        .unwrap();

    cache.set("forever", "stay", None).await.unwrap();
    sleep(Duration::from_millis(150)).await;

    assert_eq!(cache.get::<String>("forever").await.unwrap(), Some("stay".to_string()));
    cache.close().await;
}

#[tokio::test]
async fn test_overwrite_uses_latest_value_and_ttl() {
    let cache = create_test_cache();

    cache.set("k", "v1", None).await.unwrap();
    cache.set("k", "v2", Some(Duration::from_millis(100))).await.unwrap();
    assert_eq!(cache.get::<String>("k").await.unwrap(), Some("v2".to_string()));
    assert_eq!(cache.keys().await, 1);

    sleep(Duration::from_millis(150)).await;
    assert_eq!(cache.get::<String>("k").await.unwrap(), None);

    cache.set("j", "v1", Some(Duration::from_millis(50))).await.unwrap();
    cache.set("j", "v2", None).await.unwrap();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(cache.get::<String>("j").await.unwrap(), Some("v2".to_string()));
}

#[tokio::test]
async fn test_overwrite_keeps_accounting_exact() {
    let cache = create_test_cache();

    cache.set("key", "a", None).await.unwrap(); // "a" is 3 bytes of JSON
    assert_eq!(cache.used_bytes().await, 6);

    cache.set("key", "abcdef", None).await.unwrap();
    assert_eq!(cache.used_bytes().await, 3 + 8);

    cache.set("key", &7, None).await.unwrap();
    assert_eq!(cache.used_bytes().await, 3 + 1);

    cache.set("other", &true, None).await.unwrap();
    cache.set("key", "a", None).await.unwrap();
    assert_eq!(cache.used_bytes().await, (3 + 3) + (5 + 4));
}

// == Delete / Exists ==

#[tokio::test]
async fn test_delete() {
    let cache = create_test_cache();

    cache.set("key", "value", None).await.unwrap();
    assert!(cache.exists("key").await);

    assert!(cache.del("key").await);
    assert!(!cache.exists("key").await);
    assert_eq!(cache.get::<String>("key").await.unwrap(), None);
    assert_eq!(cache.used_bytes().await, 0);

    assert!(!cache.del("key").await);
}

// == Flush ==

#[tokio::test]
async fn test_flush() {
    let cache = create_test_cache();

    for i in 0..10 {
        cache.set(&format!("m{}", i), "a", None).await.unwrap();
    }
    assert_eq!(cache.keys().await, 10);

    assert!(cache.flush().await);

    assert_eq!(cache.keys().await, 0);
    assert!(cache.is_empty().await);
    assert_eq!(cache.used_bytes().await, 0);
    for i in 0..10 {
        assert!(!cache.exists(&format!("m{}", i)).await);
    }
}

// == Capacity ==

#[tokio::test]
async fn test_capacity_ceiling_1kb() {
    let cache = create_test_cache();
    assert!(cache.set_max_memory("1KB").await);
    assert_eq!(cache.max_bytes().await, 1024);

    // 4-byte key + 3-byte payload = 7 bytes each, 146 * 7 = 1022
    for i in 0..146 {
        cache.set(&format!("k{:03}", i), "a", None).await.unwrap();
    }
    assert_eq!(cache.used_bytes().await, 1022);

    let result = cache.set("k146", "a", None).await;
    assert!(matches!(
        result,
        Err(CacheError::CapacityExceeded { needed: 1029, limit: 1024, .. })
    ));
    assert!(!cache.exists("k146").await);
    assert_eq!(cache.keys().await, 146);

    // growing an existing entry past the limit keeps its old value
    assert!(cache.set("k000", "abcd", None).await.is_err());
    assert_eq!(cache.get::<String>("k000").await.unwrap(), Some("a".to_string()));

    // 2 bytes of headroom are enough for a payload 2 bytes larger
    cache.set("k000", &"a b", None).await.unwrap();
    assert_eq!(cache.used_bytes().await, 1024);

    assert_eq!(cache.stats().await.rejected_writes, 2);
}

#[tokio::test]
async fn test_invalid_max_memory_keeps_budget() {
    let cache = create_test_cache();
    assert!(cache.set_max_memory("2KB").await);

    assert!(!cache.set_max_memory("-1MB").await);
    assert!(!cache.set_max_memory("MB").await);
    assert!(!cache.set_max_memory("ten megabytes").await);

    assert_eq!(cache.max_bytes().await, 2048);
}

#[tokio::test]
async fn test_zero_budget_is_unbounded() {
    let cache = create_test_cache();
    assert!(cache.set_max_memory("0MB").await);

    let big = "x".repeat(10_000);
    cache.set("big", &big, None).await.unwrap();
    assert!(cache.exists("big").await);
}

#[tokio::test]
async fn test_purge_expired_policy_admits_write() {
    init_tracing();
    let cache = Cache::builder()
        .max_memory("1KB")
        .sweep_interval(Duration::from_secs(3600))
        .overflow_policy(PurgeExpiredPolicy)
        .build()
        .unwrap();

    // 6 + 1012 bytes, leaving no room for "late"
    let filler = "x".repeat(1010);
    cache
        .set("filler", &filler, Some(Duration::from_millis(50)))
        .await
        .unwrap();
    assert!(cache.set("late", "value", None).await.is_err());

    sleep(Duration::from_millis(100)).await;

    cache.set("late", "value", None).await.unwrap();
    assert!(!cache.exists("filler").await);
    assert_eq!(cache.get::<String>("late").await.unwrap(), Some("value".to_string()));
}

// == Errors ==

#[tokio::test]
async fn test_unencodable_value_is_dropped() {
    let cache = create_test_cache();
    let value: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);

    let result = cache.set("bad", &value, None).await;

    assert!(matches!(result, Err(CacheError::Encode(_))));
    assert!(!cache.exists("bad").await);
    assert_eq!(cache.keys().await, 0);
}

#[tokio::test]
async fn test_decode_failure_keeps_entry() {
    let cache = create_test_cache();
    cache.set("name", "alice", None).await.unwrap();

    let result = cache.get::<u32>("name").await;

    assert!(matches!(result, Err(CacheError::Decode { stored: "str", .. })));
    assert!(cache.exists("name").await);
    // a read that fails to decode is not a hit
    assert_eq!(cache.stats().await.hits, 0);
    assert_eq!(cache.get::<String>("name").await.unwrap(), Some("alice".to_string()));
    let stats = cache.stats().await;
    assert_eq!(stats.decode_errors, 1);
    assert_eq!(stats.hits, 1);
}

// == Concurrency ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers() {
    let cache = Arc::new(create_test_cache());
    assert!(cache.set_max_memory("1MB").await);

    let mut handles = Vec::new();
    for i in 0..160 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            cache.set(&format!("a{}", i), "b", None).await
        }));
    }
    for handle in handles {
        handle.await.expect("task should not panic").unwrap();
    }

    assert_eq!(cache.keys().await, 160);
    for i in 0..160 {
        assert_eq!(
            cache.get::<String>(&format!("a{}", i)).await.unwrap(),
            Some("b".to_string())
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mixed_operations() {
    let cache = Arc::new(create_test_cache());

    let mut handles = Vec::new();
    for i in 0..64 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            let key = format!("k{}", i % 8);
            match i % 4 {
                0 => {
                    let _ = cache.set(&key, &i, None).await;
                }
                1 => {
                    let _ = cache.get::<i32>(&key).await;
                }
                2 => {
                    cache.del(&key).await;
                }
                _ => {
                    cache.flush().await;
                }
            }
        }));
    }
    for handle in handles {
        handle.await.expect("task should not panic");
    }

    // whatever survived must be consistently accounted
    let stats = cache.stats().await;
    assert!(stats.total_entries <= 8);
    assert_eq!(stats.total_entries, cache.keys().await);
}

// == Lifecycle ==

#[tokio::test]
async fn test_close_stops_janitor() {
    let cache = create_test_cache();
    assert_eq!(cache.janitor_state(), JanitorState::Running);

    cache.set("key", "value", None).await.unwrap();
    cache.close().await;
    cache.close().await;

    assert_eq!(cache.janitor_state(), JanitorState::Stopped);
    // data is still served after close
    assert_eq!(cache.get::<String>("key").await.unwrap(), Some("value".to_string()));
}
