#[macro_use]
extern crate hamcrest;

use bigbuf::{RegistryConfig, StoreError, StoreRegistry};
use hamcrest::prelude::*;

fn registry() -> StoreRegistry {
    StoreRegistry::new(RegistryConfig::default()).unwrap()
}

#[test]
fn test_grow_past_initial_capacity() {
    let registry = registry();
    let writer = registry.open(0).unwrap();

    let n = registry.write(writer, b"AAAAAAAAAAAAAAAAAAAA").unwrap();
    assert_that!(n, is(equal_to(20)));
    assert!(registry.store(0).unwrap().capacity() >= 20);

    let reader = registry.open(0).unwrap();
    let data = registry.read(reader, 20).unwrap();
    assert_that!(data, is(equal_to(b"AAAAAAAAAAAAAAAAAAAA".to_vec())));

    // Nothing more has been written yet
    assert!(registry.read(reader, 1).unwrap().is_empty());
}

#[test]
fn test_many_writes_read_back_concatenated() {
    let registry = registry();
    let writer = registry.open(2).unwrap();

    let mut expected = Vec::new();
    for i in 0..50u8 {
        let chunk = vec![i; usize::from(i % 7) + 1];
        assert_eq!(registry.write(writer, &chunk), Ok(chunk.len()));
        expected.extend_from_slice(&chunk);
    }

    let reader = registry.open(2).unwrap();
    let data = registry.read(reader, expected.len() + 10).unwrap();
    assert_that!(data, is(equal_to(expected)));
}

#[test]
fn test_session_limit() {
    let config = RegistryConfig::default();
    let registry = StoreRegistry::new(config.clone()).unwrap();

    let handles: Vec<_> = (0..config.concurrency_limit)
        .map(|_| registry.open(1).unwrap())
        .collect();

    assert_eq!(
        registry.open(1),
        Err(StoreError::SessionLimitReached { store_id: 1, limit: 8 })
    );
    // Other stores are unaffected
    assert!(registry.open(0).is_ok());

    registry.close(handles[3]);
    let reopened = registry.open(1).unwrap();
    assert_eq!(reopened.slot(), 3);
    assert!(registry.open(1).is_err());
}

#[test]
fn test_invalid_store_ids() {
    let registry = registry();
    assert_eq!(
        registry.open(4),
        Err(StoreError::InvalidStoreId { store_id: 4, limit: 4 })
    );
    assert!(matches!(
        registry.open(usize::MAX),
        Err(StoreError::InvalidStoreId { .. })
    ));
    assert!(registry.open(3).is_ok());
}

#[test]
fn test_close_unknown_handle_is_noop() {
    let registry = registry();
    let handle = registry.open(0).unwrap();
    registry.close(handle);
    registry.close(handle);
    assert_eq!(registry.live_sessions(), 0);

    let other = registry.open(0).unwrap();
    registry.close(handle);
    assert_eq!(registry.live_sessions(), 1);
    assert!(registry.read(other, 1).is_ok());
}

#[test]
fn test_write_over_max_capacity_keeps_state() {
    let config = RegistryConfig::default().with_max_capacity(64);
    let registry = StoreRegistry::new(config).unwrap();
    let writer = registry.open(0).unwrap();
    registry.write(writer, b"0123456789").unwrap();

    let failure = registry.write(writer, &[b'z'; 60]).unwrap_err();
    assert_eq!(failure.written, 0);
    assert_eq!(
        failure.error,
        StoreError::ExceedsMaxCapacity { requested: 70, max: 64 }
    );

    let stats = registry.store(0).unwrap().stats();
    assert_eq!(stats.used, 10);
    assert_eq!(stats.capacity, 16);
}

#[test]
fn test_write_up_to_max_capacity() {
    let config = RegistryConfig::default().with_max_capacity(64);
    let registry = StoreRegistry::new(config).unwrap();
    let writer = registry.open(0).unwrap();

    assert_eq!(registry.write(writer, &[1; 64]), Ok(64));
    assert_eq!(registry.store(0).unwrap().capacity(), 64);

    let failure = registry.write(writer, &[2]).unwrap_err();
    assert_eq!(failure.written, 0);
    assert!(matches!(failure.error, StoreError::ExceedsMaxCapacity { .. }));
}

#[test]
fn test_explicit_shrink() {
    let registry = registry();
    let writer = registry.open(0).unwrap();
    registry.write(writer, &[9; 40]).unwrap();

    assert_eq!(
        registry.resize(0, 20),
        Err(StoreError::WouldTruncateActiveCursor { requested: 20, cursor: 40 })
    );

    registry.close(writer);
    let reader = registry.open(0).unwrap();
    registry.resize(0, 20).unwrap();
    assert_eq!(registry.read(reader, 100).unwrap(), vec![9; 20]);
}

#[test]
fn test_stats() {
    let registry = registry();
    let writer = registry.open(1).unwrap();
    registry.write(writer, b"abc").unwrap();

    let stats = registry.stats();
    assert_eq!(stats.len(), 4);
    assert_eq!(stats[1].used, 3);
    assert_eq!(stats[1].sessions, 1);
    assert_eq!(stats[0].used, 0);
    assert_eq!(stats[0].capacity, 16);
}
