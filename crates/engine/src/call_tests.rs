// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};
use stow_adapters::{FileStoreError, RecordStoreError};
use stow_core::ErrorKind;

#[tokio::test(start_paused = true)]
async fn bounded_times_out_as_classified_error() {
    let result: StorageResult<()> = bounded(
        Subsystem::RecordStore,
        "cleanup",
        Duration::from_secs(1),
        async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, RecordStoreError>(())
        },
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(
        err,
        StorageError::Timeout {
            subsystem: Subsystem::RecordStore,
            operation: "cleanup".to_string(),
            after: Duration::from_secs(1),
        }
    );
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test]
async fn bounded_converts_adapter_errors() {
    let err = bounded(
        Subsystem::FileStore,
        "write",
        Duration::from_secs(1),
        async { Err::<(), _>(FileStoreError::Security("../x".into())) },
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Security);
}

#[tokio::test(start_paused = true)]
async fn retry_succeeds_after_transient_failures() {
    let counter = AtomicU32::new(0);
    let attempts = &counter;
    let started = tokio::time::Instant::now();

    let value = with_retry(&RetryPolicy::default(), "connect", || async move {
        if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(StorageError::Connection("refused".into()))
        } else {
            Ok(7)
        }
    })
    .await
    .unwrap();

    assert_eq!(value, 7);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    // 100ms then 200ms of backoff
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(300), "{:?}", waited);
    assert!(waited < Duration::from_millis(400), "{:?}", waited);
}

#[tokio::test(start_paused = true)]
async fn retry_returns_last_error_when_exhausted() {
    let counter = AtomicU32::new(0);
    let attempts = &counter;

    let err = with_retry(
        &RetryPolicy::default().with_max_attempts(2),
        "connect",
        || async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(StorageError::Connection(format!("attempt {}", n + 1)))
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err, StorageError::Connection("attempt 2".into()));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn timeouts_follow_config() {
    let config = StorageConfig::new().with_call_timeouts(Duration::from_secs(3));
    let timeouts = CallTimeouts::from_config(&config);

    assert_eq!(timeouts, CallTimeouts::uniform(Duration::from_secs(3)));
    assert_eq!(
        timeouts.for_subsystem(Subsystem::FileStore),
        Duration::from_secs(3)
    );
}
