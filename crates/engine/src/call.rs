// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded and retried backend calls

use std::future::Future;
use std::time::Duration;
use stow_core::{RetryPolicy, StorageConfig, StorageError, StorageResult, Subsystem};

/// Per-store call timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeouts {
    pub record_store: Duration,
    pub file_store: Duration,
}

impl CallTimeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            record_store: timeout,
            file_store: timeout,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            record_store: config.record_store.call_timeout,
            file_store: config.file_store.call_timeout,
        }
    }

    pub fn for_subsystem(&self, subsystem: Subsystem) -> Duration {
        match subsystem {
            Subsystem::RecordStore => self.record_store,
            Subsystem::FileStore | Subsystem::Manager => self.file_store,
        }
    }
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(10))
    }
}

/// Run a backend call under a timeout, classifying its error
pub async fn bounded<T, E, Fut>(
    subsystem: Subsystem,
    operation: &str,
    timeout: Duration,
    call: Fut,
) -> StorageResult<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: Into<StorageError>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            tracing::warn!(%subsystem, operation, ?timeout, "backend call timed out");
            Err(StorageError::Timeout {
                subsystem,
                operation: operation.to_string(),
                after: timeout,
            })
        }
    }
}

/// Retry `attempt` with exponential backoff until it succeeds or the
/// policy's attempts are exhausted; the last error is returned
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut attempt: F,
) -> StorageResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StorageResult<T>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if tries < policy.max_attempts => {
                let delay = policy.delay_for(tries);
                tracing::warn!(
                    operation,
                    attempt = tries,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                tries += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[path = "call_tests.rs"]
mod tests;
