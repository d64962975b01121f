// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-subscriber event feed for storage events.
//!
//! Each subscriber owns a bounded queue. Publishing never blocks: when a
//! subscriber's queue is full the new event is dropped for that subscriber
//! only. Late subscribers see nothing that was published before they joined.

use std::sync::{Arc, Mutex};
use stow_core::StorageEvent;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

/// Outcome of a single publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
    /// Subscribers found closed and pruned
    pub closed: usize,
}

#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<StorageEvent>>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::default(),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> EventStream {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        EventStream { rx }
    }

    pub fn publish(&self, event: StorageEvent) -> PublishReport {
        let mut report = PublishReport::default();
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                report.dropped += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                report.closed += 1;
                false
            }
        });
        drop(subscribers);

        if report.dropped > 0 {
            tracing::debug!(
                event = %event.name(),
                dropped = report.dropped,
                "subscriber queue full, event dropped"
            );
        }
        report
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// One subscriber's view of the feed
pub struct EventStream {
    rx: mpsc::Receiver<StorageEvent>,
}

impl EventStream {
    /// Next event; `None` once the bus is gone and the queue is drained
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        self.rx.recv().await
    }

    /// Next queued event without waiting
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Everything currently queued
    pub fn drain(&mut self) -> Vec<StorageEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
