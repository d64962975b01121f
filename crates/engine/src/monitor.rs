// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic sampling of both stores into a metrics feed.
//!
//! One background task owns the metrics snapshot and publishes immutable
//! copies through a watch channel. Sampling failures are counted and
//! carried forward; they never stop the loop.

use crate::call::{bounded, CallTimeouts};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use stow_adapters::{FileStore, RecordStore};
use stow_core::metrics::{error_rate, mean_latency_ms};
use stow_core::{
    calculate_operations_per_second, Clock, ErrorMetrics, MonitorConfig, PerformanceMetrics,
    StorageMetrics, Subsystem,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Default)]
struct Cycle {
    /// Bumped on every start and stop; a loop only publishes for its own generation
    generation: u64,
    running: bool,
    last_sample: Option<Instant>,
    errors: ErrorMetrics,
    cycles: u64,
}

struct Running {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

struct Inner<R, F, C> {
    record_store: R,
    file_store: F,
    clock: C,
    config: MonitorConfig,
    timeouts: CallTimeouts,
    cycle: Mutex<Cycle>,
    metrics: watch::Sender<StorageMetrics>,
    running: Mutex<Option<Running>>,
}

/// Background metrics sampler over a record store and a file store
pub struct StorageMonitor<R, F, C: Clock> {
    inner: Arc<Inner<R, F, C>>,
}

impl<R, F, C: Clock> Clone for StorageMonitor<R, F, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, F, C> StorageMonitor<R, F, C>
where
    R: RecordStore,
    F: FileStore,
    C: Clock,
{
    pub fn new(record_store: R, file_store: F, clock: C, config: MonitorConfig) -> Self {
        Self::with_timeouts(
            record_store,
            file_store,
            clock,
            config,
            CallTimeouts::default(),
        )
    }

    pub fn with_timeouts(
        record_store: R,
        file_store: F,
        clock: C,
        config: MonitorConfig,
        timeouts: CallTimeouts,
    ) -> Self {
        let (metrics, _) = watch::channel(StorageMetrics::default());
        Self {
            inner: Arc::new(Inner {
                record_store,
                file_store,
                clock,
                config,
                timeouts,
                cycle: Mutex::new(Cycle::default()),
                metrics,
                running: Mutex::new(None),
            }),
        }
    }

    /// Start the sampling loop; the first sample is taken immediately
    pub fn start_monitoring(&self) {
        let mut running = self.inner.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.is_some() {
            return;
        }

        let generation = {
            let mut cycle = self.lock_cycle();
            cycle.generation += 1;
            cycle.running = true;
            if cycle.last_sample.is_none() {
                cycle.last_sample = Some(self.inner.clock.now());
            }
            cycle.generation
        };

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let monitor = self.clone();
        let period = self.inner.config.interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => monitor.run_cycle(generation).await,
                    _ = shutdown_rx.changed() => break,
                }
            }
            tracing::debug!(generation, "monitor loop exited");
        });

        *running = Some(Running { shutdown, task });
        tracing::info!(interval = ?period, "storage monitoring started");
    }

    /// Stop the loop. An in-flight sample may finish but is never published.
    pub fn stop_monitoring(&self) {
        let Some(running) = self
            .inner
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        else {
            return;
        };

        {
            let mut cycle = self.lock_cycle();
            cycle.running = false;
            cycle.generation += 1;
        }
        let _ = running.shutdown.send(true);
        drop(running.task);
        tracing::info!("storage monitoring stopped");
    }

    pub fn is_running(&self) -> bool {
        self.lock_cycle().running
    }

    /// Latest composed snapshot; zeroed until the first cycle completes
    pub fn get_metrics(&self) -> StorageMetrics {
        self.inner.metrics.borrow().clone()
    }

    /// Feed of per-cycle performance figures, replaying the latest one
    pub fn observe_performance(&self) -> PerformanceFeed {
        PerformanceFeed {
            rx: self.inner.metrics.subscribe(),
            replay: true,
        }
    }

    fn lock_cycle(&self) -> std::sync::MutexGuard<'_, Cycle> {
        self.inner.cycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sample both stores and publish, unless the loop was stopped meanwhile
    pub(crate) async fn run_cycle(&self, generation: u64) {
        let inner = &self.inner;
        let (records, files) = tokio::join!(
            bounded(
                Subsystem::RecordStore,
                "sample_metrics",
                inner.timeouts.record_store,
                inner.record_store.sample_metrics(),
            ),
            bounded(
                Subsystem::FileStore,
                "sample_metrics",
                inner.timeouts.file_store,
                inner.file_store.sample_metrics(),
            ),
        );
        let now = inner.clock.now();

        let mut cycle = self.lock_cycle();
        if !cycle.running || cycle.generation != generation {
            tracing::debug!(generation, "discarding sample from stopped monitor");
            return;
        }

        let record_store = records.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "record store sampling failed");
            cycle.errors.record(e.kind());
            Default::default()
        });
        let file_store = files.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "file store sampling failed");
            cycle.errors.record(e.kind());
            Default::default()
        });

        let interval = cycle
            .last_sample
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        cycle.last_sample = Some(now);
        cycle.cycles += 1;

        let reads = record_store.reads + file_store.reads;
        let writes = record_store.writes + file_store.writes;
        let performance = PerformanceMetrics {
            read_latency_ms: mean_latency_ms(record_store.read_time + file_store.read_time, reads),
            write_latency_ms: mean_latency_ms(
                record_store.write_time + file_store.write_time,
                writes,
            ),
            ops_per_second: calculate_operations_per_second(reads + writes, interval),
            error_rate: error_rate(cycle.errors.total(), inner.config.error_rate_baseline),
        };
        tracing::debug!(
            cycle = cycle.cycles,
            ops_per_second = performance.ops_per_second,
            error_rate = performance.error_rate,
            "storage metrics sampled"
        );

        inner.metrics.send_replace(StorageMetrics {
            record_store,
            file_store,
            errors: cycle.errors.clone(),
            performance,
            cycles: cycle.cycles,
        });
    }

    #[cfg(test)]
    pub(crate) fn current_generation(&self) -> u64 {
        self.lock_cycle().generation
    }
}

/// Subscriber to per-cycle performance metrics
pub struct PerformanceFeed {
    rx: watch::Receiver<StorageMetrics>,
    replay: bool,
}

impl PerformanceFeed {
    /// Latest figures, if any cycle has completed
    pub fn latest(&self) -> Option<PerformanceMetrics> {
        let metrics = self.rx.borrow();
        (metrics.cycles > 0).then_some(metrics.performance)
    }

    /// Wait for the next cycle; the first call returns the latest cycle's
    /// figures immediately when one exists. `None` once the monitor is gone.
    pub async fn next(&mut self) -> Option<PerformanceMetrics> {
        if std::mem::take(&mut self.replay) {
            let metrics = self.rx.borrow_and_update();
            if metrics.cycles > 0 {
                return Some(metrics.performance);
            }
        }
        loop {
            self.rx.changed().await.ok()?;
            let metrics = self.rx.borrow_and_update();
            if metrics.cycles > 0 {
                return Some(metrics.performance);
            }
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
