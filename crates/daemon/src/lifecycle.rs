// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: path resolution, startup, shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use stow_core::{ConfigError, RecoveryStrategy, StorageConfig, StorageError, StorageEvent};
use stow_engine::{EventStream, LocalStorageManager, MaintenanceScheduler};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Name of the lock file kept in the file-store root while running
pub const LOCK_FILE: &str = ".stowd.lock";

/// Resolved daemon paths and storage configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Config file that was loaded, if any
    pub config_path: Option<PathBuf>,
    pub log_path: PathBuf,
    pub lock_path: PathBuf,
    pub storage: StorageConfig,
}

impl DaemonConfig {
    /// Resolve paths, falling back to the platform's standard directories.
    ///
    /// An explicit `config` path must exist. Without one, the default config
    /// file is used when present, otherwise stores live under the data dir.
    pub fn resolve(config: Option<&Path>, log: Option<&Path>) -> Result<Self, LifecycleError> {
        let (config_path, storage) = match config {
            Some(path) => (Some(path.to_path_buf()), StorageConfig::load(path)?),
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    let storage = StorageConfig::load(&path)?;
                    (Some(path), storage)
                }
                None => (None, StorageConfig::rooted(data_dir()?)),
            },
        };
        storage.validate()?;

        let log_path = match log {
            Some(path) => path.to_path_buf(),
            None => state_dir()?.join("stowd.log"),
        };
        let lock_path = storage.file_store.root.join(LOCK_FILE);

        Ok(Self {
            config_path,
            log_path,
            lock_path,
            storage,
        })
    }
}

/// Running daemon
pub struct Daemon {
    pub config: DaemonConfig,
    pub manager: Arc<LocalStorageManager>,
    scheduler: Option<MaintenanceScheduler>,
    event_log: JoinHandle<()>,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub start_time: Instant,
}

impl Daemon {
    /// Stop the scheduler, close both stores and release the lock
    pub async fn shutdown(mut self) -> Result<(), LifecycleError> {
        info!("shutting down daemon");

        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop().await;
        }
        let result = self.manager.shutdown().await;
        self.event_log.abort();

        if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
            warn!(path = %self.config.lock_path.display(), error = %e, "failed to remove lock file");
        }

        info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "daemon shutdown complete"
        );
        result.map_err(LifecycleError::from)
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine {0} directory")]
    NoDir(&'static str),

    #[error("failed to acquire lock at {}: daemon already running?", .0.display())]
    LockFailed(PathBuf, #[source] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &DaemonConfig) -> Result<Daemon, LifecycleError> {
    // Lock before touching any store
    std::fs::create_dir_all(&config.storage.file_store.root)?;
    let lock_file = File::create(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(|e| LifecycleError::LockFailed(config.lock_path.clone(), e))?;
    {
        use std::io::Write;
        let mut pid = &lock_file;
        writeln!(pid, "{}", std::process::id())?;
    }

    match startup_inner(config, lock_file).await {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            let _ = std::fs::remove_file(&config.lock_path);
            Err(e)
        }
    }
}

async fn startup_inner(config: &DaemonConfig, lock_file: File) -> Result<Daemon, LifecycleError> {
    let start_time = Instant::now();
    let manager = Arc::new(LocalStorageManager::local(config.storage.clone()));
    let event_log = tokio::spawn(log_events(manager.observe_events()));

    if let Err(e) = manager.initialize().await {
        event_log.abort();
        return Err(e.into());
    }

    // Surface damage left by a previous run before serving maintenance
    match manager.check_integrity().await {
        Ok(result) if !result.is_valid && config.storage.maintenance.auto_recover => {
            warn!(issues = result.issues.len(), "startup integrity check failed, recovering");
            if let Err(e) = manager.perform_recovery(&RecoveryStrategy::FullRecovery).await {
                warn!(error = %e, "startup recovery failed");
            }
        }
        Ok(result) => {
            for advice in &result.recommendations {
                warn!(issues = result.issues.len(), "{}", advice);
            }
        }
        Err(e) => warn!(error = %e, "startup integrity check failed"),
    }

    let scheduler = match MaintenanceScheduler::spawn(Arc::clone(&manager)) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            let _ = manager.shutdown().await;
            event_log.abort();
            return Err(e.into());
        }
    };

    info!(
        record_store = %config.storage.record_store.path.display(),
        file_store = %config.storage.file_store.root.display(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "daemon started"
    );

    Ok(Daemon {
        config: config.clone(),
        manager,
        scheduler: Some(scheduler),
        event_log,
        lock_file,
        start_time,
    })
}

/// Re-log every storage event until the feed closes
async fn log_events(mut events: EventStream) {
    while let Some(event) = events.recv().await {
        log_event(&event);
    }
}

pub(crate) fn log_event(event: &StorageEvent) {
    match event {
        StorageEvent::Error {
            kind,
            message,
            context,
        } => tracing::error!(event = %event.name(), %kind, context = %context, "{}", message),
        _ => tracing::info!(event = %event.name(), "storage event"),
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stow").join("stow.toml"))
}

fn data_dir() -> Result<PathBuf, LifecycleError> {
    dirs::data_local_dir()
        .map(|dir| dir.join("stow"))
        .ok_or(LifecycleError::NoDir("data"))
}

fn state_dir() -> Result<PathBuf, LifecycleError> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("stow"))
        .ok_or(LifecycleError::NoDir("state"))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
