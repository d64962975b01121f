// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tempfile::TempDir;

fn write_config(dir: &TempDir, extra: &str) -> PathBuf {
    let path = dir.path().join("stow.toml");
    let content = format!(
        "[record_store]\npath = \"{}\"\n\n[file_store]\nroot = \"{}\"\n\n[monitor]\nenabled = false\n{}",
        dir.path().join("records").display(),
        dir.path().join("files").display(),
        extra
    );
    std::fs::write(&path, content).unwrap();
    path
}

fn resolve(dir: &TempDir, extra: &str) -> DaemonConfig {
    let config = write_config(dir, extra);
    DaemonConfig::resolve(Some(&config), Some(&dir.path().join("logs/stowd.log"))).unwrap()
}

#[test]
fn explicit_paths_are_used() {
    let dir = tempfile::tempdir().unwrap();

    let config = resolve(&dir, "");

    assert_eq!(config.config_path, Some(dir.path().join("stow.toml")));
    assert_eq!(config.log_path, dir.path().join("logs/stowd.log"));
    assert_eq!(config.lock_path, dir.path().join("files").join(LOCK_FILE));
    assert!(!config.storage.monitor.enabled);
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = DaemonConfig::resolve(Some(&dir.path().join("absent.toml")), None).unwrap_err();

    assert!(matches!(err, LifecycleError::Config(ConfigError::Io { .. })));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "\n[events]\ncapacity = 0\n");

    let err = DaemonConfig::resolve(Some(&path), None).unwrap_err();

    assert!(matches!(err, LifecycleError::Config(ConfigError::Invalid(_))));
}

#[tokio::test]
async fn startup_takes_the_lock_and_shutdown_releases_it() {
    let dir = tempfile::tempdir().unwrap();
    let config = resolve(&dir, "");

    let daemon = startup(&config).await.unwrap();

    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert!(dir.path().join("files/media/images").is_dir());
    assert!(dir.path().join("records").is_dir());

    daemon.shutdown().await.unwrap();
    assert!(!config.lock_path.exists());
}

#[tokio::test]
async fn second_instance_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let config = resolve(&dir, "");
    let daemon = startup(&config).await.unwrap();

    let err = startup(&config).await.err().unwrap();

    assert!(matches!(err, LifecycleError::LockFailed(..)));
    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_start_time_fails_startup_and_drops_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = resolve(&dir, "");
    config.storage.maintenance.start_time = Some("noon".to_string());

    let err = startup(&config).await.err().unwrap();

    assert!(matches!(err, LifecycleError::Storage(StorageError::Configuration(_))));
    assert!(!config.lock_path.exists());
}

#[tokio::test]
async fn scheduler_runs_first_pass_right_away() {
    let dir = tempfile::tempdir().unwrap();
    let config = resolve(&dir, "\n[maintenance]\ninterval = \"1h\"\n");
    let daemon = startup(&config).await.unwrap();

    let mut waited = Duration::ZERO;
    while daemon.manager.last_maintenance().is_none() && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }

    assert!(daemon.manager.last_maintenance().is_some());
    daemon.shutdown().await.unwrap();
}
