// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::file::FakeFileStore;
use crate::record::{FakeRecordStore, RecordOp};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a future on a fresh runtime with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

#[test]
fn traced_records_initialize_logs_span_and_timing() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedRecordStore::new(FakeRecordStore::new());
        traced.initialize().await
    });

    assert!(result.is_ok());
    assert!(logs.contains("records.initialize"), "Logs:\n{}", logs);
    assert!(logs.contains("record store open"), "Logs:\n{}", logs);
    assert!(logs.contains("elapsed_ms"), "Logs:\n{}", logs);
}

#[test]
fn traced_records_logs_failures() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeRecordStore::new();
        fake.fail_on(RecordOp::Cleanup, RecordStoreError::Storage("disk full".into()));
        TracedRecordStore::new(fake).cleanup().await
    });

    assert!(result.is_err());
    assert!(logs.contains("records.cleanup"), "Logs:\n{}", logs);
    assert!(logs.contains("disk full"), "Logs:\n{}", logs);
    assert!(logs.contains("ERROR"), "Logs:\n{}", logs);
}

#[test]
fn traced_files_warns_on_rejected_path() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedFileStore::new(FakeFileStore::new());
        traced
            .write_file("../escape", b"x", WriteOptions::default())
            .await
    });

    assert!(matches!(result, Err(FileStoreError::Security(_))));
    assert!(logs.contains("write rejected"), "Logs:\n{}", logs);
    assert!(logs.contains("WARN"), "Logs:\n{}", logs);
}

#[test]
fn traced_files_create_directory_logs_completion() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedFileStore::new(FakeFileStore::new());
        traced.create_directory("media/images").await
    });

    assert!(result.is_ok());
    assert!(logs.contains("files.create_directory"), "Logs:\n{}", logs);
    assert!(logs.contains("directory ready"), "Logs:\n{}", logs);
}

#[tokio::test]
async fn traced_wrappers_forward_to_inner_store() {
    let fake = FakeFileStore::new();
    let traced = TracedFileStore::new(fake.clone());

    traced
        .write_file("temp/a", b"abc", WriteOptions::default())
        .await
        .unwrap();

    assert!(fake.has_file("temp/a"));
    assert!(traced.classified().is_some());
    fake.set_classified(false);
    assert!(traced.classified().is_none());
}
