// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Stow storage engine: manager, monitor, recovery and maintenance

mod call;
mod events;
mod maintenance;
mod manager;
mod monitor;
mod recovery;
mod scheduler;

pub use call::{bounded, with_retry, CallTimeouts};
pub use events::{EventBus, EventStream, PublishReport};
pub use maintenance::MaintenanceReport;
pub use manager::{LifecycleState, LocalStorageManager, StorageManager};
pub use monitor::{PerformanceFeed, StorageMonitor};
pub use recovery::{RecoveryState, StorageRecovery};
pub use scheduler::{run_once, MaintenanceScheduler, ScheduledRun};
