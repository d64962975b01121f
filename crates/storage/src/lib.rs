// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! Local store backends
//!
//! - [`JsonRecordStore`]: one checksummed JSON-lines segment per record kind
//! - [`LocalFileStore`]: a directory tree with the standard class layout

mod file_store;
mod record_store;
mod segment;

pub use file_store::LocalFileStore;
pub use record_store::JsonRecordStore;
