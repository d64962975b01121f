// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checksummed JSON-lines segment files
//!
//! Each sub-store lives in one `<kind>.jsonl` file. Every line holds a
//! record plus the CRC32 of its serialized form. Lines that fail the
//! checksum or do not parse are kept verbatim until repaired.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use stow_core::Record;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SegmentEntry {
    pub record: Record,
    pub checksum: u32,
}

impl SegmentEntry {
    pub fn new(record: Record) -> Result<Self, serde_json::Error> {
        let checksum = checksum_of(&record)?;
        Ok(Self { record, checksum })
    }

    pub fn verify(&self) -> bool {
        checksum_of(&self.record).is_ok_and(|sum| sum == self.checksum)
    }

    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn checksum_of(record: &Record) -> Result<u32, serde_json::Error> {
    let json = serde_json::to_string(record)?;
    Ok(crc32fast::hash(json.as_bytes()))
}

/// A line as found on disk
#[derive(Debug, Clone)]
pub(crate) enum Line {
    Valid { raw: String, record: Record },
    /// Parsed, but the checksum does not match
    Corrupt { number: usize, raw: String },
    /// Not a segment entry at all
    Malformed {
        number: usize,
        raw: String,
        reason: String,
    },
}

impl Line {
    pub fn raw(&self) -> &str {
        match self {
            Line::Valid { raw, .. } | Line::Corrupt { raw, .. } | Line::Malformed { raw, .. } => {
                raw
            }
        }
    }

    pub fn record(&self) -> Option<&Record> {
        match self {
            Line::Valid { record, .. } => Some(record),
            _ => None,
        }
    }

    fn parse(number: usize, raw: String) -> Self {
        match serde_json::from_str::<SegmentEntry>(&raw) {
            Ok(entry) if entry.verify() => Line::Valid {
                raw,
                record: entry.record,
            },
            Ok(_) => Line::Corrupt { number, raw },
            Err(e) => Line::Malformed {
                number,
                raw,
                reason: e.to_string(),
            },
        }
    }
}

/// Read every non-empty line; a missing file reads as empty
pub(crate) fn read_lines(path: &Path) -> io::Result<Vec<Line>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut lines = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        lines.push(Line::parse(index + 1, line));
    }
    Ok(lines)
}

/// Append entries and sync before returning
pub(crate) fn append(path: &Path, entries: &[SegmentEntry]) -> io::Result<u64> {
    let mut buf = String::new();
    for entry in entries {
        buf.push_str(&entry.to_line().map_err(io::Error::other)?);
        buf.push('\n');
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(buf.as_bytes())?;
    file.sync_all()?;
    Ok(buf.len() as u64)
}

/// Replace the segment's contents atomically via a temp file and rename
pub(crate) fn rewrite<'a, I>(path: &Path, lines: I) -> io::Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp)?;
        for line in lines {
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
        }
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "segment_tests.rs"]
mod tests;
