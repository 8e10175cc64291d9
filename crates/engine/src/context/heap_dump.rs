// TDB - Trace Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use futures::future::join_all;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tdb_common::types::{ConsoleChannel, HeapDump};
use tracing::{debug, info, warn};

use super::malformed_line_message;
use crate::{collaborators::SnapshotFetcher, constants::FIELD_DELIMITER, LogContext};

/// A heap-dump checkpoint announced by the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapDumpRecord {
    /// Snapshot id used to fetch the payload.
    pub id: String,
    /// Class the checkpoint was set in.
    pub class_name: String,
    /// Namespace of that class.
    pub namespace: String,
    /// Line the checkpoint was set on.
    pub line: usize,
    /// Fetched payload, if any.
    pub payload: Option<HeapDump>,
}

impl HeapDumpRecord {
    /// Build from the fields of a `HEAP_DUMP` line:
    /// `time|HEAP_DUMP|[N]|id|class|namespace|line`.
    pub fn from_fields(fields: &[&str]) -> Option<Self> {
        if fields.len() < 7 {
            return None;
        }
        Some(Self {
            id: fields[3].to_string(),
            class_name: fields[4].to_string(),
            namespace: fields[5].to_string(),
            line: fields[6].trim().parse().unwrap_or_default(),
            payload: None,
        })
    }

    /// Whether this checkpoint was set at `line` of the frame named `frame_name`.
    pub fn is_at(&self, frame_name: &str, line: usize) -> bool {
        frame_name.contains(self.class_name.as_str()) && self.line == line
    }
}

impl std::fmt::Display for HeapDumpRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.id, self.class_name, self.line)
    }
}

impl LogContext {
    /// Collect the heap-dump checkpoints of the whole trace.
    ///
    /// Markers with too few fields are reported to the console and skipped.
    /// Returns whether any checkpoint was found.
    pub fn scan_for_heap_dumps(&mut self) -> bool {
        let mut records = Vec::new();
        for (index, line) in self.lines().iter().enumerate() {
            if !line.contains("|HEAP_DUMP|") {
                continue;
            }
            let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
            match HeapDumpRecord::from_fields(&fields) {
                Some(record) => records.push(record),
                None => {
                    warn!(line = index + 1, "Malformed heap dump line");
                    self.console.write(
                        &malformed_line_message(index + 1, line),
                        None,
                        None,
                        ConsoleChannel::Stderr,
                    );
                }
            }
        }
        debug!(count = records.len(), "Scanned heap dumps");
        self.heap_dumps = records;
        !self.heap_dumps.is_empty()
    }

    /// Checkpoints found by [`LogContext::scan_for_heap_dumps`].
    pub fn heap_dumps(&self) -> &[HeapDumpRecord] {
        &self.heap_dumps
    }

    /// Whether the trace announces any checkpoint.
    pub fn has_heap_dumps(&self) -> bool {
        !self.heap_dumps.is_empty()
    }

    /// First checkpoint set at `line` of the frame named `frame_name`.
    pub fn heap_dump_for_location(&self, frame_name: &str, line: usize) -> Option<&HeapDumpRecord> {
        self.heap_dumps.iter().find(|record| record.is_at(frame_name, line))
    }

    /// Checkpoint for the current frame's position.
    ///
    /// Only found when replay has just passed that very checkpoint's marker,
    /// so a line executed again later does not reuse it.
    pub fn heap_dump_for_top_frame(&self) -> Option<&HeapDumpRecord> {
        let frame = self.top_frame()?;
        let (class_name, line) = self.last_seen_heap_dump.as_ref()?;
        if !frame.name.contains(class_name.as_str()) || frame.line != *line {
            return None;
        }
        self.heap_dump_for_location(&frame.name, frame.line)
    }

    /// Class and line of the last checkpoint marker replay passed.
    pub fn last_seen_heap_dump(&self) -> Option<(&str, usize)> {
        self.last_seen_heap_dump.as_ref().map(|(class_name, line)| (class_name.as_str(), *line))
    }

    /// Forget the last checkpoint marker passed.
    pub fn reset_last_seen_heap_dump(&mut self) {
        self.last_seen_heap_dump = None;
    }

    /// Attach `payload` to checkpoint `id`; returns whether the checkpoint exists.
    pub fn set_heap_dump_payload(&mut self, id: &str, payload: HeapDump) -> bool {
        match self.heap_dumps.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.payload = Some(payload);
                true
            }
            None => false,
        }
    }

    /// Fetch the payload of every checkpoint with `fetcher`.
    ///
    /// Payloads are fetched concurrently. On the first failure the error is
    /// written to the console and `false` is returned; payloads fetched
    /// successfully are kept either way.
    pub async fn fetch_heap_dumps<F: SnapshotFetcher>(&mut self, fetcher: &F) -> bool {
        if self.heap_dumps.is_empty() {
            return true;
        }
        let listing = self.heap_dumps.iter().join(", ");
        self.console.write(
            &format!("Fetching heap dumps: {listing}"),
            None,
            None,
            ConsoleChannel::Console,
        );

        let ids: Vec<String> = self.heap_dumps.iter().map(|record| record.id.clone()).collect();
        let results = join_all(ids.iter().map(|id| fetcher.fetch(id))).await;

        let mut success = true;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(payload) => {
                    info!(id = %id, "Fetched heap dump");
                    self.set_heap_dump_payload(id, payload);
                }
                Err(err) => {
                    warn!(id = %id, error = %err, "Failed to fetch heap dump");
                    if success {
                        self.console.write(&err.to_string(), None, None, ConsoleChannel::Stderr);
                    }
                    success = false;
                }
            }
        }
        success
    }
}
