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

//! Errors raised at the fallible edges of the replay engine.
//!
//! Replay itself never fails: malformed lines degrade to no-ops. Only the
//! I/O-facing collaborators (snapshot fetching and decoding) report errors.

use thiserror::Error;

/// Errors that can occur while fetching or decoding heap-dump snapshots.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// No snapshot payload exists for the requested id
    #[error("no heap dump payload found for snapshot {0}")]
    SnapshotNotFound(String),
    /// Reading a snapshot payload failed
    #[error("failed to read heap dump payload: {0}")]
    Io(#[from] std::io::Error),
    /// A snapshot payload is not a valid heap dump
    #[error("failed to decode heap dump payload: {0}")]
    Payload(#[from] serde_json::Error),
    /// Any other fetcher failure
    #[error("failed to fetch heap dump: {0}")]
    Fetch(#[from] eyre::Report),
}
