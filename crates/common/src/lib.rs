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

//! TDB Common - Shared functionality for TDB components
//!
//! This crate provides the pieces shared by the `tdb` binary and the
//! replay engine: logging setup, trace file loading and the plain data
//! types exchanged with the host (breakpoints, source locators and
//! heap-dump payloads).

/// Common types used throughout the TDB ecosystem including breakpoints, sources and heap dumps
pub mod types;

/// Logging setup and utilities for consistent logging across TDB components
pub mod logging;
/// Loading of trace logs from disk
pub mod trace;

pub use logging::*;
pub use trace::*;
