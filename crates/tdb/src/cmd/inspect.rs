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

//! Inspect command

use std::path::Path;

use eyre::Result;
use tdb_engine::{LogContext, ReplayConfig};

use crate::{cmd::replay::LOG_LEVEL_WARNING, console::TerminalConsole};

/// Print whether `log` can be replayed and which heap dumps it announces.
pub fn inspect_log(log: &Path, json: bool) -> Result<()> {
    let mut ctx = LogContext::load(ReplayConfig::default().with_log_path(log))?
        .with_console(Box::new(TerminalConsole));
    ctx.scan_for_heap_dumps();

    if json {
        println!("{}", serde_json::to_string_pretty(ctx.heap_dumps())?);
        return Ok(());
    }

    println!("Log: {}", ctx.log_file_path());
    println!("Lines: {}", ctx.lines().len());
    if ctx.meets_log_level_requirements() {
        println!("Log levels: ok");
    } else {
        println!("Log levels: insufficient, {LOG_LEVEL_WARNING}");
    }
    if ctx.has_heap_dumps() {
        println!("Heap dumps:");
        for record in ctx.heap_dumps() {
            println!("  {record} (namespace {})", record.namespace);
        }
    } else {
        println!("Heap dumps: none");
    }
    Ok(())
}
