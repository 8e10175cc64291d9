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

//! Replay command

use std::io::Write;

use eyre::{Result, WrapErr};
use tdb_engine::{
    DirectorySnapshotFetcher, LineBreakpoints, LogContext, ReplayConfig, TyperefResolver,
};
use tracing::{info, warn};

use crate::{console::TerminalConsole, session::ReplaySession, ReplayArgs};

/// Warning printed when the log was captured with too little detail to replay.
pub const LOG_LEVEL_WARNING: &str =
    "this log was not captured with APEX_CODE at FINEST and VISUALFORCE at FINER or FINEST; variables may be missing";

/// Load the log in `args`, then replay it to the end printing every stop.
pub async fn replay_log(args: ReplayArgs) -> Result<()> {
    let ctx = prepare_context(&args).await?;
    let breakpoints = LineBreakpoints::new(args.breakpoints);
    let mut session = ReplaySession::new(ctx, breakpoints);

    let mut stdout = std::io::stdout().lock();
    let stops = session.run(args.stop_on_entry, args.step, args.max_stops, |stop| {
        write!(stdout, "{stop}")
    })?;
    info!(stops, "Replay finished");
    writeln!(stdout, "Replay finished after {stops} stop(s)")?;
    Ok(())
}

/// Load the log and wire up sources and heap dump payloads.
async fn prepare_context(args: &ReplayArgs) -> Result<LogContext> {
    let config = ReplayConfig::default()
        .with_log_path(&args.log)
        .with_trace_log_file(args.trace_log)
        .with_user_debug_context_lines(args.debug_context_lines);
    let mut ctx = LogContext::load(config)?.with_console(Box::new(TerminalConsole));

    if let Some(root) = &args.source_root {
        let resolver = TyperefResolver::from_source_root(root)
            .wrap_err_with(|| format!("Failed to scan source root {}", root.display()))?;
        info!(typerefs = resolver.len(), root = %root.display(), "Loaded source mapping");
        ctx = ctx.with_resolver(Box::new(resolver));
    }

    if !ctx.meets_log_level_requirements() {
        warn!(log = %args.log.display(), "Insufficient log levels");
        eprintln!("warning: {LOG_LEVEL_WARNING}");
    }

    if ctx.scan_for_heap_dumps() {
        match &args.snapshots {
            Some(dir) => {
                if !ctx.fetch_heap_dumps(&DirectorySnapshotFetcher::new(dir)).await {
                    warn!(dir = %dir.display(), "Some heap dumps could not be fetched");
                }
            }
            None => info!(count = ctx.heap_dumps().len(), "Heap dumps found, no snapshot directory given"),
        }
    }
    Ok(ctx)
}
