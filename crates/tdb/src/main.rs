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

//! TDB - Trace Debugger
//!
//! Steps through a finished Apex execution by replaying its debug log.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use eyre::Result;
use tdb_common::{logging, types::LineBreakpoint};
use tdb_engine::DEFAULT_USER_DEBUG_CONTEXT_LINES;

mod cmd;
mod console;
mod session;

use session::StepKind;

/// Command-line interface for TDB
#[derive(Debug, Parser)]
#[command(name = "tdb")]
#[command(about = "Trace Debugger - Step through finished Apex executions by replaying their debug logs")]
#[command(version)]
pub struct Cli {
    /// Also write logs to a daily rolling file
    #[arg(long, env = "TDB_LOG_FILE")]
    pub log_file: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a debug log, stopping at every statement, by step or at breakpoints
    Replay(ReplayArgs),
    /// Check a debug log's log levels and list its heap dumps
    Inspect {
        /// Debug log to inspect
        log: PathBuf,

        /// Print the heap dump records as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Arguments of `tdb replay`
#[derive(Debug, Clone, Args)]
pub struct ReplayArgs {
    /// Debug log to replay
    pub log: PathBuf,

    /// Line breakpoint as <file>:<line>; may be repeated
    #[arg(long = "break", short = 'b', value_name = "FILE:LINE", value_parser = parse_breakpoint)]
    pub breakpoints: Vec<LineBreakpoint>,

    /// Directory holding heap dump payloads named <id>.json
    #[arg(long, env = "TDB_SNAPSHOT_DIR")]
    pub snapshots: Option<PathBuf>,

    /// Project directory scanned for .cls and .trigger sources
    #[arg(long, env = "TDB_SOURCE_ROOT")]
    pub source_root: Option<PathBuf>,

    /// Echo every consumed trace line
    #[arg(long)]
    pub trace_log: bool,

    /// Report the start of the log as a stop
    #[arg(long)]
    pub stop_on_entry: bool,

    /// Move by call depth instead of stopping at every statement
    #[arg(long, value_enum, value_name = "KIND")]
    pub step: Option<StepKind>,

    /// Stop replaying after this many stops
    #[arg(long)]
    pub max_stops: Option<usize>,

    /// Continuation lines echoed after a user debug line
    #[arg(long, default_value_t = DEFAULT_USER_DEBUG_CONTEXT_LINES)]
    pub debug_context_lines: usize,
}

fn parse_breakpoint(value: &str) -> Result<LineBreakpoint, String> {
    value.parse::<LineBreakpoint>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    logging::init_logging("tdb", cli.log_file)?;

    match cli.command {
        Commands::Replay(args) => {
            tracing::info!("Replaying log: {}", args.log.display());
            cmd::replay_log(args).await
        }
        Commands::Inspect { log, json } => {
            tracing::info!("Inspecting log: {}", log.display());
            cmd::inspect_log(&log, json)
        }
    }
}
