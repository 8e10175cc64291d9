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

//! Interfaces the host plugs into the engine, with their default implementations.
//!
//! - [`SignatureResolver`] maps a method signature to where its code lives
//! - [`BreakpointIndex`] answers whether a line can carry a breakpoint
//! - [`ConsoleSink`] receives user-visible console output
//! - [`SnapshotFetcher`] loads heap-dump payloads by id

use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tdb_common::types::{ConsoleChannel, HeapDump, LineBreakpoint, SourceLocator};
use tracing::{debug, error, info, warn};

use crate::{
    constants::{CLASS_FILE_EXTENSION, SFDC_TRIGGER, TRIGGER_FILE_EXTENSION},
    ReplayError,
};

/// Maps a frame signature to the source it runs in.
pub trait SignatureResolver: Send + Sync {
    /// Locator of the code behind `signature`, if known.
    fn resolve(&self, signature: &str) -> Option<SourceLocator>;
}

/// Knows which lines of which sources can carry a breakpoint.
pub trait BreakpointIndex: Send + Sync {
    /// Whether `line` of `locator` is breakable.
    fn is_line_breakable(&self, locator: &SourceLocator, line: usize) -> bool;
}

/// The host's debug console.
pub trait ConsoleSink: Send + Sync {
    /// Write `message`, optionally attributed to a source line.
    fn write(
        &self,
        message: &str,
        locator: Option<&SourceLocator>,
        line: Option<usize>,
        channel: ConsoleChannel,
    );
}

/// Loads heap-dump payloads by snapshot id.
pub trait SnapshotFetcher: Send + Sync {
    /// Fetch the payload captured for snapshot `id`.
    fn fetch(&self, id: &str) -> impl Future<Output = Result<HeapDump, ReplayError>> + Send;
}

/// Resolver with no knowledge of any source.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl SignatureResolver for NoopResolver {
    fn resolve(&self, _signature: &str) -> Option<SourceLocator> {
        None
    }
}

/// Resolves signatures through a table of type references.
///
/// Type references look like `Foo`, `ns/Foo$Inner` or `__sfdc_trigger/Foo`.
/// They are normalized to the dotted form signatures use before lookup.
#[derive(Debug, Clone, Default)]
pub struct TyperefResolver {
    mapping: IndexMap<String, SourceLocator>,
}

impl TyperefResolver {
    /// Empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `typeref` as living at `locator`.
    pub fn insert(&mut self, typeref: &str, locator: SourceLocator) {
        self.mapping.insert(normalize_typeref(typeref), locator);
    }

    /// Builder-style [`TyperefResolver::insert`].
    pub fn with_typeref(mut self, typeref: &str, locator: SourceLocator) -> Self {
        self.insert(typeref, locator);
        self
    }

    /// Number of known type references.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Whether no type reference is known.
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Build a mapping from every `.cls` and `.trigger` file below `root`.
    ///
    /// `Foo.cls` becomes `Foo` and `Foo.trigger` becomes `__sfdc_trigger/Foo`.
    pub fn from_source_root(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let mut resolver = Self::new();
        let mut pending = vec![root.as_ref().to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                    continue;
                };
                let typeref = if let Some(stem) = file_name.strip_suffix(CLASS_FILE_EXTENSION) {
                    stem.to_string()
                } else if let Some(stem) = file_name.strip_suffix(TRIGGER_FILE_EXTENSION) {
                    format!("{SFDC_TRIGGER}{stem}")
                } else {
                    continue;
                };
                debug!(typeref = %typeref, path = %path.display(), "Found source");
                resolver.insert(&typeref, SourceLocator::from_path(path.to_string_lossy()));
            }
        }
        Ok(resolver)
    }
}

impl SignatureResolver for TyperefResolver {
    fn resolve(&self, signature: &str) -> Option<SourceLocator> {
        let key = if signature.ends_with(')') {
            let head = signature.split_once('(').map_or(signature, |(head, _)| head);
            head.rsplit_once('.').map_or(head, |(class, _)| class)
        } else {
            signature
        };
        self.mapping.get(key).cloned()
    }
}

/// Turn a type reference into the dotted form signatures use.
fn normalize_typeref(typeref: &str) -> String {
    if typeref.starts_with(SFDC_TRIGGER) {
        return typeref.to_string();
    }
    typeref.replacen('/', ".", 1).replacen('$', ".", 1)
}

/// Breakpoint index over an explicit list of line breakpoints.
#[derive(Debug, Clone, Default)]
pub struct LineBreakpoints {
    breakpoints: Vec<LineBreakpoint>,
}

impl LineBreakpoints {
    /// Index over `breakpoints`.
    pub fn new(breakpoints: Vec<LineBreakpoint>) -> Self {
        Self { breakpoints }
    }

    /// Breakpoints in the index.
    pub fn breakpoints(&self) -> &[LineBreakpoint] {
        &self.breakpoints
    }

    /// Whether no breakpoint is set.
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }
}

impl BreakpointIndex for LineBreakpoints {
    fn is_line_breakable(&self, locator: &SourceLocator, line: usize) -> bool {
        self.breakpoints.iter().any(|breakpoint| breakpoint.is_hit_by(locator, line))
    }
}

/// Console sink forwarding everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn write(
        &self,
        message: &str,
        locator: Option<&SourceLocator>,
        line: Option<usize>,
        channel: ConsoleChannel,
    ) {
        let source = locator.map(ToString::to_string).unwrap_or_default();
        let line = line.unwrap_or_default();
        match channel {
            ConsoleChannel::Stderr => error!(%channel, %source, line, "{message}"),
            ConsoleChannel::Console | ConsoleChannel::Stdout => {
                info!(%channel, %source, line, "{message}")
            }
        }
    }
}

/// One message captured by [`MemoryConsole`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleMessage {
    /// Message text.
    pub message: String,
    /// Source the message is attributed to.
    pub locator: Option<SourceLocator>,
    /// Line the message is attributed to.
    pub line: Option<usize>,
    /// Output channel.
    pub channel: ConsoleChannel,
}

/// Console sink keeping every message in memory.
///
/// Clones share the same buffer, so a clone can be handed to a
/// [`LogContext`](crate::LogContext) while the original reads the output.
#[derive(Debug, Clone, Default)]
pub struct MemoryConsole {
    messages: Arc<Mutex<Vec<ConsoleMessage>>>,
}

impl MemoryConsole {
    /// Empty console.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message written so far.
    pub fn messages(&self) -> Vec<ConsoleMessage> {
        self.messages.lock().clone()
    }

    /// Text of the messages written on `channel`.
    pub fn texts(&self, channel: ConsoleChannel) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|message| message.channel == channel)
            .map(|message| message.message.clone())
            .collect()
    }

    /// Drop every captured message.
    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl ConsoleSink for MemoryConsole {
    fn write(
        &self,
        message: &str,
        locator: Option<&SourceLocator>,
        line: Option<usize>,
        channel: ConsoleChannel,
    ) {
        self.messages.lock().push(ConsoleMessage {
            message: message.to_string(),
            locator: locator.cloned(),
            line,
            channel,
        });
    }
}

/// Fetches payloads stored as `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct DirectorySnapshotFetcher {
    dir: PathBuf,
}

impl DirectorySnapshotFetcher {
    /// Fetcher reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the payload for `id`.
    pub fn payload_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl SnapshotFetcher for DirectorySnapshotFetcher {
    async fn fetch(&self, id: &str) -> Result<HeapDump, ReplayError> {
        let path = self.payload_path(id);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(id, path = %path.display(), "Heap dump payload not found");
                return Err(ReplayError::SnapshotNotFound(id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        let dump = HeapDump::from_json_str(&text)?;
        debug!(id, extents = dump.extents.len(), "Fetched heap dump");
        Ok(dump)
    }
}
