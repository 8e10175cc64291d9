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

//! Terminal rendering of the replay's debug console.

use tdb_common::types::{ConsoleChannel, SourceLocator};
use tdb_engine::ConsoleSink;

/// Console sink printing to the terminal: errors on stderr, everything else on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConsole;

impl ConsoleSink for TerminalConsole {
    fn write(
        &self,
        message: &str,
        locator: Option<&SourceLocator>,
        line: Option<usize>,
        channel: ConsoleChannel,
    ) {
        let text = format_message(message, locator, line);
        match channel {
            ConsoleChannel::Stderr => eprintln!("{text}"),
            ConsoleChannel::Stdout | ConsoleChannel::Console => println!("{text}"),
        }
    }
}

/// Prefix `message` with its source position when one is known.
pub fn format_message(message: &str, locator: Option<&SourceLocator>, line: Option<usize>) -> String {
    match (locator.filter(|locator| !locator.is_empty()), line) {
        (Some(locator), Some(line)) => format!("[{}:{line}] {message}", locator.name),
        (Some(locator), None) => format!("[{}] {message}", locator.name),
        _ => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        tdb_common::logging::ensure_test_logging(None);
        let locator = SourceLocator::from_path("/project/classes/Foo.cls");
        assert_eq!(format_message("hi", Some(&locator), Some(4)), "[Foo.cls:4] hi");
        assert_eq!(format_message("hi", Some(&locator), None), "[Foo.cls] hi");
        assert_eq!(format_message("hi", Some(&SourceLocator::default()), Some(4)), "hi");
        assert_eq!(format_message("hi", None, Some(4)), "hi");
    }
}
