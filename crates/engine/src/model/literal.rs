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

//! Tolerant parsing of assignment values.
//!
//! Assignment values look like JSON but are not: unquoted tokens such as
//! `BLOB(5 bytes)` or `3.14` appear as object values, and nothing guarantees
//! the text is complete. Anything that does not parse as an object is kept
//! as a scalar.

/// A parsed assignment value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// A double-quoted string, without its quotes.
    Quoted(String),
    /// An unquoted token kept verbatim.
    Bare(String),
    /// An object literal, fields in source order.
    Object(Vec<(String, Literal)>),
    /// A list or set literal, kept as raw text.
    Array(String),
}

impl Literal {
    /// Parse an assignment value.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.starts_with('{') {
            let mut cursor = Cursor::new(trimmed);
            if let Some(fields) = cursor.object() {
                if cursor.at_end() {
                    return Self::Object(fields);
                }
            }
            return Self::Bare(trimmed.to_string());
        }
        if trimmed.starts_with('[') {
            return Self::Array(trimmed.to_string());
        }
        if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            let mut cursor = Cursor::new(trimmed);
            if let Some(text) = cursor.quoted() {
                if cursor.at_end() {
                    return Self::Quoted(text);
                }
            }
            return Self::Quoted(trimmed[1..trimmed.len() - 1].to_string());
        }
        Self::Bare(trimmed.to_string())
    }

    /// Whether this is the empty object `{}`.
    pub fn is_empty_object(&self) -> bool {
        matches!(self, Self::Object(fields) if fields.is_empty())
    }

    /// The token as a possible reference key: quoted or bare text.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Quoted(text) | Self::Bare(text) => Some(text),
            _ => None,
        }
    }

    /// Display text of a scalar: strings in single quotes, everything else verbatim.
    pub fn display(&self) -> String {
        match self {
            Self::Quoted(text) => format!("'{text}'"),
            Self::Bare(text) | Self::Array(text) => text.clone(),
            Self::Object(_) => String::new(),
        }
    }
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Self { chars: text.chars().collect(), pos: 0 }
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Option<()> {
        (self.bump()? == expected).then_some(())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn object(&mut self) -> Option<Vec<(String, Literal)>> {
        self.expect('{')?;
        let mut fields = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek()? == '}' {
                self.pos += 1;
                return Some(fields);
            }
            let key = if self.peek()? == '"' { self.quoted()? } else { self.bare(&[':'])? };
            self.skip_whitespace();
            self.expect(':')?;
            let value = self.value()?;
            fields.push((key, value));
            self.skip_whitespace();
            match self.bump()? {
                ',' => continue,
                '}' => return Some(fields),
                _ => return None,
            }
        }
    }

    fn value(&mut self) -> Option<Literal> {
        self.skip_whitespace();
        match self.peek()? {
            '"' => self.quoted().map(Literal::Quoted),
            '{' => self.object().map(Literal::Object),
            '[' => self.balanced().map(Literal::Array),
            _ => self.bare(&[',', '}']).map(Literal::Bare),
        }
    }

    fn quoted(&mut self) -> Option<String> {
        self.expect('"')?;
        let mut text = String::new();
        loop {
            match self.bump()? {
                '\\' => text.push(self.bump()?),
                '"' => return Some(text),
                c => text.push(c),
            }
        }
    }

    /// Read up to one of `stops` outside parentheses.
    fn bare(&mut self, stops: &[char]) -> Option<String> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                c if depth == 0 && stops.contains(&c) => break,
                _ => {}
            }
            self.pos += 1;
        }
        if self.pos >= self.chars.len() {
            return None;
        }
        Some(self.chars[start..self.pos].iter().collect::<String>().trim().to_string())
    }

    /// Read a bracketed list verbatim, honoring nesting and quoted strings.
    fn balanced(&mut self) -> Option<String> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut in_string = false;
        while let Some(c) = self.bump() {
            match c {
                '\\' if in_string => {
                    self.bump()?;
                }
                '"' => in_string = !in_string,
                '[' | '{' if !in_string => depth += 1,
                ']' | '}' if !in_string => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(self.chars[start..self.pos].iter().collect());
                    }
                }
                _ => {}
            }
        }
        None
    }
}
