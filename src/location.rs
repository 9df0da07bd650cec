//! Source position types.
//!
//! This module provides source position information for error reporting
//! and diagnostics. KimchiLang diagnostics are line/column based, so a
//! position is just the pair; a `Location` is a start/end span used when
//! a diagnostic wants to highlight a region rather than a point.
//!
//! # Example
//!
//! ```rust
//! use kimchi_compiler::location::{Location, Position};
//!
//! let start = Position::new(1, 5);
//! let end = Position::new(1, 12);
//! let loc = Location::new(start, end);
//!
//! assert_eq!(loc.start.line, 1);
//! assert_eq!(format!("{}", loc), "1:5-12");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in a source file.
///
/// Lines and columns are both 1-indexed, matching the `Kind at L:C: message`
/// diagnostic format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: i32,
    /// Column number (1-indexed).
    pub column: i32,
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl Position {
    /// Create a new position.
    pub fn new(line: i32, column: i32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span in source code, from a start position to an end position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    /// Start position.
    pub start: Position,
    /// End position.
    pub end: Position,
}

impl Location {
    /// Create a new location from start and end positions.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a zero-width location at a single position.
    pub fn at(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Merge two locations into a span covering both.
    pub fn merge(&self, other: &Location) -> Self {
        Self {
            start: self.start,
            end: other.end,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            if self.start.column == self.end.column {
                write!(f, "{}:{}", self.start.line, self.start.column)
            } else {
                write!(
                    f,
                    "{}:{}-{}",
                    self.start.line, self.start.column, self.end.column
                )
            }
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_display() {
        let pos = Position::new(5, 12);
        assert_eq!(format!("{}", pos), "5:12");
    }

    #[test]
    fn test_location_merge() {
        let a = Location::new(Position::new(1, 1), Position::new(1, 5));
        let b = Location::new(Position::new(2, 1), Position::new(2, 9));
        let merged = a.merge(&b);
        assert_eq!(merged.start.line, 1);
        assert_eq!(merged.end.line, 2);
    }

    #[test]
    fn test_location_display() {
        let same_line = Location::new(Position::new(3, 4), Position::new(3, 8));
        assert_eq!(format!("{}", same_line), "3:4-8");

        let multi_line = Location::new(Position::new(3, 4), Position::new(4, 2));
        assert_eq!(format!("{}", multi_line), "3:4-4:2");
    }

    #[test]
    fn test_position_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Position>();
        assert_send_sync::<Location>();
    }
}
