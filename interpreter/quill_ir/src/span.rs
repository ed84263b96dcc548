//! Source location spans.
//!
//! Compact 8-byte span representation shared by the lexer, parser,
//! evaluator, and diagnostics.

use std::fmt;

/// Source location span.
///
/// Layout: 8 bytes total
/// - start: u32 - byte offset from template start
/// - end: u32 - byte offset (exclusive)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Dummy span for synthesized nodes.
    pub const DUMMY: Span = Span { start: 0, end: 0 };

    /// Create a new span.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    /// Create a zero-length span at a single offset.
    #[inline]
    pub const fn point(offset: u32) -> Self {
        Span {
            start: offset,
            end: offset,
        }
    }

    /// Create from a byte range.
    ///
    /// Saturates at `u32::MAX` for pathological inputs; templates that large
    /// are rejected by the parser long before spans matter.
    #[inline]
    pub fn from_range(range: std::ops::Range<usize>) -> Self {
        Span {
            start: u32::try_from(range.start).unwrap_or(u32::MAX),
            end: u32::try_from(range.end).unwrap_or(u32::MAX),
        }
    }

    /// Length of the span in bytes.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Check if span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merge two spans to create one covering both.
    #[inline]
    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Shift both endpoints by a byte offset.
    ///
    /// Used when an expression span is lexed from a substring and its token
    /// positions must be rebased onto the enclosing template.
    #[inline]
    #[must_use]
    pub fn offset(self, by: u32) -> Span {
        Span {
            start: self.start + by,
            end: self.end + by,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let a = Span::new(2, 5);
        let b = Span::new(4, 9);
        assert_eq!(a.merge(b), Span::new(2, 9));
        assert_eq!(b.merge(a), Span::new(2, 9));
    }

    #[test]
    fn test_offset() {
        assert_eq!(Span::new(1, 3).offset(10), Span::new(11, 13));
    }

    #[test]
    fn test_point_is_empty() {
        assert!(Span::point(7).is_empty());
        assert!(!Span::new(7, 8).is_empty());
    }
}
