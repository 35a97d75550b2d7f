//! Source location tracking for tokens, syntax nodes and diagnostics.
//! Everything the parser produces carries a `Span` so tools can map back to exact source positions.

/// A byte-offset range in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Byte offset of the start (inclusive).
    pub start: usize,
    /// Byte offset of the end (exclusive).
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-length span at `offset`.
    #[must_use]
    pub const fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Create a span that covers from the start of `self` to the end of `other`.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            start: if self.start < other.start {
                self.start
            } else {
                other.start
            },
            end: if self.end > other.end {
                self.end
            } else {
                other.end
            },
        }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` lies inside the span. The end offset counts as inside
    /// so that a cursor placed right after an identifier still hits it.
    #[must_use]
    pub const fn contains(self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Whether `other` is fully covered by `self`.
    #[must_use]
    pub const fn covers(self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl From<logos::Span> for Span {
    fn from(span: logos::Span) -> Self {
        Self {
            start: span.start,
            end: span.end,
        }
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.len()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_order_independent() {
        let a = Span::new(4, 9);
        let b = Span::new(1, 6);
        assert_eq!(a.merge(b), Span::new(1, 9));
        assert_eq!(b.merge(a), Span::new(1, 9));
    }

    #[test]
    fn test_contains_includes_end() {
        let span = Span::new(3, 5);
        assert!(span.contains(3));
        assert!(span.contains(5));
        assert!(!span.contains(6));
        assert!(Span::empty(7).is_empty());
    }

    #[test]
    fn test_converts_to_source_span() {
        let source_span: miette::SourceSpan = Span::new(10, 15).into();
        assert_eq!(source_span.offset(), 10);
        assert_eq!(source_span.len(), 5);
    }
}
