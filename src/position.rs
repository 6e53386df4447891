//! Anchor resolution: mapping line indices to stable document positions

use crate::document::DocumentSnapshot;
use crate::error::MiningError;

/// Whether an anchor lands on the raw line start or after the indentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadingWhitespace {
    Skip,
    Keep,
}

/// Document position an annotation is attached to.
///
/// Length is always at least 1: annotation stores require non-empty ranges,
/// so zero-width anchors are not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Anchor {
    pub offset: usize,
    pub length: usize,
}

impl Anchor {
    pub fn new(offset: usize, length: usize) -> Self {
        Self {
            offset,
            length: length.max(1),
        }
    }

    /// Resolve an anchor for `line`, optionally skipping the leading
    /// spaces/tabs. Fails when the line index exceeds the document's line
    /// count; callers must drop the candidate rather than propagate.
    pub fn at_line(
        doc: &dyn DocumentSnapshot,
        line: usize,
        leading: LeadingWhitespace,
    ) -> Result<Self, MiningError> {
        let offset = doc
            .line_offset(line)
            .ok_or_else(|| MiningError::LineOutOfRange {
                line,
                line_count: doc.line_count(),
            })?;
        let text = doc.line_text(line).unwrap_or("");
        let skip = match leading {
            LeadingWhitespace::Skip => leading_whitespace(text),
            LeadingWhitespace::Keep => 0,
        };
        Ok(Self::new(offset + skip, 1))
    }
}

/// Byte length of the leading run of spaces and tabs.
pub fn leading_whitespace(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b' ' || *b == b'\t').count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextSnapshot;

    #[test]
    fn anchor_at_line_start() {
        let doc = TextSnapshot::new("fn main() {}\n    body();");
        let anchor = Anchor::at_line(&doc, 1, LeadingWhitespace::Keep).unwrap();
        assert_eq!(anchor, Anchor::new(13, 1));
    }

    #[test]
    fn anchor_skips_indentation() {
        let doc = TextSnapshot::new("fn main() {}\n    body();");
        let anchor = Anchor::at_line(&doc, 1, LeadingWhitespace::Skip).unwrap();
        assert_eq!(anchor.offset, 17);
    }

    #[test]
    fn tabs_count_as_leading_whitespace() {
        assert_eq!(leading_whitespace("\t\t  x"), 4);
        assert_eq!(leading_whitespace("x  "), 0);
        assert_eq!(leading_whitespace("   "), 3);
    }

    #[test]
    fn out_of_range_line_is_an_error() {
        let doc = TextSnapshot::new("one line");
        let err = Anchor::at_line(&doc, 5, LeadingWhitespace::Keep).unwrap_err();
        assert!(matches!(
            err,
            MiningError::LineOutOfRange { line: 5, line_count: 1 }
        ));
    }

    #[test]
    fn zero_length_is_clamped() {
        assert_eq!(Anchor::new(3, 0).length, 1);
    }
}
