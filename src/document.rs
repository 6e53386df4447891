//! Document snapshot access
//!
//! The engine never touches a live text buffer. It works against immutable
//! snapshots published by the hosting editor, so a refresh cycle sees one
//! consistent view of the text even while the user keeps typing.

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Read-only view of one document state.
///
/// Lines are zero-indexed. `line_text` excludes the line delimiter.
pub trait DocumentSnapshot: Send + Sync {
    /// Number of lines in the document. A trailing newline counts as
    /// starting one (empty) final line.
    fn line_count(&self) -> usize;

    /// Byte offset of the first character of `line`, or `None` when the
    /// line index is out of range.
    fn line_offset(&self, line: usize) -> Option<usize>;

    /// Text of `line` without its delimiter, or `None` when out of range.
    fn line_text(&self, line: usize) -> Option<&str>;

    /// Byte offset one past the last character of the document.
    fn end_offset(&self) -> usize {
        let last = self.line_count().saturating_sub(1);
        let offset = self.line_offset(last).unwrap_or(0);
        offset + self.line_text(last).map_or(0, str::len)
    }

    /// Line containing `offset` (binary search over line starts).
    /// Offsets past the end map to the last line.
    fn line_of_offset(&self, offset: usize) -> usize {
        let count = self.line_count();
        if count == 0 {
            return 0;
        }
        let (mut lo, mut hi) = (0, count - 1);
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            match self.line_offset(mid) {
                Some(start) if start <= offset => lo = mid,
                _ => hi = mid - 1,
            }
        }
        lo
    }
}

/// Source of document snapshots for a refresh cycle.
///
/// Returns `None` once the hosting editor has closed the document; a cycle
/// observing `None` must abort without mutating the annotation store.
pub trait DocumentHandle: Send + Sync {
    fn snapshot(&self) -> Option<Arc<dyn DocumentSnapshot>>;
}

// === In-memory document ===

/// Immutable text snapshot with a precomputed line table.
pub struct TextSnapshot {
    text: String,
    /// Byte offset of the start of each line.
    line_starts: Vec<usize>,
}

impl TextSnapshot {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = Vec::with_capacity(16);
        line_starts.push(0);
        for pos in memchr::memchr_iter(b'\n', text.as_bytes()) {
            line_starts.push(pos + 1);
        }
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl DocumentSnapshot for TextSnapshot {
    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line_offset(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    fn line_text(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map_or(self.text.len(), |next| next - 1);
        Some(&self.text[start..end])
    }

    fn end_offset(&self) -> usize {
        self.text.len()
    }
}

/// Shared document with lock-free snapshot reads.
///
/// Writers publish a whole new `TextSnapshot`; readers grab the current one
/// without blocking. A monotonic version lets callers ignore stale updates.
pub struct TextDocument {
    snapshot: ArcSwap<TextSnapshot>,
    version: AtomicU64,
}

impl TextDocument {
    pub fn from_str(text: &str) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(TextSnapshot::new(text)),
            version: AtomicU64::new(0),
        }
    }

    /// Current snapshot (lock-free).
    pub fn read(&self) -> Arc<TextSnapshot> {
        self.snapshot.load_full()
    }

    /// Replace the whole text, bumping the version.
    pub fn replace(&self, text: &str) -> u64 {
        self.snapshot.store(Arc::new(TextSnapshot::new(text)));
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }
}

impl DocumentHandle for TextDocument {
    fn snapshot(&self) -> Option<Arc<dyn DocumentSnapshot>> {
        Some(self.read())
    }
}

impl DocumentHandle for Arc<TextDocument> {
    fn snapshot(&self) -> Option<Arc<dyn DocumentSnapshot>> {
        Some(self.read())
    }
}
