//! Targeted redraw requests and UI-thread marshaling
//!
//! Annotation changes repaint only the affected screen region: the previous
//! line range for line-header annotations, the glyph range for inline ones.
//! Redraw requests issued off-thread are queued to the UI thread before any
//! widget state is touched.

use crate::annotation::{AnnotationEntity, AnnotationKind, AnnotationStore};
use crate::document::DocumentSnapshot;
use crate::position::Anchor;
use std::sync::mpsc;
use std::sync::Arc;
use tracing::trace;

/// One repaint request for the hosting widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawRequest {
    /// Repaint the byte range spanning whole lines (line-header case:
    /// previous line start to annotated line start).
    LineRange { start: usize, end: usize },
    /// Repaint just the glyph's character range (inline case).
    Glyph { anchor: Anchor },
    /// Repaint the whole widget; needed once per deleted annotation since
    /// its line spacing changed and a partial repaint would be wrong.
    Full,
}

/// Receives redraw requests on the UI thread.
pub trait RedrawSink: Send + Sync {
    fn request_redraw(&self, request: RedrawRequest);
}

/// Hands closures to the hosting toolkit's UI thread.
pub trait UiMarshal: Send + Sync {
    fn run_on_ui(&self, task: Box<dyn FnOnce() + Send>);
}

/// Marshal that runs tasks immediately on the calling thread. Suitable for
/// single-threaded hosts and tests.
pub struct InlineUiMarshal;

impl UiMarshal for InlineUiMarshal {
    fn run_on_ui(&self, task: Box<dyn FnOnce() + Send>) {
        task();
    }
}

/// Marshal that queues tasks for the host to drain on its UI thread.
pub struct QueuedUiMarshal {
    tx: mpsc::Sender<Box<dyn FnOnce() + Send>>,
}

/// Draining end of a [`QueuedUiMarshal`]; the host calls [`drain`] from its
/// UI thread (typically once per frame).
///
/// [`drain`]: UiTaskQueue::drain
pub struct UiTaskQueue {
    rx: mpsc::Receiver<Box<dyn FnOnce() + Send>>,
}

impl QueuedUiMarshal {
    pub fn new() -> (Self, UiTaskQueue) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, UiTaskQueue { rx })
    }
}

impl UiMarshal for QueuedUiMarshal {
    fn run_on_ui(&self, task: Box<dyn FnOnce() + Send>) {
        // Send fails only when the host dropped the queue; the redraw is
        // moot at that point.
        let _ = self.tx.send(task);
    }
}

impl UiTaskQueue {
    /// Run all queued tasks. Returns how many ran.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }
}

/// Compute the repaint region for an entity against a document snapshot.
pub fn redraw_request_for(
    entity: &AnnotationEntity,
    doc: &dyn DocumentSnapshot,
) -> RedrawRequest {
    if entity.is_deleted() {
        return RedrawRequest::Full;
    }
    let anchor = entity.anchor();
    match entity.kind() {
        AnnotationKind::Inline => RedrawRequest::Glyph { anchor },
        AnnotationKind::LineHeader => {
            let line = doc.line_of_offset(anchor.offset);
            let current = doc.line_offset(line).unwrap_or(anchor.offset);
            let start = if line == 0 {
                0
            } else {
                doc.line_offset(line - 1).unwrap_or(0)
            };
            // First line has no previous line; extend forward instead so
            // the repainted region is never empty.
            let end = if line == 0 {
                doc.line_offset(1).unwrap_or_else(|| doc.end_offset())
            } else {
                current
            };
            RedrawRequest::LineRange { start, end }
        }
    }
}

/// Issues redraw requests, marshaling onto the UI thread first.
pub struct Invalidator {
    sink: Arc<dyn RedrawSink>,
    ui: Arc<dyn UiMarshal>,
}

impl Invalidator {
    pub fn new(sink: Arc<dyn RedrawSink>, ui: Arc<dyn UiMarshal>) -> Self {
        Self { sink, ui }
    }

    /// Request a scoped repaint for one entity.
    pub fn redraw_entity(&self, entity: &AnnotationEntity, doc: &dyn DocumentSnapshot) {
        self.request(redraw_request_for(entity, doc));
    }

    /// Queue a redraw request onto the UI thread.
    pub fn request(&self, request: RedrawRequest) {
        trace!(?request, "queueing redraw");
        let sink = Arc::clone(&self.sink);
        self.ui
            .run_on_ui(Box::new(move || sink.request_redraw(request)));
    }
}

/// Line-header annotation overlapping the given line, skipping deleted
/// entities. Used by the widget's line-spacing callback to decide whether a
/// line needs extra vertical space.
pub fn annotation_at_line(
    store: &AnnotationStore,
    doc: &dyn DocumentSnapshot,
    line: usize,
) -> Option<Arc<AnnotationEntity>> {
    let start = doc.line_offset(line)?;
    let end = doc
        .line_offset(line + 1)
        .unwrap_or_else(|| doc.end_offset());
    store
        .snapshot()
        .into_iter()
        .find(|ann| {
            let offset = ann.anchor().offset;
            !ann.is_deleted()
                && ann.kind() == AnnotationKind::LineHeader
                && offset >= start
                && offset < end.max(start + 1)
        })
}
