//! Annotation entities and the shared annotation store
//!
//! An `AnnotationEntity` is the on-screen decoration grouping all mining
//! items at one anchor. Entities are updated in place across refresh cycles
//! so the widget never destroys and recreates a decoration whose position
//! did not change. The store is the single shared mutable resource; all
//! mutations go through its own lock because unrelated annotation producers
//! may share it.

use crate::mining::MiningItem;
use crate::position::Anchor;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// How the decoration consumes screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    /// Drawn above the line, consuming vertical line spacing.
    LineHeader,
    /// Drawn inside the line, consuming horizontal glyph space.
    Inline,
}

#[derive(Default)]
struct TextCache {
    rendered: Option<String>,
    dirty: bool,
}

/// On-screen decoration for one anchor, aggregating 1..N mining items.
pub struct AnnotationEntity {
    anchor: Anchor,
    kind: AnnotationKind,
    items: RwLock<Vec<Arc<MiningItem>>>,
    text: Mutex<TextCache>,
    /// Marked deleted: pending paints must skip it; the next paint pass
    /// that sees it requests a full redraw, then the sweep frees it.
    deleted: AtomicBool,
}

impl AnnotationEntity {
    pub fn new(anchor: Anchor, kind: AnnotationKind) -> Self {
        Self {
            anchor,
            kind,
            items: RwLock::new(Vec::new()),
            text: Mutex::new(TextCache::default()),
            deleted: AtomicBool::new(false),
        }
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    /// Replace the item list in place, disposing the superseded items.
    /// Entity identity is preserved across cycles.
    pub fn update(&self, items: Vec<Arc<MiningItem>>) {
        let mut current = self.items.write();
        for old in current.iter() {
            // An item may survive verbatim when the provider re-contributed
            // the same Arc; only dispose what is actually replaced.
            if !items.iter().any(|new| Arc::ptr_eq(new, old)) {
                old.dispose();
            }
        }
        *current = items;
    }

    /// Snapshot of the current items.
    pub fn items(&self) -> Vec<Arc<MiningItem>> {
        self.items.read().clone()
    }

    /// Join the resolved labels with `" | "`.
    ///
    /// While any item is still unresolved the previously rendered text is
    /// kept, so a refresh never flashes a half-empty decoration.
    pub fn render_text(&self) -> String {
        let items = self.items.read();
        let mut cache = self.text.lock();
        let mut out = String::new();
        for item in items.iter() {
            match item.label() {
                Some(label) => {
                    if !out.is_empty() {
                        out.push_str(" | ");
                    }
                    out.push_str(&label);
                }
                None => {
                    if let Some(prev) = &cache.rendered {
                        return prev.clone();
                    }
                    // Unresolved and nothing cached: render without it.
                }
            }
        }
        if cache.rendered.as_deref() != Some(out.as_str()) {
            cache.rendered = Some(out.clone());
            cache.dirty = true;
        }
        out
    }

    /// True when the rendered text changed since the last paint; clears
    /// the flag.
    pub fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.text.lock().dirty)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    /// Flag the entity as stale. Items are disposed immediately; the entity
    /// itself stays queryable until the paint-cycle sweep removes it.
    pub fn mark_deleted(&self) {
        if !self.deleted.swap(true, Ordering::SeqCst) {
            for item in self.items.read().iter() {
                item.dispose();
            }
        }
    }
}

impl std::fmt::Debug for AnnotationEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationEntity")
            .field("anchor", &self.anchor)
            .field("kind", &self.kind)
            .field("items", &self.items.read().len())
            .field("deleted", &self.is_deleted())
            .finish()
    }
}

// === Annotation store ===

/// Shared annotation store.
///
/// One lock guards the whole annotation list; it belongs to the store (not
/// to any single producer) so concurrent producers serialize on the same
/// object. Reconciliation scans are done against producer-held snapshots,
/// never while holding this lock.
pub struct AnnotationStore {
    annotations: Mutex<Vec<Arc<AnnotationEntity>>>,
    /// Counts committed mutations; a no-op commit must not bump it.
    mutations: AtomicU64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            annotations: Mutex::new(Vec::new()),
            mutations: AtomicU64::new(0),
        }
    }

    /// Atomically remove and add annotations under the store lock.
    pub fn replace(
        &self,
        to_remove: &[Arc<AnnotationEntity>],
        to_add: Vec<Arc<AnnotationEntity>>,
    ) {
        let mut annotations = self.annotations.lock();
        annotations.retain(|existing| !to_remove.iter().any(|r| Arc::ptr_eq(r, existing)));
        annotations.extend(to_add);
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }

    /// Live annotation at the given anchor offset, skipping deleted ones.
    pub fn find_at_offset(&self, offset: usize) -> Option<Arc<AnnotationEntity>> {
        self.annotations
            .lock()
            .iter()
            .find(|ann| !ann.is_deleted() && ann.anchor().offset == offset)
            .cloned()
    }

    /// Copy of the current annotation list.
    pub fn snapshot(&self) -> Vec<Arc<AnnotationEntity>> {
        self.annotations.lock().clone()
    }

    /// Physically remove marked-deleted entities (paint-cycle GC).
    pub fn sweep_deleted(&self) -> usize {
        let mut annotations = self.annotations.lock();
        let before = annotations.len();
        annotations.retain(|ann| !ann.is_deleted());
        before - annotations.len()
    }

    /// Number of committed mutations, for callers tracking change events.
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.annotations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.lock().is_empty()
    }
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}
