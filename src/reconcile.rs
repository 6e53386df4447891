//! Reconciliation engine: diffing grouped results against live annotations
//!
//! Every entity from the previous cycle is presumed stale until the new
//! grouped set proves otherwise. Entities whose anchor reappears survive
//! with their item list replaced in place; anchors that vanished are marked
//! deleted; brand-new anchors get fresh entities. The commit publishes the
//! minimal delta to the store, and skips the store entirely when the delta
//! is empty so anchor drift from plain text edits never triggers repaints.

use crate::annotation::{AnnotationEntity, AnnotationKind, AnnotationStore};
use crate::group::AnchorGroup;
use std::sync::Arc;
use tracing::debug;

/// Partition of the previous and new annotation sets.
#[derive(Debug, Default)]
pub struct ReconcileDelta {
    pub to_add: Vec<Arc<AnnotationEntity>>,
    pub to_keep: Vec<Arc<AnnotationEntity>>,
    pub to_remove: Vec<Arc<AnnotationEntity>>,
}

impl ReconcileDelta {
    /// True when the commit would not change the store.
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff the new grouped set against the previous cycle's entities.
///
/// The lookup is a deliberate linear scan over `previous`: annotation
/// counts per viewport are small and the scan runs against a locally-held
/// snapshot, never under the store lock.
pub fn reconcile(
    groups: &[AnchorGroup],
    previous: &[Arc<AnnotationEntity>],
    kind: AnnotationKind,
) -> ReconcileDelta {
    let mut delta = ReconcileDelta {
        to_remove: previous.to_vec(),
        ..Default::default()
    };

    for group in groups {
        let existing = delta
            .to_remove
            .iter()
            .position(|ann| ann.anchor().offset == group.anchor.offset);
        match existing {
            Some(idx) => {
                let ann = delta.to_remove.swap_remove(idx);
                ann.update(group.items.clone());
                delta.to_keep.push(ann);
            }
            None => {
                let ann = Arc::new(AnnotationEntity::new(group.anchor, kind));
                ann.update(group.items.clone());
                delta.to_add.push(ann);
            }
        }
    }
    delta
}

/// Publish the delta to the store. Returns false for a no-op commit, in
/// which case the store is left untouched and no change event is emitted.
pub fn commit(delta: &ReconcileDelta, store: &AnnotationStore) -> bool {
    if delta.is_noop() {
        // The document may have shifted anchors (newline typed above); the
        // store's own position tracking handles that, so re-adding the
        // equivalent annotations here would only fight it.
        return false;
    }
    for ann in &delta.to_remove {
        ann.mark_deleted();
    }
    store.replace(&delta.to_remove, delta.to_add.clone());
    debug!(
        added = delta.to_add.len(),
        kept = delta.to_keep.len(),
        removed = delta.to_remove.len(),
        "committed annotation delta"
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::MiningItem;
    use crate::position::Anchor;

    fn group(offset: usize, labels: &[&str]) -> AnchorGroup {
        AnchorGroup {
            anchor: Anchor::new(offset, 1),
            items: labels
                .iter()
                .map(|label| Arc::new(MiningItem::resolved(Anchor::new(offset, 1), *label)))
                .collect(),
        }
    }

    fn entity(offset: usize) -> Arc<AnnotationEntity> {
        Arc::new(AnnotationEntity::new(
            Anchor::new(offset, 1),
            AnnotationKind::LineHeader,
        ))
    }

    #[test]
    fn partitions_by_anchor_presence() {
        let prev = vec![entity(10), entity(40)];
        let groups = vec![group(10, &["a"]), group(25, &["b"])];
        let delta = reconcile(&groups, &prev, AnnotationKind::LineHeader);

        assert_eq!(delta.to_keep.len(), 1);
        assert!(Arc::ptr_eq(&delta.to_keep[0], &prev[0]));
        assert_eq!(delta.to_add.len(), 1);
        assert_eq!(delta.to_add[0].anchor().offset, 25);
        assert_eq!(delta.to_remove.len(), 1);
        assert!(Arc::ptr_eq(&delta.to_remove[0], &prev[1]));
    }

    #[test]
    fn kept_entity_gets_new_items_in_place() {
        let prev = vec![entity(10)];
        prev[0].update(vec![Arc::new(MiningItem::resolved(
            Anchor::new(10, 1),
            "old",
        ))]);
        let delta = reconcile(&[group(10, &["new"])], &prev, AnnotationKind::LineHeader);
        assert!(Arc::ptr_eq(&delta.to_keep[0], &prev[0]));
        assert_eq!(prev[0].items()[0].label().as_deref(), Some("new"));
    }

    #[test]
    fn identical_anchor_sets_are_a_noop() {
        let prev = vec![entity(10), entity(40)];
        let delta = reconcile(
            &[group(10, &["a"]), group(40, &["b"])],
            &prev,
            AnnotationKind::LineHeader,
        );
        assert!(delta.is_noop());
        assert_eq!(delta.to_keep.len(), 2);
    }

    #[test]
    fn noop_commit_does_not_touch_store() {
        let store = AnnotationStore::new();
        let prev = vec![entity(10)];
        store.replace(&[], prev.clone());
        let baseline = store.mutation_count();

        let delta = reconcile(&[group(10, &["a"])], &prev, AnnotationKind::LineHeader);
        assert!(!commit(&delta, &store));
        assert_eq!(store.mutation_count(), baseline);
    }

    #[test]
    fn commit_marks_removed_entities_deleted() {
        let store = AnnotationStore::new();
        let prev = vec![entity(10)];
        store.replace(&[], prev.clone());

        let delta = reconcile(&[], &prev, AnnotationKind::LineHeader);
        assert!(commit(&delta, &store));
        assert!(prev[0].is_deleted());
        assert!(store.find_at_offset(10).is_none());
    }

    #[test]
    fn empty_previous_set_adds_everything() {
        let delta = reconcile(
            &[group(10, &["a"]), group(40, &["b"])],
            &[],
            AnnotationKind::Inline,
        );
        assert_eq!(delta.to_add.len(), 2);
        assert!(delta.to_keep.is_empty());
        assert!(delta.to_remove.is_empty());
        assert_eq!(delta.to_add[0].kind(), AnnotationKind::Inline);
    }
}
