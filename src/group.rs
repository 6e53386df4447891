//! Grouping & ordering of mining items by anchor position
//!
//! Providers complete in arbitrary order; the sort here makes the grouped
//! output deterministic for a fixed item set regardless of completion
//! timing. Items sharing an anchor offset merge into one group so multiple
//! providers can annotate the same line jointly.

use crate::mining::MiningItem;
use crate::position::Anchor;
use std::cmp::Ordering;
use std::sync::Arc;

/// All items sharing one anchor, in tie-break order.
#[derive(Debug, Clone)]
pub struct AnchorGroup {
    pub anchor: Anchor,
    pub items: Vec<Arc<MiningItem>>,
}

/// Sort key: anchor offset ascending, then items without a resolver before
/// items with one, then provider rank ascending.
fn compare(a: &MiningItem, b: &MiningItem) -> Ordering {
    a.anchor()
        .offset
        .cmp(&b.anchor().offset)
        .then_with(|| a.has_resolver().cmp(&b.has_resolver()))
        .then_with(|| a.provider_rank().cmp(&b.provider_rank()))
}

/// Sort items and merge consecutive same-offset runs into groups.
///
/// Output order is reproducible for the same provider list + items,
/// independent of which provider's future resolved first.
pub fn group_by_anchor(mut items: Vec<Arc<MiningItem>>) -> Vec<AnchorGroup> {
    items.sort_by(|a, b| compare(a, b));

    let mut groups: Vec<AnchorGroup> = Vec::new();
    for item in items {
        match groups.last_mut() {
            Some(group) if group.anchor.offset == item.anchor().offset => {
                group.items.push(item);
            }
            _ => groups.push(AnchorGroup {
                anchor: item.anchor(),
                items: vec![item],
            }),
        }
    }
    groups
}
