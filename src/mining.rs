//! MiningItem: one provider-contributed annotation candidate
//!
//! An item is born with an immutable anchor and an unresolved label. The
//! label transitions to a concrete value at most once per cycle; disposal
//! is terminal and makes later label writes no-ops.

use crate::position::Anchor;
use parking_lot::Mutex;

/// Label lifecycle of a mining item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveState {
    Unresolved,
    Resolving,
    Resolved(String),
    Disposed,
}

/// One candidate decoration contributed by a provider.
///
/// Shared as `Arc<MiningItem>` between the grouped result set, the owning
/// annotation and in-flight resolution tasks.
pub struct MiningItem {
    anchor: Anchor,
    /// Index of the owning provider in the provider list. Assigned during
    /// aggregation; doubles as the grouping tie-break rank.
    provider_rank: usize,
    /// Whether the owning provider exposes a resolver for this item.
    has_resolver: bool,
    state: Mutex<ResolveState>,
}

impl MiningItem {
    /// Unresolved item; the resolution pipeline fills the label in later.
    pub fn new(anchor: Anchor) -> Self {
        Self {
            anchor,
            provider_rank: 0,
            has_resolver: false,
            state: Mutex::new(ResolveState::Unresolved),
        }
    }

    /// Item born resolved (synchronous providers).
    pub fn resolved(anchor: Anchor, label: impl Into<String>) -> Self {
        Self {
            anchor,
            provider_rank: 0,
            has_resolver: false,
            state: Mutex::new(ResolveState::Resolved(label.into())),
        }
    }

    /// Bind the item to its owning provider. Called once during aggregation.
    pub(crate) fn assign_provider(&mut self, rank: usize, has_resolver: bool) {
        self.provider_rank = rank;
        self.has_resolver = has_resolver;
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn provider_rank(&self) -> usize {
        self.provider_rank
    }

    pub fn has_resolver(&self) -> bool {
        self.has_resolver
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.lock(), ResolveState::Resolved(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(*self.state.lock(), ResolveState::Disposed)
    }

    /// Resolved label, if any.
    pub fn label(&self) -> Option<String> {
        match &*self.state.lock() {
            ResolveState::Resolved(label) => Some(label.clone()),
            _ => None,
        }
    }

    /// Mark the item as having an in-flight resolution.
    pub fn mark_resolving(&self) {
        let mut state = self.state.lock();
        if matches!(*state, ResolveState::Unresolved) {
            *state = ResolveState::Resolving;
        }
    }

    /// Store the resolved label. No-op once disposed or already resolved.
    pub fn set_label(&self, label: impl Into<String>) {
        let mut state = self.state.lock();
        match *state {
            ResolveState::Unresolved | ResolveState::Resolving => {
                *state = ResolveState::Resolved(label.into());
            }
            ResolveState::Resolved(_) | ResolveState::Disposed => {}
        }
    }

    /// Dispose the item; superseded items must not surface late labels.
    pub fn dispose(&self) {
        *self.state.lock() = ResolveState::Disposed;
    }
}

impl std::fmt::Debug for MiningItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiningItem")
            .field("anchor", &self.anchor)
            .field("provider_rank", &self.provider_rank)
            .field("state", &*self.state.lock())
            .finish()
    }
}
