//! Asynchronously-resolved code annotations for text editors
//!
//! Collects annotation candidates ("minings") from pluggable providers,
//! groups them by document position, reconciles them against the live
//! annotation set with a minimal add/keep/remove delta, resolves labels in
//! the background and requests targeted repaints. The hosting editor
//! supplies document snapshots, the redraw sink and a UI-thread marshal;
//! everything else lives here.

pub mod aggregate;
pub mod annotation;
pub mod document;
pub mod error;
pub mod group;
pub mod invalidate;
pub mod manager;
pub mod mining;
pub mod position;
pub mod provider;
pub mod reconcile;
pub mod resolve;

// Re-export core types
pub use aggregate::{collect_minings, drop_invalid_anchors};
pub use annotation::{AnnotationEntity, AnnotationKind, AnnotationStore};
pub use document::{DocumentHandle, DocumentSnapshot, TextDocument, TextSnapshot};
pub use error::MiningError;
pub use group::{group_by_anchor, AnchorGroup};
pub use invalidate::{
    annotation_at_line, redraw_request_for, InlineUiMarshal, Invalidator, QueuedUiMarshal,
    RedrawRequest, RedrawSink, UiMarshal, UiTaskQueue,
};
pub use manager::MiningManager;
pub use mining::{MiningItem, ResolveState};
pub use position::{Anchor, LeadingWhitespace};
pub use provider::{MiningProvider, MiningResolver, SyncMiningProvider};
pub use reconcile::{commit, reconcile, ReconcileDelta};
pub use resolve::resolve_minings;
