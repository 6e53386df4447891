//! Pluggable mining providers and resolvers
//!
//! Providers contribute candidate items for a document snapshot; resolvers
//! compute the (possibly expensive) label for an item on demand. A provider
//! optionally holds a resolver by composition; there is no inheritance
//! chain and no runtime registry lookup. The hosting editor constructs the
//! provider list and hands it to the manager directly.

use crate::document::DocumentSnapshot;
use crate::error::MiningError;
use crate::mining::MiningItem;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Contributes mining candidates for a document snapshot.
///
/// `Ok(None)` means "no contribution"; errors are isolated per provider and
/// treated as empty by the aggregation step.
#[async_trait]
pub trait MiningProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Provide all candidate items for the given snapshot.
    async fn provide_minings(
        &self,
        doc: Arc<dyn DocumentSnapshot>,
        token: &CancellationToken,
    ) -> Result<Option<Vec<MiningItem>>, MiningError>;

    /// Resolver for this provider's unresolved items, if any.
    fn resolver(&self) -> Option<&dyn MiningResolver> {
        None
    }

    /// Release provider resources. Called by the manager on uninstall.
    fn dispose(&self) {}
}

/// Resolves the display label of one mining item.
#[async_trait]
pub trait MiningResolver: Send + Sync {
    async fn resolve(
        &self,
        doc: Arc<dyn DocumentSnapshot>,
        item: Arc<MiningItem>,
        token: &CancellationToken,
    ) -> Result<String, MiningError>;
}

// === Synchronous adapter ===

/// Provider built from a synchronous closure whose items are born resolved.
///
/// Covers the common case of cheap providers (line counters, markers) that
/// have no async work to do.
pub struct SyncMiningProvider<F> {
    name: &'static str,
    provide: F,
}

impl<F> SyncMiningProvider<F>
where
    F: Fn(&dyn DocumentSnapshot) -> Vec<MiningItem> + Send + Sync,
{
    pub fn new(name: &'static str, provide: F) -> Self {
        Self { name, provide }
    }
}

#[async_trait]
impl<F> MiningProvider for SyncMiningProvider<F>
where
    F: Fn(&dyn DocumentSnapshot) -> Vec<MiningItem> + Send + Sync,
{
    fn name(&self) -> &str {
        self.name
    }

    async fn provide_minings(
        &self,
        doc: Arc<dyn DocumentSnapshot>,
        _token: &CancellationToken,
    ) -> Result<Option<Vec<MiningItem>>, MiningError> {
        Ok(Some((self.provide)(doc.as_ref())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextSnapshot;
    use crate::position::Anchor;

    #[tokio::test]
    async fn sync_provider_items_are_pre_resolved() {
        let provider = SyncMiningProvider::new("lines", |doc: &dyn DocumentSnapshot| {
            vec![MiningItem::resolved(
                Anchor::new(0, 1),
                format!("{} lines", doc.line_count()),
            )]
        });
        let doc: Arc<dyn DocumentSnapshot> = Arc::new(TextSnapshot::new("a\nb"));
        let items = provider
            .provide_minings(doc, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label().as_deref(), Some("2 lines"));
        assert!(provider.resolver().is_none());
    }
}
