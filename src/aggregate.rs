//! Provider aggregation: concurrent collection of mining candidates
//!
//! Every provider runs as its own task so one slow or failing provider
//! cannot take down the others' contributions. The joined result is the
//! flattened concatenation in provider order, with each item bound to its
//! provider's rank for the grouping tie-break.

use crate::document::DocumentSnapshot;
use crate::mining::MiningItem;
use crate::provider::MiningProvider;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Invoke all providers concurrently and join their contributions.
///
/// Provider errors (and panics) are isolated: the failing provider's
/// contribution becomes empty, logged at warn level. Safe to invoke
/// repeatedly on the same snapshot.
pub async fn collect_minings(
    providers: &[Arc<dyn MiningProvider>],
    doc: Arc<dyn DocumentSnapshot>,
    token: &CancellationToken,
) -> Vec<Arc<MiningItem>> {
    let tasks: Vec<_> = providers
        .iter()
        .enumerate()
        .map(|(rank, provider)| {
            let provider = Arc::clone(provider);
            let doc = Arc::clone(&doc);
            let token = token.clone();
            tokio::spawn(async move { provide_one(rank, provider, doc, token).await })
        })
        .collect();

    let mut all = Vec::new();
    for joined in join_all(tasks).await {
        match joined {
            Ok(items) => all.extend(items),
            Err(err) => warn!(%err, "mining provider task panicked; dropping its contribution"),
        }
    }
    all
}

async fn provide_one(
    rank: usize,
    provider: Arc<dyn MiningProvider>,
    doc: Arc<dyn DocumentSnapshot>,
    token: CancellationToken,
) -> Vec<Arc<MiningItem>> {
    match provider.provide_minings(doc, &token).await {
        Ok(Some(items)) => {
            let has_resolver = provider.resolver().is_some();
            items
                .into_iter()
                .map(|mut item| {
                    item.assign_provider(rank, has_resolver);
                    Arc::new(item)
                })
                .collect()
        }
        Ok(None) => Vec::new(),
        Err(err) => {
            warn!(provider = provider.name(), %err, "mining provider failed; treating as empty");
            Vec::new()
        }
    }
}

/// Drop candidates whose anchor no longer falls inside the snapshot.
///
/// Anchors are resolved by providers against the same snapshot, but a
/// defective provider may hand back positions past the end of the text.
pub fn drop_invalid_anchors(
    items: Vec<Arc<MiningItem>>,
    doc: &dyn DocumentSnapshot,
) -> Vec<Arc<MiningItem>> {
    let end = doc.end_offset();
    items
        .into_iter()
        .filter(|item| item.anchor().offset <= end)
        .collect()
}
