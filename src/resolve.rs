//! Resolution pipeline: async label computation with scoped redraws
//!
//! Unresolved items are handed to their provider's resolver. Futures that
//! complete immediately are applied synchronously and never tracked; the
//! rest run as background tasks whose continuation re-checks the cycle
//! token, writes the label, and requests a repaint limited to the owning
//! annotation's screen region.

use crate::annotation::AnnotationStore;
use crate::document::DocumentSnapshot;
use crate::error::MiningError;
use crate::group::AnchorGroup;
use crate::invalidate::Invalidator;
use crate::mining::MiningItem;
use crate::provider::MiningProvider;
use futures::future::poll_immediate;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Resolve every unresolved item in the grouped set.
///
/// Returns the number of resolutions still in flight after the synchronous
/// probe. Fire-and-forget: completions drive their own redraws.
pub async fn resolve_minings(
    groups: &[AnchorGroup],
    providers: &[Arc<dyn MiningProvider>],
    doc: Arc<dyn DocumentSnapshot>,
    store: Arc<AnnotationStore>,
    invalidator: Arc<Invalidator>,
    token: &CancellationToken,
) -> usize {
    let mut pending = 0;
    for group in groups {
        for item in &group.items {
            if item.is_resolved() || !item.has_resolver() {
                continue;
            }
            let Some(provider) = providers.get(item.provider_rank()) else {
                continue;
            };
            item.mark_resolving();
            let mut fut = Box::pin(resolve_one(
                Arc::clone(provider),
                Arc::clone(&doc),
                Arc::clone(item),
                token.clone(),
            ));
            // Probe without blocking: an already-completed future needs no
            // callback wiring at all.
            match poll_immediate(fut.as_mut()).await {
                Some(outcome) => {
                    apply_outcome(item, outcome);
                }
                None => {
                    pending += 1;
                    let item = Arc::clone(item);
                    let doc = Arc::clone(&doc);
                    let store = Arc::clone(&store);
                    let invalidator = Arc::clone(&invalidator);
                    let token = token.clone();
                    tokio::spawn(async move {
                        let outcome = fut.await;
                        if token.is_cancelled() {
                            // Stale cycle; drop the result silently.
                            return;
                        }
                        if apply_outcome(&item, outcome) {
                            redraw_owner(&item, &store, doc.as_ref(), &invalidator);
                        }
                    });
                }
            }
        }
    }
    pending
}

async fn resolve_one(
    provider: Arc<dyn MiningProvider>,
    doc: Arc<dyn DocumentSnapshot>,
    item: Arc<MiningItem>,
    token: CancellationToken,
) -> Result<String, MiningError> {
    match provider.resolver() {
        Some(resolver) => resolver.resolve(doc, item, &token).await,
        None => Err(MiningError::resolver("provider lost its resolver")),
    }
}

/// Store a successful label; a failed resolver leaves the item unresolved
/// for the rest of the cycle without aborting its siblings.
fn apply_outcome(item: &MiningItem, outcome: Result<String, MiningError>) -> bool {
    match outcome {
        Ok(label) => {
            item.set_label(label);
            true
        }
        Err(err) => {
            warn!(%err, anchor = item.anchor().offset, "mining resolver failed");
            false
        }
    }
}

/// Repaint just the annotation owning the freshly resolved item.
fn redraw_owner(
    item: &MiningItem,
    store: &AnnotationStore,
    doc: &dyn DocumentSnapshot,
    invalidator: &Invalidator,
) {
    if let Some(entity) = store.find_at_offset(item.anchor().offset) {
        entity.render_text();
        entity.take_dirty();
        invalidator.redraw_entity(&entity, doc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationEntity, AnnotationKind};
    use crate::invalidate::{InlineUiMarshal, RedrawRequest, RedrawSink};
    use crate::position::Anchor;
    use crate::provider::MiningResolver;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    struct RecordingSink {
        requests: Mutex<Vec<RedrawRequest>>,
    }

    impl RedrawSink for RecordingSink {
        fn request_redraw(&self, request: RedrawRequest) {
            self.requests.lock().push(request);
        }
    }

    /// Resolver gated on a semaphore permit; zero permits means "pending".
    struct GatedResolver {
        gate: Arc<Semaphore>,
        label: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl MiningResolver for GatedResolver {
        async fn resolve(
            &self,
            _doc: Arc<dyn DocumentSnapshot>,
            _item: Arc<MiningItem>,
            _token: &CancellationToken,
        ) -> Result<String, MiningError> {
            let permit = self.gate.acquire().await.map_err(MiningError::resolver)?;
            permit.forget();
            if self.fail {
                Err(MiningError::resolver("lookup failed"))
            } else {
                Ok(self.label.to_string())
            }
        }
    }

    struct ResolvingProvider {
        resolver: GatedResolver,
    }

    #[async_trait]
    impl MiningProvider for ResolvingProvider {
        fn name(&self) -> &str {
            "resolving"
        }

        async fn provide_minings(
            &self,
            _doc: Arc<dyn DocumentSnapshot>,
            _token: &CancellationToken,
        ) -> Result<Option<Vec<MiningItem>>, MiningError> {
            Ok(None)
        }

        fn resolver(&self) -> Option<&dyn MiningResolver> {
            Some(&self.resolver)
        }
    }

    struct Fixture {
        providers: Vec<Arc<dyn MiningProvider>>,
        doc: Arc<dyn DocumentSnapshot>,
        store: Arc<AnnotationStore>,
        invalidator: Arc<Invalidator>,
        sink: Arc<RecordingSink>,
        gate: Arc<Semaphore>,
    }

    fn fixture(permits: usize, fail: bool) -> Fixture {
        let gate = Arc::new(Semaphore::new(permits));
        let provider = Arc::new(ResolvingProvider {
            resolver: GatedResolver {
                gate: Arc::clone(&gate),
                label: "3 references",
                fail,
            },
        });
        let sink = Arc::new(RecordingSink {
            requests: Mutex::new(Vec::new()),
        });
        Fixture {
            providers: vec![provider],
            doc: Arc::new(crate::document::TextSnapshot::new("aaaa\nbbbb\ncccc")),
            store: Arc::new(AnnotationStore::new()),
            invalidator: Arc::new(Invalidator::new(sink.clone(), Arc::new(InlineUiMarshal))),
            sink,
            gate,
        }
    }

    fn unresolved_group(offset: usize) -> (AnchorGroup, Arc<MiningItem>) {
        let mut item = MiningItem::new(Anchor::new(offset, 1));
        item.assign_provider(0, true);
        let item = Arc::new(item);
        (
            AnchorGroup {
                anchor: Anchor::new(offset, 1),
                items: vec![Arc::clone(&item)],
            },
            item,
        )
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn immediate_completion_skips_tracking() {
        let fx = fixture(1, false);
        let (group, item) = unresolved_group(5);
        let pending = resolve_minings(
            &[group],
            &fx.providers,
            fx.doc.clone(),
            fx.store.clone(),
            fx.invalidator.clone(),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(pending, 0);
        assert_eq!(item.label().as_deref(), Some("3 references"));
        // Synchronous path: the upcoming paint renders the text, no
        // dedicated redraw is queued.
        assert!(fx.sink.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn late_completion_redraws_owner() {
        let fx = fixture(0, false);
        let (group, item) = unresolved_group(5);
        let entity = Arc::new(AnnotationEntity::new(
            Anchor::new(5, 1),
            AnnotationKind::LineHeader,
        ));
        entity.update(vec![Arc::clone(&item)]);
        fx.store.replace(&[], vec![Arc::clone(&entity)]);

        let pending = resolve_minings(
            &[group],
            &fx.providers,
            fx.doc.clone(),
            fx.store.clone(),
            fx.invalidator.clone(),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(pending, 1);
        assert_eq!(item.label(), None);

        fx.gate.add_permits(1);
        wait_until(|| item.is_resolved()).await;
        wait_until(|| !fx.sink.requests.lock().is_empty()).await;
        assert_eq!(
            fx.sink.requests.lock().as_slice(),
            &[RedrawRequest::LineRange { start: 0, end: 5 }]
        );
        assert_eq!(entity.render_text(), "3 references");
    }

    #[tokio::test]
    async fn cancelled_cycle_drops_late_result() {
        let fx = fixture(0, false);
        let (group, item) = unresolved_group(5);
        let token = CancellationToken::new();
        let pending = resolve_minings(
            &[group],
            &fx.providers,
            fx.doc.clone(),
            fx.store.clone(),
            fx.invalidator.clone(),
            &token,
        )
        .await;
        assert_eq!(pending, 1);

        token.cancel();
        fx.gate.add_permits(1);
        // Give the continuation a chance to run; it must no-op.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(item.label(), None);
        assert!(fx.sink.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn resolver_failure_is_isolated() {
        let fx = fixture(1, true);
        let (group, item) = unresolved_group(5);
        let pending = resolve_minings(
            &[group],
            &fx.providers,
            fx.doc.clone(),
            fx.store.clone(),
            fx.invalidator.clone(),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(pending, 0);
        assert!(!item.is_resolved());
    }
}
