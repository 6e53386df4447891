//! Refresh-cycle orchestration
//!
//! One `MiningManager` owns the collect → group → reconcile → resolve
//! pipeline for a document. `run()` returns immediately: the pipeline
//! executes as a chain of async continuations on the runtime. Starting a
//! new cycle cancels the previous one; a superseded cycle's late results
//! never reach the store.

use crate::aggregate::{collect_minings, drop_invalid_anchors};
use crate::annotation::{AnnotationEntity, AnnotationKind, AnnotationStore};
use crate::document::DocumentHandle;
use crate::group::group_by_anchor;
use crate::invalidate::Invalidator;
use crate::provider::MiningProvider;
use crate::reconcile::{commit, reconcile};
use crate::resolve::resolve_minings;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct CycleState {
    token: CancellationToken,
    generation: u64,
}

/// Drives mining collection, reconciliation and resolution for one
/// document/widget pair.
pub struct MiningManager {
    doc: Arc<dyn DocumentHandle>,
    store: Arc<AnnotationStore>,
    invalidator: Arc<Invalidator>,
    kind: AnnotationKind,
    providers: RwLock<Vec<Arc<dyn MiningProvider>>>,
    /// This manager's entities from the previous cycle. Reconciliation
    /// scans this local snapshot, never the (shared) store, so other
    /// producers' annotations are untouched and the store lock is not held
    /// across the scan.
    current: Mutex<Vec<Arc<AnnotationEntity>>>,
    cycle: Mutex<CycleState>,
}

impl MiningManager {
    pub fn new(
        doc: Arc<dyn DocumentHandle>,
        store: Arc<AnnotationStore>,
        invalidator: Arc<Invalidator>,
        kind: AnnotationKind,
    ) -> Arc<Self> {
        Arc::new(Self {
            doc,
            store,
            invalidator,
            kind,
            providers: RwLock::new(Vec::new()),
            current: Mutex::new(Vec::new()),
            cycle: Mutex::new(CycleState {
                token: CancellationToken::new(),
                generation: 0,
            }),
        })
    }

    /// Install the provider list. Takes effect from the next cycle.
    pub fn set_providers(&self, providers: Vec<Arc<dyn MiningProvider>>) {
        *self.providers.write() = providers;
    }

    pub fn store(&self) -> &Arc<AnnotationStore> {
        &self.store
    }

    /// Collect, reconcile and resolve the minings of the document.
    ///
    /// Cancels any in-flight cycle first, then schedules the new one and
    /// returns without blocking.
    pub fn run(self: &Arc<Self>) {
        let (token, generation) = self.start_cycle();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.refresh(token, generation).await;
        });
    }

    /// Cancel the live cycle without starting a new one.
    pub fn cancel(&self) {
        self.cycle.lock().token.cancel();
    }

    /// Cancel the live cycle, drop this manager's annotations from the
    /// store and dispose the providers.
    pub fn uninstall(&self) {
        self.cancel();
        let current = std::mem::take(&mut *self.current.lock());
        if !current.is_empty() {
            for ann in &current {
                ann.mark_deleted();
            }
            self.store.replace(&current, Vec::new());
        }
        for provider in self.providers.write().drain(..) {
            provider.dispose();
        }
    }

    fn start_cycle(&self) -> (CancellationToken, u64) {
        let mut cycle = self.cycle.lock();
        // Supersede: the old token is cancelled before the new one exists,
        // so no two cycles can both pass their commit check.
        cycle.token.cancel();
        cycle.token = CancellationToken::new();
        cycle.generation += 1;
        (cycle.token.clone(), cycle.generation)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.cycle.lock().generation == generation
    }

    async fn refresh(&self, token: CancellationToken, generation: u64) {
        let Some(doc) = self.doc.snapshot() else {
            // Document already closed; nothing to render.
            return;
        };
        let providers = self.providers.read().clone();
        if providers.is_empty() {
            return;
        }

        let items = collect_minings(&providers, Arc::clone(&doc), &token).await;
        if token.is_cancelled() {
            return;
        }
        let groups = group_by_anchor(drop_invalid_anchors(items, doc.as_ref()));
        debug!(generation, groups = groups.len(), "grouped mining result");

        // The editor may have closed the document while providers ran; a
        // stale cycle must not corrupt the store with stale positions.
        if self.doc.snapshot().is_none() {
            return;
        }

        let previous = self.current.lock().clone();
        let delta = reconcile(&groups, &previous, self.kind);
        if token.is_cancelled() || !self.is_current(generation) {
            return;
        }
        if commit(&delta, &self.store) {
            for ann in &delta.to_add {
                ann.render_text();
                // The repaint below covers the fresh text; clear the flag.
                ann.take_dirty();
                self.invalidator.redraw_entity(ann, doc.as_ref());
            }
            // Commit marked these deleted; their repaint request comes back
            // Full so the widget reclaims the freed line spacing.
            for ann in &delta.to_remove {
                self.invalidator.redraw_entity(ann, doc.as_ref());
            }
        }
        // Kept entities repaint only when their rendered text changed; a
        // no-op commit with relabeled survivors still reaches here.
        for ann in &delta.to_keep {
            ann.render_text();
            if ann.take_dirty() {
                self.invalidator.redraw_entity(ann, doc.as_ref());
            }
        }
        {
            let mut current = self.current.lock();
            current.clear();
            current.extend(delta.to_keep.iter().cloned());
            current.extend(delta.to_add.iter().cloned());
        }

        resolve_minings(
            &groups,
            &providers,
            doc,
            Arc::clone(&self.store),
            Arc::clone(&self.invalidator),
            &token,
        )
        .await;
    }
}
