// ── Coherence registry ──
//
// Process-wide pub/sub keyed by resource identity: one controller's
// successful mutation updates or invalidates every other controller
// watching the same data, in-memory, without a shared normalized cache.
// An explicit, injectable object — create one per application, drop it
// to tear down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::debug;
use url::Url;

use crate::controller::{Controller, ControllerInner, ShareOutcome};
use crate::model::Body;

/// A mutation announcement: `source` is the canonical URL of the
/// affected resource, `related` lists further identities whose views may
/// be stale, and `data` carries the new server state (`None` = deleted).
#[derive(Debug, Clone)]
pub struct Share {
    pub source: Url,
    pub related: Vec<Url>,
    pub data: Option<Body>,
}

/// The registry of live controllers.
///
/// Controllers register on construction and hold only a weak reference
/// here, so dropping every handle unsubscribes implicitly; `dispose()`
/// unsubscribes eagerly. Non-controller code (bulk commands, external
/// sync) announces mutations through [`share`](Self::share) on any
/// clone of the handle.
#[derive(Clone, Default)]
pub struct Rumour {
    inner: Arc<RumourInner>,
}

#[derive(Default)]
struct RumourInner {
    next_id: AtomicU64,
    subscribers: DashMap<u64, Weak<ControllerInner>>,
}

impl Rumour {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn attach(&self, id: u64, control: Weak<ControllerInner>) {
        self.inner.subscribers.insert(id, control);
    }

    pub(crate) fn deregister(&self, id: u64) {
        self.inner.subscribers.remove(&id);
    }

    /// Number of registered controllers (live or not-yet-pruned).
    pub fn len(&self) -> usize {
        self.inner.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.subscribers.is_empty()
    }

    /// Every live controller carrying `tag`, for bulk-action
    /// coordinators that hold no direct references.
    pub fn group(&self, tag: &str) -> Vec<Controller> {
        self.inner
            .subscribers
            .iter()
            .filter_map(|entry| entry.value().upgrade())
            .filter(|inner| inner.group_tag() == Some(tag))
            .map(Controller::from_inner)
            .collect()
    }

    /// Announce a mutation to every registered controller.
    pub async fn share(&self, share: Share) {
        self.deliver(None, share).await;
    }

    /// Fan a share out, excluding the notifying controller so a
    /// successful mutation can never re-trigger its own machine.
    ///
    /// Adoption and deletion are applied synchronously; instructed
    /// refreshes run one by one after the registry sweep so no registry
    /// lock is held across an await point.
    pub(crate) async fn deliver(&self, from: Option<u64>, share: Share) {
        let mut dead = Vec::new();
        let mut refreshers = Vec::new();

        for entry in &self.inner.subscribers {
            let id = *entry.key();
            if Some(id) == from {
                continue;
            }
            match entry.value().upgrade() {
                Some(control) => {
                    if matches!(control.apply_share(&share), ShareOutcome::Refresh) {
                        refreshers.push(Controller::from_inner(control));
                    }
                }
                None => dead.push(id),
            }
        }

        for id in dead {
            self.inner.subscribers.remove(&id);
        }

        debug!(
            source = %share.source,
            deleted = share.data.is_none(),
            refreshing = refreshers.len(),
            "rumour delivered"
        );

        for control in refreshers {
            control.refresh().await;
        }
    }
}
