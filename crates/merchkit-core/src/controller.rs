// ── Resource controller ──
//
// One controller binds one long-lived UI control to one remote resource.
// It owns the state machine, composes the edit buffer, validation
// pipeline, gateway, and rumour registry, and is the only component
// allowed to issue network operations for its resource.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

use merchkit_api::{ApiError, Gateway, Request, Response};

use crate::buffer::EditBuffer;
use crate::error::ControlError;
use crate::model::{self, Body};
use crate::rumour::{Rumour, Share};
use crate::stream::ControlChanges;
use crate::validate::Pipeline;

// ── States ───────────────────────────────────────────────────────────

/// The template/snapshot × clean/dirty classification of an idle
/// controller.
///
/// `Template*`: no resource bound — the draft is the default shape.
/// `Snapshot*`: a resource is loaded — the draft tracks server state.
/// `*Dirty`: the draft diverges from its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    TemplateClean,
    TemplateDirty,
    SnapshotClean,
    SnapshotDirty,
}

impl Branch {
    pub fn is_dirty(self) -> bool {
        matches!(self, Self::TemplateDirty | Self::SnapshotDirty)
    }

    pub fn is_snapshot(self) -> bool {
        matches!(self, Self::SnapshotClean | Self::SnapshotDirty)
    }
}

/// Machine state observable by embedders.
///
/// Validity is NOT a state — it is the pure query
/// [`Controller::is_valid`], derived from the draft and the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle(Branch),
    /// A network operation (load, refresh, create, update, delete) is in
    /// flight. Mutating calls are rejected until it settles.
    Busy,
    /// The most recent network operation failed; see
    /// [`Controller::last_error`]. Recover via `refresh()` or an
    /// identity change.
    Fail,
}

impl State {
    pub fn branch(self) -> Option<Branch> {
        match self {
            Self::Idle(branch) => Some(branch),
            _ => None,
        }
    }
}

/// Point-in-time view published on every state, draft, or error-list
/// change — the re-render signal for embedders.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSnapshot {
    pub state: State,
    pub draft: Option<Body>,
    pub errors: Vec<String>,
}

// ── Options ──────────────────────────────────────────────────────────

/// Everything a controller needs at construction. Explicit injection —
/// there is no ambient context to discover collaborators from.
#[derive(Debug, Default)]
pub struct ControllerOptions {
    identity: Option<Url>,
    parent: Option<Url>,
    defaults: Body,
    rules: Pipeline,
    related: Vec<Url>,
    group: Option<String>,
}

impl ControllerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to an existing resource. The controller starts `Busy`; drive
    /// the fetch with [`Controller::load`].
    pub fn identity(mut self, url: Url) -> Self {
        self.identity = Some(url);
        self
    }

    /// The collection endpoint creations are POSTed to. Without one, a
    /// template controller cannot submit.
    pub fn parent(mut self, url: Url) -> Self {
        self.parent = Some(url);
        self
    }

    /// The default shape seeded into the draft while no resource is
    /// bound, and restored after deletion.
    pub fn defaults(mut self, defaults: Body) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn rules(mut self, rules: Pipeline) -> Self {
        self.rules = rules;
        self
    }

    /// Identities this controller wants rumours about beyond its own.
    pub fn related(mut self, related: Vec<Url>) -> Self {
        self.related = related;
        self
    }

    /// Cohort label for bulk addressing via [`Rumour::group`].
    pub fn group(mut self, tag: impl Into<String>) -> Self {
        self.group = Some(tag.into());
        self
    }
}

// ── Controller ───────────────────────────────────────────────────────

/// The orchestrator: one state machine instance bound to one resource
/// identity.
///
/// Cheaply cloneable via `Arc`. All mutating operations are rejected as
/// no-ops when the machine is not in a state that permits them; no
/// public operation returns an error — failures are machine state.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

pub(crate) struct ControllerInner {
    gateway: Gateway,
    rumour: Rumour,
    rules: Pipeline,
    defaults: Body,
    parent: Option<Url>,
    group: Option<String>,
    related: HashSet<Url>,
    /// Registration id in the rumour registry; used to exclude this
    /// controller from its own fan-out.
    registration: u64,
    changes: watch::Sender<ControlSnapshot>,
    shared: Mutex<Shared>,
}

struct Shared {
    identity: Option<Url>,
    state: State,
    buffer: EditBuffer,
    errors: Vec<String>,
    last_error: Option<Arc<ControlError>>,
    /// Bumped on identity reassignment and dispose; an in-flight
    /// operation whose captured epoch no longer matches is discarded.
    epoch: u64,
    /// True while a request is actually outstanding. `Busy` alone is not
    /// enough: the initial-load state is `Busy` before any request
    /// exists.
    inflight: bool,
}

impl Controller {
    /// Create a controller and register it with `rumour`.
    ///
    /// With an identity the machine starts `Busy` and the embedder
    /// drives the initial fetch via [`load()`](Self::load); without one
    /// it starts `Idle(TemplateClean)` with the draft seeded from
    /// `defaults`.
    pub fn new(gateway: Gateway, rumour: Rumour, options: ControllerOptions) -> Self {
        let ControllerOptions {
            identity,
            parent,
            defaults,
            rules,
            related,
            group,
        } = options;

        let (buffer, state) = if identity.is_some() {
            (EditBuffer::loading(), State::Busy)
        } else {
            (
                EditBuffer::template(defaults.clone()),
                State::Idle(Branch::TemplateClean),
            )
        };
        let errors = buffer
            .draft()
            .map(|draft| rules.evaluate(draft))
            .unwrap_or_default();
        let (changes, _) = watch::channel(ControlSnapshot {
            state,
            draft: buffer.draft().cloned(),
            errors: errors.clone(),
        });

        let registration = rumour.allocate();
        let inner = Arc::new(ControllerInner {
            gateway,
            rumour: rumour.clone(),
            rules,
            defaults,
            parent,
            group,
            related: related.into_iter().collect(),
            registration,
            changes,
            shared: Mutex::new(Shared {
                identity,
                state,
                buffer,
                errors,
                last_error: None,
                epoch: 0,
                inflight: false,
            }),
        });
        rumour.attach(registration, Arc::downgrade(&inner));

        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<ControllerInner>) -> Self {
        Self { inner }
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn state(&self) -> State {
        self.inner.lock().state
    }

    pub fn branch(&self) -> Option<Branch> {
        self.state().branch()
    }

    pub fn draft(&self) -> Option<Body> {
        self.inner.lock().buffer.draft().cloned()
    }

    pub fn last_confirmed(&self) -> Option<Body> {
        self.inner.lock().buffer.confirmed().cloned()
    }

    pub fn errors(&self) -> Vec<String> {
        self.inner.lock().errors.clone()
    }

    /// Pure query over draft × pipeline; independent of network state.
    pub fn is_valid(&self) -> bool {
        self.inner.lock().errors.is_empty()
    }

    pub fn identity(&self) -> Option<Url> {
        self.inner.lock().identity.clone()
    }

    pub fn group(&self) -> Option<&str> {
        self.inner.group.as_deref()
    }

    /// The failure recorded by the most recent `Fail` transition.
    pub fn last_error(&self) -> Option<Arc<ControlError>> {
        self.inner.lock().last_error.clone()
    }

    /// Subscribe to state/draft/error changes for re-render scheduling.
    pub fn subscribe(&self) -> watch::Receiver<ControlSnapshot> {
        self.inner.changes.subscribe()
    }

    /// The subscription as a `Stream` for combinator-style consumers.
    pub fn changes(&self) -> ControlChanges {
        ControlChanges::new(self.inner.changes.subscribe())
    }

    // ── Synchronous operations ───────────────────────────────────

    /// Merge `partial` into the draft, shallow per top-level key.
    ///
    /// No-op outside `Idle` — an in-flight operation must not be
    /// corrupted and a surfaced failure must not be masked.
    pub fn edit(&self, partial: &Body) {
        let inner = &self.inner;
        let mut s = inner.lock();
        if !matches!(s.state, State::Idle(_)) {
            debug!(state = ?s.state, "edit ignored");
            return;
        }
        s.buffer.edit(partial);
        inner.refresh_derived(&mut s);
        inner.publish(&s);
    }

    /// Reset the draft to the last confirmed state (or the default shape
    /// in a template branch). No-op unless idle and dirty.
    pub fn undo(&self) {
        let inner = &self.inner;
        let mut s = inner.lock();
        let State::Idle(branch) = s.state else { return };
        if !branch.is_dirty() {
            return;
        }
        let defaults = inner.defaults.clone();
        s.buffer.undo(&defaults);
        inner.refresh_derived(&mut s);
        inner.publish(&s);
    }

    // ── Network operations ───────────────────────────────────────

    /// Save the draft: POST to the parent endpoint (create, no identity)
    /// or PATCH the identity (update).
    ///
    /// No-op unless idle, not `SnapshotClean`, and the error list is
    /// empty. On success the response body becomes both draft and
    /// confirmed state and the rumour registry is notified; on failure
    /// the machine moves to `Fail` with the draft preserved.
    pub async fn submit(&self) {
        let inner = &self.inner;
        let (token, request) = {
            let mut s = inner.lock();
            let State::Idle(branch) = s.state else {
                debug!(state = ?s.state, "submit ignored: not idle");
                return;
            };
            if branch == Branch::SnapshotClean {
                return;
            }
            if !s.errors.is_empty() {
                debug!(errors = ?s.errors, "submit blocked by validation");
                return;
            }
            let Some(draft) = s.buffer.draft().cloned() else {
                return;
            };
            let request = if let Some(ref url) = s.identity {
                Request::patch(url.clone(), Value::Object(draft))
            } else if let Some(ref parent) = inner.parent {
                Request::post(parent.clone(), Value::Object(draft))
            } else {
                debug!("submit ignored: no parent endpoint to create under");
                return;
            };
            s.inflight = true;
            s.state = State::Busy;
            inner.publish(&s);
            (s.epoch, request)
        };

        let outcome = inner.gateway.send(request).await;
        self.settle_submit(token, outcome).await;
    }

    /// Delete the bound resource. No-op unless idle on a snapshot branch
    /// with a known identity. Success clears the identity and returns to
    /// `Idle(TemplateClean)`; failure moves to `Fail`.
    pub async fn delete(&self) {
        let inner = &self.inner;
        let (token, url) = {
            let mut s = inner.lock();
            let State::Idle(branch) = s.state else { return };
            if !branch.is_snapshot() {
                return;
            }
            let Some(url) = s.identity.clone() else { return };
            s.inflight = true;
            s.state = State::Busy;
            inner.publish(&s);
            (s.epoch, url)
        };

        let outcome = inner.gateway.send(Request::delete(url.clone())).await;

        let share = {
            let mut s = inner.lock();
            if s.epoch != token {
                warn!(url = %url, "discarding stale delete result");
                return;
            }
            s.inflight = false;
            match outcome {
                Ok(_) => {
                    s.identity = None;
                    s.buffer.reset(inner.defaults.clone());
                    s.last_error = None;
                    inner.refresh_derived(&mut s);
                    inner.publish(&s);
                    Some(Share {
                        source: url,
                        related: inner.related.iter().cloned().collect(),
                        data: None,
                    })
                }
                Err(err) => {
                    debug!(error = %err, "delete failed");
                    s.last_error = Some(Arc::new(err.into()));
                    s.state = State::Fail;
                    inner.publish(&s);
                    None
                }
            }
        };

        if let Some(share) = share {
            inner.rumour.deliver(Some(inner.registration), share).await;
        }
    }

    /// Re-fetch the resource, discarding any unsaved edits. Valid from
    /// an idle snapshot branch or from `Fail`, with a known identity.
    pub async fn refresh(&self) {
        let inner = &self.inner;
        let (token, url) = {
            let mut s = inner.lock();
            let allowed = matches!(s.state, State::Fail)
                || matches!(s.state, State::Idle(branch) if branch.is_snapshot());
            if !allowed {
                return;
            }
            let Some(url) = s.identity.clone() else { return };
            s.inflight = true;
            s.state = State::Busy;
            inner.publish(&s);
            (s.epoch, url)
        };

        let outcome = inner.gateway.send(Request::get(url)).await;
        self.settle_fetch(token, outcome);
    }

    /// Drive the initial fetch of a controller constructed (or
    /// re-identified) with an identity. No-op unless the machine is in
    /// the pre-load `Busy` state.
    pub async fn load(&self) {
        let inner = &self.inner;
        let (token, url) = {
            let mut s = inner.lock();
            if s.state != State::Busy || s.inflight {
                return;
            }
            let Some(url) = s.identity.clone() else { return };
            s.inflight = true;
            (s.epoch, url)
        };

        debug!(url = %url, "initial load");
        let outcome = inner.gateway.send(Request::get(url)).await;
        self.settle_fetch(token, outcome);
    }

    /// Rebind the controller to a different identity (or none).
    ///
    /// Atomically invalidates the outcome of any in-flight operation,
    /// then either fetches the new resource inline (`Busy` for the
    /// duration) or resets to `Idle(TemplateClean)`.
    pub async fn set_identity(&self, identity: Option<Url>) {
        let inner = &self.inner;
        let load_needed = {
            let mut s = inner.lock();
            s.epoch += 1;
            s.inflight = false;
            s.last_error = None;
            s.identity = identity;
            if s.identity.is_some() {
                s.buffer = EditBuffer::loading();
                s.errors.clear();
                s.state = State::Busy;
            } else {
                s.buffer = EditBuffer::template(inner.defaults.clone());
                inner.refresh_derived(&mut s);
            }
            inner.publish(&s);
            s.identity.is_some()
        };

        if load_needed {
            self.load().await;
        }
    }

    /// Unmount: deregister from the rumour registry and invalidate any
    /// outstanding request so its resolution becomes a no-op.
    /// Idempotent.
    pub fn dispose(&self) {
        let inner = &self.inner;
        {
            let mut s = inner.lock();
            s.epoch += 1;
            s.inflight = false;
        }
        inner.rumour.deregister(inner.registration);
        debug!("controller disposed");
    }

    // ── Settlement ───────────────────────────────────────────────

    async fn settle_submit(&self, token: u64, outcome: Result<Response, ApiError>) {
        let inner = &self.inner;
        let share = {
            let mut s = inner.lock();
            if s.epoch != token {
                warn!("discarding stale submit result");
                return;
            }
            s.inflight = false;
            match outcome {
                Ok(resp) => {
                    // Servers that answer 204 to PATCH echo nothing; the
                    // accepted draft then stands in for the response.
                    let body = match resp.body {
                        Value::Object(map) => map,
                        _ => s.buffer.draft().cloned().unwrap_or_default(),
                    };
                    if s.identity.is_none() {
                        s.identity = model::self_url(&body);
                    }
                    s.buffer.commit(body.clone());
                    s.last_error = None;
                    inner.refresh_derived(&mut s);
                    inner.publish(&s);
                    s.identity.clone().map(|source| Share {
                        source,
                        related: inner.related.iter().cloned().collect(),
                        data: Some(body),
                    })
                }
                Err(err) => {
                    debug!(error = %err, "submit failed");
                    s.last_error = Some(Arc::new(err.into()));
                    s.state = State::Fail;
                    inner.publish(&s);
                    None
                }
            }
        };

        if let Some(share) = share {
            inner.rumour.deliver(Some(inner.registration), share).await;
        }
    }

    fn settle_fetch(&self, token: u64, outcome: Result<Response, ApiError>) {
        let inner = &self.inner;
        let mut s = inner.lock();
        if s.epoch != token {
            warn!("discarding stale fetch result");
            return;
        }
        s.inflight = false;
        match outcome {
            Ok(resp) => {
                let body = match resp.body {
                    Value::Object(map) => map,
                    _ => Body::default(),
                };
                s.buffer.commit(body);
                s.last_error = None;
                inner.refresh_derived(&mut s);
                inner.publish(&s);
            }
            Err(err) => {
                debug!(error = %err, "fetch failed");
                s.last_error = Some(Arc::new(err.into()));
                s.state = State::Fail;
                inner.publish(&s);
            }
        }
    }
}

// ── Rumour delivery ──────────────────────────────────────────────────

/// What the registry should do with a subscriber after offering it a
/// share.
pub(crate) enum ShareOutcome {
    /// Adopted the data (or the deletion) in place; nothing further.
    Applied,
    /// Not interested, or protected (dirty / mid-operation).
    Skipped,
    /// Interested but the shapes may differ: re-fetch.
    Refresh,
}

impl ControllerInner {
    pub(crate) fn group_tag(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Apply the delivery policy for one shared mutation. Adoption and
    /// deletion are applied synchronously under this controller's lock;
    /// refreshes are reported back for the registry to drive.
    pub(crate) fn apply_share(&self, share: &Share) -> ShareOutcome {
        let mut s = self.lock();
        let Some(my_id) = s.identity.clone() else {
            return ShareOutcome::Skipped;
        };
        // Unsaved edits are never silently overwritten.
        if let State::Idle(branch) = s.state {
            if branch.is_dirty() {
                return ShareOutcome::Skipped;
            }
        }

        if my_id == share.source {
            if s.state != State::Idle(Branch::SnapshotClean) {
                return ShareOutcome::Skipped;
            }
            match &share.data {
                Some(body) => {
                    // Same merge-and-reset as a successful fetch, minus
                    // the fetch.
                    s.buffer.commit(body.clone());
                    self.refresh_derived(&mut s);
                    self.publish(&s);
                }
                None => {
                    // The resource is gone: transition as if our own
                    // delete() had succeeded.
                    s.identity = None;
                    s.buffer.reset(self.defaults.clone());
                    self.refresh_derived(&mut s);
                    self.publish(&s);
                }
            }
            ShareOutcome::Applied
        } else if share.related.contains(&my_id) || self.related.contains(&share.source) {
            ShareOutcome::Refresh
        } else {
            ShareOutcome::Skipped
        }
    }

    // ── Private helpers ──────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Recompute errors and the idle branch from the buffer. Only
    /// meaningful when landing in an idle state.
    fn refresh_derived(&self, s: &mut Shared) {
        if let Some(draft) = s.buffer.draft() {
            s.errors = self.rules.evaluate(draft);
        } else {
            s.errors.clear();
        }
        let dirty = s.buffer.is_dirty(&self.defaults);
        let branch = match (s.buffer.has_snapshot(), dirty) {
            (true, true) => Branch::SnapshotDirty,
            (true, false) => Branch::SnapshotClean,
            (false, true) => Branch::TemplateDirty,
            (false, false) => Branch::TemplateClean,
        };
        s.state = State::Idle(branch);
    }

    fn publish(&self, s: &Shared) {
        self.changes.send_modify(|snap| {
            *snap = ControlSnapshot {
                state: s.state,
                draft: s.buffer.draft().cloned(),
                errors: s.errors.clone(),
            };
        });
    }
}
