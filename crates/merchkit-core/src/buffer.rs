// ── Optimistic edit buffer ──
//
// Holds the divergence between the last-confirmed server state and the
// user's in-progress draft. "Clean" always means draft == confirmed (or
// == the template defaults when no resource is bound) by deep equality.

use crate::model::{Body, merge_into};

/// The controller's two-value store: `confirmed` is server-authoritative
/// (`None` while no resource is bound), `draft` is the working copy
/// (`None` only transiently during an initial load).
#[derive(Debug, Clone, Default)]
pub(crate) struct EditBuffer {
    confirmed: Option<Body>,
    draft: Option<Body>,
}

impl EditBuffer {
    /// A template buffer: no confirmed state, draft seeded from defaults.
    pub(crate) fn template(defaults: Body) -> Self {
        Self {
            confirmed: None,
            draft: Some(defaults),
        }
    }

    /// A loading buffer: both values undefined until the fetch settles.
    pub(crate) fn loading() -> Self {
        Self {
            confirmed: None,
            draft: None,
        }
    }

    pub(crate) fn draft(&self) -> Option<&Body> {
        self.draft.as_ref()
    }

    pub(crate) fn confirmed(&self) -> Option<&Body> {
        self.confirmed.as_ref()
    }

    /// Whether a confirmed server snapshot is bound.
    pub(crate) fn has_snapshot(&self) -> bool {
        self.confirmed.is_some()
    }

    /// Whether the draft diverges from its baseline — the confirmed
    /// snapshot, or `defaults` while no resource is bound.
    pub(crate) fn is_dirty(&self, defaults: &Body) -> bool {
        match (&self.draft, &self.confirmed) {
            (Some(draft), Some(confirmed)) => draft != confirmed,
            (Some(draft), None) => draft != defaults,
            (None, _) => false,
        }
    }

    /// Merge `partial` into the draft, shallow per top-level key.
    /// Ignored while the draft is undefined (initial load).
    pub(crate) fn edit(&mut self, partial: &Body) {
        if let Some(ref mut draft) = self.draft {
            merge_into(draft, partial);
        }
    }

    /// Reset the draft to the confirmed snapshot, or to `defaults` when
    /// no resource is bound.
    pub(crate) fn undo(&mut self, defaults: &Body) {
        self.draft = Some(self.confirmed.clone().unwrap_or_else(|| defaults.clone()));
    }

    /// Atomically set both values to a server response payload.
    pub(crate) fn commit(&mut self, body: Body) {
        self.draft = Some(body.clone());
        self.confirmed = Some(body);
    }

    /// Drop any bound resource and reseed the draft from defaults.
    pub(crate) fn reset(&mut self, defaults: Body) {
        self.confirmed = None;
        self.draft = Some(defaults);
    }
}
