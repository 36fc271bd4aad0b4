//! Resource controllers for admin surfaces over a commerce REST API.
//!
//! This crate owns the state machinery between `merchkit-api` and UI
//! embedders:
//!
//! - **[`Controller`]** — A finite-state machine binding one long-lived
//!   control to one remote resource. `edit()`/`undo()` work an optimistic
//!   draft against the last-confirmed server state; `submit()`,
//!   `delete()`, and `refresh()` run CRUD through the gateway, with
//!   `Busy` as the single-flight guard and `Fail` as the recoverable
//!   error state. Failures never cross the public boundary as return
//!   values — they are machine state plus [`Controller::last_error`].
//!
//! - **[`Pipeline`]** — Ordered, pure validation rules evaluated on every
//!   draft change, producing deduplicated `"<field>:<rule>"` codes.
//!   Validity gates `submit()` and nothing else.
//!
//! - **[`Rumour`]** — The coherence registry. A successful mutation on
//!   one controller is shared to every other mounted controller: same
//!   identity and clean → adopt in place without a fetch; related →
//!   silent refresh; dirty → left alone. Group tags let bulk commands
//!   address cohorts without holding references.
//!
//! - **[`ControlConfig`]** — Runtime connection settings (base URL,
//!   bearer token, transport tuning) with TOML + `MERCHKIT_*` env
//!   loading.
//!
//! Resources are opaque JSON objects ([`Body`]); the canonical identity
//! of a resource is its URL, read from `_links.self.href` when the
//! server creates one.

mod buffer;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod rumour;
pub mod stream;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ConfigError, ControlConfig};
pub use controller::{Branch, ControlSnapshot, Controller, ControllerOptions, State};
pub use error::ControlError;
pub use model::{Body, self_url};
pub use rumour::{Rumour, Share};
pub use stream::ControlChanges;
pub use validate::{Pipeline, Rule, matches, max_length, required};
