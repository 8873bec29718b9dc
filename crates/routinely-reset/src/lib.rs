//! `routinely-reset` — nightly completion re-arm.
//!
//! [`engine::ResetEngine`] ticks once a minute and, for every active user
//! whose configured zone has just reached local midnight, flips all their
//! activities back to "not completed" in one bulk write. Archival records
//! are left alone. Best-effort, at-least-once per local midnight: a tick
//! missed while the process is down is simply skipped until the user's next
//! midnight — there is no catch-up.

pub mod engine;
pub mod error;

pub use engine::ResetEngine;
pub use error::{ResetError, Result};
