//! `routinely-users` — user profile store.
//!
//! Identity and session management live outside this workspace; what remains
//! here is the profile record the engine itself needs: the IANA timezone the
//! midnight reset keys on, and the demographic fields (nationality, gender,
//! birthdate, registration time) the stats rollups group over.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, UserError};
pub use store::UserStore;
pub use types::{Gender, NewUser, User};
