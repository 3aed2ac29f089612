//! Write paths that span several repositories.
//!
//! - [`orders::OrderLifecycle`] -- order create/update/delete, item status and
//!   bulk email, with post-commit notification dispatch.
//! - [`users`] -- cascading user deletion.

pub mod orders;
pub mod users;

pub use orders::OrderLifecycle;
