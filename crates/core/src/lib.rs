//! Domain logic for the order workflow.
//!
//! This crate has no I/O. Everything here is shared by the repository layer,
//! the API server and the tests.

pub mod activity;
pub mod error;
pub mod history;
pub mod items;
pub mod lifecycle;
pub mod notifications;
pub mod roles;
pub mod search;
pub mod serde_util;
pub mod settings;
pub mod status;
pub mod types;
pub mod visibility;
