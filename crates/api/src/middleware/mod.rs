//! Request extractors for authentication, authorization and client metadata.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.
//! - [`rbac::RequireOrderCreator`] -- Requires `maker` or `admin` role.
//! - [`client_ip::ClientIp`] -- Best-effort caller address for the activity log.

pub mod auth;
pub mod client_ip;
pub mod rbac;
