//! Order workflow API server library.
//!
//! Exposes config, state, error handling, the order engine and the routes so
//! integration tests and the binary entrypoint share the same building blocks.

pub mod activity;
pub mod audit;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod seed;
pub mod state;
