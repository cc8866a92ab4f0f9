//! Terminal client for the employee management API.
//!
//! The interesting part lives in [`api`] and [`cache`]: an HTTP adapter that
//! carries the session's bearer token and ends the session on a 401, and a
//! keyed read cache with freshness windows, request de-duplication, retry and
//! prefix invalidation after writes. The rest is a `ratatui` front end.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod event;
pub mod logging;
pub mod nav;
pub mod query;
pub mod session;
pub mod ui;
