//! edm-daemon library surface.
//!
//! `main.rs` wires config, store and tutor into an [`state::AppState`] and
//! serves [`routes::build_router`]. The scenario tests in `tests/` build the
//! same router over an in-memory store.

pub mod api_types;
pub mod auth;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod state;
mod validate;
