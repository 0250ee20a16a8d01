//! edm-cache
//!
//! In-process key/value cache with per-entry expiry, plus the two typed
//! views the daemon needs: per-user progress documents and the revoked
//! token list.

mod denylist;
pub mod keys;
mod progress;
mod ttl;

pub use denylist::TokenDenylist;
pub use progress::ProgressStore;
pub use ttl::TtlCache;
