//! Security layer: per-peer rate limiting, dangerous-input screening,
//! nickname sanitization, and HMAC integrity for encrypted payloads.
//!
//! Everything here is synchronous and side-effect free beyond its own
//! bookkeeping. The relay decides what a rejection means on the wire
//! (an error reply, a dropped frame, a connection close); this crate
//! only answers "is this allowed".

mod config;
mod error;
mod integrity;
mod rate;
mod validate;

pub use config::SecurityConfig;
pub use error::SecurityError;
pub use integrity::RoomKey;
pub use rate::RateLimiter;
pub use validate::{sanitize_nickname, scan_for_dangerous_input, Rejection};
