//! Client identity for the lanchat relay.
//!
//! This crate answers "who is this connection":
//!
//! 1. **Display names** — the [`NicknameDirectory`] maps connection ↔
//!    nickname and enforces uniqueness (no two live connections share a
//!    name).
//! 2. **Sessions** — the [`SessionManager`] tracks an id per named
//!    connection with a fixed timeout, checked lazily on access.
//!
//! # How it fits in the stack
//!
//! ```text
//! Relay core (above)  ← asks "does this connection have a name yet?"
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Protocol layer (below)  ← provides ClientId
//! ```

mod directory;
mod error;
mod manager;
mod session;

pub use directory::{NicknameChange, NicknameDirectory};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig};
