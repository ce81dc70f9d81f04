//! Session types: the server's record of a named client.

use std::time::Instant;

use lanchat_protocol::ClientId;

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a session stays valid after creation.
    /// Expiry is checked lazily on access, not by a background timer.
    ///
    /// Default: 3600 seconds (one hour).
    pub session_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: 3600,
        }
    }
}

/// A single client's session, created when the client claims a nickname.
///
/// `Instant` is the monotonic clock, unaffected by system clock
/// changes, which matters for expiry checks.
#[derive(Debug, Clone)]
pub struct Session {
    /// Random hex id, the session's handle.
    pub id: String,
    /// The connection this session belongs to.
    pub owner: ClientId,
    /// The nickname held when the session was created.
    pub nickname: String,
    /// When the session was created; expiry is measured from here.
    pub created_at: Instant,
    /// Updated on every successful validation.
    pub last_activity: Instant,
}
