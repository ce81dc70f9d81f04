//! Error types for the session layer.

/// Errors from the nickname directory and session manager.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Another live connection already holds exactly this name.
    #[error("nickname {0:?} already taken")]
    NicknameTaken(String),

    /// No session exists for the given id.
    #[error("session not found")]
    SessionNotFound,

    /// The session's timeout elapsed; it has been purged.
    #[error("session expired")]
    SessionExpired,
}
