//! Unified error type for the lanchat relay.

use lanchat_protocol::ProtocolError;
use lanchat_room::RoomError;
use lanchat_security::SecurityError;
use lanchat_session::SessionError;
use lanchat_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `lanchat` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LanchatError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (nickname, expiry).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (queue state, membership).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A security-level error (integrity, malformed signature).
    #[error(transparent)]
    Security(#[from] SecurityError),
}
