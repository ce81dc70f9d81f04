//! Error types for the room layer.

use lanchat_protocol::RoomId;

/// Errors that can occur during matchmaking and room operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomError {
    /// The connection is already waiting in the matchmaking queue.
    #[error("already in the matchmaking queue")]
    AlreadyQueued,

    /// The connection is already a member of a match room.
    #[error("already in match room {0}")]
    AlreadyInRoom(RoomId),

    /// The connection is not a member of any room.
    #[error("not in a room")]
    NotInRoom,
}
