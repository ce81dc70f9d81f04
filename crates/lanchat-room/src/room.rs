//! The room record: a private pairing context for two matched clients.

use chrono::{DateTime, Utc};
use lanchat_protocol::{ClientId, RoomId};

/// A matchmaking room.
///
/// Created only by pairing two queued connections; destroyed the moment
/// its member list becomes empty. Holds at most two members, in join
/// order.
#[derive(Debug, Clone)]
pub struct Room {
    /// Counter-derived id; lower ids are older rooms.
    pub id: RoomId,
    /// Display name, e.g. "Match Room 3".
    pub name: String,
    /// Ordered member list (0–2 entries).
    pub members: Vec<ClientId>,
    /// When the pairing happened.
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Removes `client` from the member list. Idempotent.
    ///
    /// Returns `true` if the room is now empty (and should be deleted).
    pub(crate) fn remove_member(&mut self, client: ClientId) -> bool {
        self.members.retain(|m| *m != client);
        self.members.is_empty()
    }

    /// The room's creation time as an RFC 3339 wire string.
    pub fn created_at_rfc3339(&self) -> String {
        self.created_at.to_rfc3339()
    }
}
