//! Room manager: the matchmaking queue and room table.
//!
//! Every connection is in exactly one [`MatchState`] at a time; the
//! queue and the room table are never consulted to infer it. That makes
//! "queued and roomed simultaneously" unrepresentable rather than
//! merely forbidden.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use lanchat_protocol::{ClientId, RoomId};

use crate::{Room, RoomError};

/// A connection's position in the matchmaking lifecycle.
///
/// Transitions form a loop: `Idle → Queued → InRoom → Idle`, driven
/// only by [`RoomManager`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchState {
    /// Not queued, not in a room.
    #[default]
    Idle,
    /// Waiting in the matchmaking queue.
    Queued,
    /// Member of the given room.
    InRoom(RoomId),
}

/// The outcome of a successful pairing: two dequeued clients and their
/// freshly created room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedMatch {
    pub room_id: RoomId,
    pub room_name: String,
    /// The two participants, oldest queue entry first.
    pub members: [ClientId; 2],
}

/// The outcome of a client leaving (or being evicted from) a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDeparture {
    pub room_id: RoomId,
    /// Members still in the room after the departure.
    pub remaining: Vec<ClientId>,
    /// `true` if the member list became empty and the room was deleted.
    pub deleted: bool,
}

/// Reply material for a `get_room_info` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomInfoResult {
    /// Not mapped to a room. This includes the stale-mapping case, which
    /// is cleared as a side effect of asking.
    NotInRoom,
    /// Currently in a live room.
    InRoom {
        room_id: RoomId,
        room_name: String,
        members: Vec<ClientId>,
        created_at: String,
    },
}

/// What disconnect cleanup actually did for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disconnection {
    /// The connection was neither queued nor roomed.
    Idle,
    /// Removed from the queue; positions need re-announcing.
    FromQueue,
    /// Left its room; the departure says who remains.
    FromRoom(RoomDeparture),
}

/// Manages the matchmaking queue, all active rooms, and each
/// connection's [`MatchState`].
#[derive(Debug, Default)]
pub struct RoomManager {
    /// FIFO wait-list. Front is the oldest entry.
    queue: VecDeque<ClientId>,

    /// Active rooms, keyed by room id.
    rooms: HashMap<RoomId, Room>,

    /// Explicit per-connection state. Absence means `Idle`.
    states: HashMap<ClientId, MatchState>,

    /// Monotonic room id source. Never reused, so room ids order rooms
    /// by creation.
    room_counter: u64,
}

impl RoomManager {
    /// Creates a new, empty room manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// The connection's current state.
    pub fn state(&self, client: ClientId) -> MatchState {
        self.states.get(&client).copied().unwrap_or_default()
    }

    /// Appends `client` to the queue tail.
    ///
    /// Returns the 1-indexed queue position. The caller should follow
    /// up with [`pair_next`](Self::pair_next) until it returns `None`.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyQueued`] if already waiting
    /// - [`RoomError::AlreadyInRoom`] if currently roomed
    pub fn join_queue(&mut self, client: ClientId) -> Result<usize, RoomError> {
        match self.state(client) {
            MatchState::Queued => return Err(RoomError::AlreadyQueued),
            MatchState::InRoom(room_id) => {
                return Err(RoomError::AlreadyInRoom(room_id));
            }
            MatchState::Idle => {}
        }

        self.queue.push_back(client);
        self.states.insert(client, MatchState::Queued);
        let position = self.queue.len();
        tracing::info!(%client, position, "joined matchmaking queue");
        Ok(position)
    }

    /// Pairs the two oldest queued connections, if the queue holds at
    /// least two. Strict FIFO, no skipping.
    ///
    /// Call in a loop after every [`join_queue`](Self::join_queue); each
    /// call creates at most one room.
    pub fn pair_next(&mut self) -> Option<PairedMatch> {
        if self.queue.len() < 2 {
            return None;
        }

        // Queue length was just checked; both pops succeed.
        let first = self.queue.pop_front()?;
        let second = self.queue.pop_front()?;

        self.room_counter += 1;
        let room_id = RoomId(self.room_counter);
        let room_name = format!("Match Room {}", self.room_counter);

        self.rooms.insert(
            room_id,
            Room {
                id: room_id,
                name: room_name.clone(),
                members: vec![first, second],
                created_at: Utc::now(),
            },
        );
        self.states.insert(first, MatchState::InRoom(room_id));
        self.states.insert(second, MatchState::InRoom(room_id));

        tracing::info!(%room_id, %first, %second, "match created");
        Some(PairedMatch {
            room_id,
            room_name,
            members: [first, second],
        })
    }

    /// Removes `client` from the queue if present (`Queued → Idle`).
    ///
    /// Returns `true` if the client was actually queued. Idempotent.
    pub fn leave_queue(&mut self, client: ClientId) -> bool {
        if self.state(client) != MatchState::Queued {
            return false;
        }
        self.queue.retain(|c| *c != client);
        self.states.insert(client, MatchState::Idle);
        tracing::info!(%client, remaining = self.queue.len(), "left matchmaking queue");
        true
    }

    /// Current 1-indexed positions for every queued connection, oldest
    /// first, paired with the queue's total length.
    pub fn queue_positions(&self) -> Vec<(ClientId, usize, usize)> {
        let total = self.queue.len();
        self.queue
            .iter()
            .enumerate()
            .map(|(i, c)| (*c, i + 1, total))
            .collect()
    }

    /// Removes `client` from its room (`InRoom → Idle`), deleting the
    /// room if it becomes empty. The conn→room mapping is cleared
    /// unconditionally, even if the room record had already vanished.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`] if the client isn't mapped to a room.
    pub fn leave_room(
        &mut self,
        client: ClientId,
    ) -> Result<RoomDeparture, RoomError> {
        let MatchState::InRoom(room_id) = self.state(client) else {
            return Err(RoomError::NotInRoom);
        };

        self.states.insert(client, MatchState::Idle);

        let Some(room) = self.rooms.get_mut(&room_id) else {
            // Stale mapping; nothing to notify, nothing to delete.
            return Ok(RoomDeparture {
                room_id,
                remaining: Vec::new(),
                deleted: false,
            });
        };

        let empty = room.remove_member(client);
        let remaining = room.members.clone();
        if empty {
            self.rooms.remove(&room_id);
            tracing::info!(%room_id, "room deleted (empty)");
        }

        tracing::info!(%client, %room_id, "left room");
        Ok(RoomDeparture {
            room_id,
            remaining,
            deleted: empty,
        })
    }

    /// The room `client` is mapped to, if that room still exists.
    pub fn room_of(&self, client: ClientId) -> Option<&Room> {
        match self.state(client) {
            MatchState::InRoom(room_id) => self.rooms.get(&room_id),
            _ => None,
        }
    }

    /// Reply material for `get_room_info`. A mapping to a room that no
    /// longer exists is cleared here, as a side effect.
    pub fn room_info(&mut self, client: ClientId) -> RoomInfoResult {
        let MatchState::InRoom(room_id) = self.state(client) else {
            return RoomInfoResult::NotInRoom;
        };

        match self.rooms.get(&room_id) {
            Some(room) => RoomInfoResult::InRoom {
                room_id: room.id,
                room_name: room.name.clone(),
                members: room.members.clone(),
                created_at: room.created_at_rfc3339(),
            },
            None => {
                self.states.insert(client, MatchState::Idle);
                RoomInfoResult::NotInRoom
            }
        }
    }

    /// Disconnect cleanup: equivalent to `leave_queue` or `leave_room`,
    /// whichever state applies.
    pub fn disconnect(&mut self, client: ClientId) -> Disconnection {
        let result = match self.state(client) {
            MatchState::Idle => Disconnection::Idle,
            MatchState::Queued => {
                self.leave_queue(client);
                Disconnection::FromQueue
            }
            MatchState::InRoom(_) => match self.leave_room(client) {
                Ok(departure) => Disconnection::FromRoom(departure),
                Err(_) => Disconnection::Idle,
            },
        };
        self.states.remove(&client);
        result
    }

    /// Number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of queued connections.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

// =========================================================================
// Tests
// =========================================================================
