//! Matchmaking and room state for the lanchat relay.
//!
//! This crate is a pure state machine: no I/O, no locks, no clocks
//! beyond timestamping room creation. Operations mutate the state and
//! return outcome values describing what the caller should announce.
//! That keeps every invariant testable without a network in sight.
//!
//! # Key types
//!
//! - [`RoomManager`] — the queue, the room table, and every transition
//! - [`MatchState`] — per-connection `Idle | Queued | InRoom` tag
//! - [`Room`] — a private two-party pairing context
//! - [`RoomError`] — rejected transitions

mod error;
mod manager;
mod room;

pub use error::RoomError;
pub use manager::{
    Disconnection, MatchState, PairedMatch, RoomDeparture, RoomInfoResult,
    RoomManager,
};
pub use room::Room;
