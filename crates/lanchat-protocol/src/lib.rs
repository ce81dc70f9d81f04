//! Wire protocol for the lanchat relay.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`CipherEnvelope`],
//!   the [`ClientId`]/[`RoomId`] newtypes) — the JSON objects that travel
//!   on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those objects are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong doing so.
//!
//! The protocol layer sits between transport (raw frames) and the relay
//! core (registry, rooms, security). It knows nothing about connections
//! or state, only shapes.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{CipherEnvelope, ClientId, ClientMessage, RoomId, ServerMessage};
