//! Transport abstraction layer for the lanchat relay.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract
//! over the underlying full-duplex connection. The relay core only ever
//! talks to these traits; the WebSocket implementation lives behind the
//! default `websocket` feature.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::net::SocketAddr;

use lanchat_protocol::ClientId;

/// WebSocket close code for policy violations (RFC 6455 §7.4.1).
/// Used when a client exceeds the rate limit.
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A single full-duplex connection that can send and receive frames.
///
/// Send and receive must not contend with each other: the relay
/// broadcasts to a connection from other clients' tasks while the
/// owning task sits in [`recv`](Connection::recv).
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends a frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection cleanly.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Closes the connection with an explicit close code and reason,
    /// e.g. [`CLOSE_POLICY_VIOLATION`] after a rate-limit rejection.
    async fn close_with_code(
        &self,
        code: u16,
        reason: &str,
    ) -> Result<(), Self::Error>;

    /// Returns the unique identifier assigned to this connection.
    fn id(&self) -> ClientId;

    /// Returns the remote peer's address. Rate limiting is keyed by
    /// the source IP.
    fn peer_addr(&self) -> SocketAddr;
}
