//! `RelayServer` builder and accept loop.
//!
//! This is the entry point for running a lanchat relay. It ties
//! together all the layers: transport → protocol → session → room →
//! security.

use std::sync::Arc;

use lanchat_protocol::JsonCodec;
use lanchat_room::RoomManager;
use lanchat_security::{RateLimiter, RoomKey, SecurityConfig};
use lanchat_session::{NicknameDirectory, SessionConfig, SessionManager};
use lanchat_transport::{Transport, WebSocketConnection, WebSocketTransport};
use tokio::sync::Mutex;

use crate::LanchatError;
use crate::handler::handle_connection;
use crate::registry::ConnectionRegistry;

/// Feature toggles for a relay instance.
///
/// Disabling a capability makes its message types fall through the
/// router's unknown-type path (silently ignored), so one binary can run
/// as a plain chat relay, a matchmaking server, or the full stack.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    /// Matchmaking queue, match rooms, and room-scoped chat.
    pub matchmaking: bool,
    /// Opaque encrypted-envelope relay (with optional HMAC check).
    pub encrypted_relay: bool,
    /// Voice presence fan-out and WebRTC signaling relay.
    pub voice_signaling: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            matchmaking: true,
            encrypted_relay: true,
            voice_signaling: true,
        }
    }
}

impl Capabilities {
    /// Whether the given wire `type` is handled under these toggles.
    pub(crate) fn allows(&self, type_name: &str) -> bool {
        match type_name {
            "join_matchmaking" | "leave_matchmaking" | "leave_room"
            | "room_message" | "get_room_info" => self.matchmaking,
            "voice_join" | "voice_leave" | "voice_offer" | "voice_answer"
            | "voice_ice_candidate" => self.voice_signaling,
            _ => true,
        }
    }
}

/// All mutable relay state, guarded by a single lock.
///
/// Every inbound frame is processed to completion while holding this,
/// so multi-step transitions (pairing, disconnect cascades) are atomic
/// with respect to every other connection's traffic.
pub(crate) struct RelayContext {
    pub(crate) registry: ConnectionRegistry<WebSocketConnection>,
    pub(crate) nicknames: NicknameDirectory,
    pub(crate) sessions: SessionManager,
    pub(crate) rooms: RoomManager,
    pub(crate) limiter: RateLimiter,
    /// Integrity key for encrypted envelopes, created on first use.
    /// Server-side only.
    pub(crate) room_key: Option<RoomKey>,
}

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState {
    pub(crate) ctx: Mutex<RelayContext>,
    pub(crate) codec: JsonCodec,
    pub(crate) security: SecurityConfig,
    pub(crate) capabilities: Capabilities,
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,ignore
/// let server = RelayServer::builder()
///     .bind("0.0.0.0:8765")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct RelayServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    security_config: SecurityConfig,
    capabilities: Capabilities,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8765".to_string(),
            session_config: SessionConfig::default(),
            security_config: SecurityConfig::default(),
            capabilities: Capabilities::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the security limits (rate window, frame ceiling, nickname
    /// length).
    pub fn security_config(mut self, config: SecurityConfig) -> Self {
        self.security_config = config;
        self
    }

    /// Sets which feature sets this instance serves.
    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Builds the server, binding the WebSocket listener.
    pub async fn build(self) -> Result<RelayServer, LanchatError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let limiter = RateLimiter::new(&self.security_config);
        let state = Arc::new(ServerState {
            ctx: Mutex::new(RelayContext {
                registry: ConnectionRegistry::new(),
                nicknames: NicknameDirectory::new(),
                sessions: SessionManager::new(self.session_config),
                rooms: RoomManager::new(),
                limiter,
                room_key: None,
            }),
            codec: JsonCodec,
            security: self.security_config,
            capabilities: self.capabilities,
        });

        Ok(RelayServer { transport, state })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl RelayServer {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), LanchatError> {
        tracing::info!("lanchat relay running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
