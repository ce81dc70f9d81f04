//! # Lanchat
//!
//! A secure real-time message relay for LAN chat: nicknames, global
//! and room chat, FIFO matchmaking into two-party rooms, opaque
//! encrypted-payload relay, and WebRTC voice signaling.
//!
//! The relay never decrypts client payloads; its job is gating
//! (rate limits, input screening, integrity checks) and routing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lanchat::RelayServer;
//!
//! # async fn run() -> Result<(), lanchat::LanchatError> {
//! let server = RelayServer::builder()
//!     .bind("0.0.0.0:8765")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod broadcast;
mod error;
mod handler;
mod registry;
mod server;

pub use error::LanchatError;
pub use registry::ConnectionRegistry;
pub use server::{Capabilities, RelayServer, RelayServerBuilder};

pub use lanchat_security::SecurityConfig;
pub use lanchat_session::SessionConfig;
