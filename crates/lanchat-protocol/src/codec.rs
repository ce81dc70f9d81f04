//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The relay doesn't care HOW frames are serialized; it just needs
//! something implementing [`Codec`]. We ship [`JsonCodec`] (the wire
//! format the browser client speaks); a binary codec could be swapped in
//! without touching any other layer.
//!
//! All outbound frames go through [`Codec::encode`]. The inbound path
//! parses to a raw `serde_json::Value` first (the security scan and the
//! voice relay need the untyped frame), so [`Codec::decode`] serves the
//! typed round-trip at the seams and in tests rather than the hot path.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust types to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because a codec is shared across every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] using JSON via `serde_json`.
///
/// Human-readable, inspectable in browser DevTools, and what the
/// original LAN chat clients expect. Behind the default `json` feature.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
