//! Error types for the security layer.

/// Errors produced by security checks.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    /// An encrypted payload's signature did not match.
    #[error("message integrity check failed")]
    IntegrityFailure,

    /// A signature or payload field could not be decoded.
    #[error("malformed signature: {0}")]
    MalformedSignature(#[from] base64::DecodeError),

    /// The payload could not be serialized for signing.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
