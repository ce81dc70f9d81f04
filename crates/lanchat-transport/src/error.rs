//! Transport-level errors.

/// Errors reported by the transport layer.
///
/// Any send or receive failure condemns that connection: the broadcast
/// path evicts the target and the handler loop exits. Clean closes are
/// not errors; [`Connection::recv`](crate::Connection::recv) reports
/// those as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Sending a frame to the peer failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving a frame from the peer failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener or accepting an incoming connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}
