//! Server error types.
//!
//! Wire-level and I/O errors are fatal to the connection that produced them;
//! handler-level business failures never appear here — they become SNAC
//! error replies and the connection continues.

use thiserror::Error;

use crate::store::StoreError;
use oscar_proto::WireError;

/// Errors that terminate a connection or prevent server startup.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Socket-level failure.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed frame or SNAC payload. Fatal for the connection that sent
    /// it; the server keeps serving other clients.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Feedbag store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// SNAC for a food group this endpoint does not route.
    #[error("no handler for food group {0:#06x}")]
    RouteNotFound(u16),

    /// Sign-on handshake did not produce a usable session.
    #[error("sign-on rejected: {0}")]
    SignonRejected(&'static str),

    /// No frame arrived within the read idle deadline.
    #[error("read idle deadline exceeded")]
    IdleTimeout,

    /// Invalid configuration; fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),
}
