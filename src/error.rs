//! Error types for the SMTP client engine.

use std::io;

use thiserror::Error;

/// Errors that can occur while driving an SMTP session.
///
/// Two families: transport failures (connection refused, timeouts, TLS
/// trouble, a closed socket) and [`Error::Smtp`], which carries a reply code
/// the server actually sent. Server rejections are never retried here.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during network operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No configured port accepted a connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// An I/O operation exceeded the configured timeout.
    #[error("timed out during {0}")]
    Timeout(&'static str),

    /// TLS negotiation failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server closed the connection mid-session.
    #[error("connection closed unexpectedly")]
    ConnectionClosed,

    /// A server reply did not match the SMTP reply grammar.
    #[error("failed to parse SMTP reply: {0}")]
    Parse(String),

    /// UTF-8 decoding error on received data.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The mail is missing required envelope fields.
    #[error("invalid mail: {0}")]
    InvalidMail(String),

    /// The server rejected a protocol step with the given reply code.
    #[error("SMTP error {code}: {message}")]
    Smtp {
        /// Three-digit reply code sent by the server.
        code: u16,
        /// Step context plus the server's own text.
        message: String,
    },
}

/// Specialized `Result` type for SMTP session operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The reply code reported by the server, when the failure was
    /// server-side.
    #[must_use]
    pub const fn smtp_code(&self) -> Option<u16> {
        match self {
            Self::Smtp { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// `true` for failures of the transport itself rather than of the
    /// SMTP dialogue or the message being sent.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        !matches!(self, Self::Smtp { .. } | Self::InvalidMail(_))
    }
}
