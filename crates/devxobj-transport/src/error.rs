use std::path::PathBuf;

/// Errors that can occur while submitting commands.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// A mailbox frame did not start with the expected magic.
    #[error("invalid mailbox magic (expected 0x4657 \"FW\")")]
    InvalidMagic,

    /// A mailbox frame carried a kind this side does not understand.
    #[error("unexpected mailbox frame kind {0:#04x}")]
    UnexpectedKind(u8),

    /// A mailbox payload exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The command interface produced more output than the caller allowed.
    #[error("response of {size} bytes exceeds output capacity {capacity}")]
    ResponseTooLarge { size: usize, capacity: usize },

    /// The remote endpoint could not execute the command.
    #[error("remote command interface failed: {0}")]
    Remote(String),

    /// The connection was closed before a complete frame was exchanged.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// The transport has been shut down.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
