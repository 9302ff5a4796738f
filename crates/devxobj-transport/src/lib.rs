//! Command transport abstraction for firmware command interfaces.
//!
//! The command layer never opens devices itself. It talks to whatever
//! implements [`CommandTransport`]: an in-process firmware model, a device
//! driver binding, or a [`MailboxClient`] that forwards command buffers to a
//! remote endpoint over a Unix socket.
//!
//! The mailbox framing ([`mailbox`]) and the socket primitives ([`uds`],
//! [`MailboxServer`]) are what lets a command interface be hosted in one
//! process and driven from another.

pub mod error;
pub mod mailbox;
pub mod stream;
pub mod traits;

#[cfg(unix)]
pub mod client;
#[cfg(unix)]
pub mod server;
#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use mailbox::{Mailbox, MailboxConfig, MailboxKind, DEFAULT_MAX_PAYLOAD};
pub use stream::IpcStream;
pub use traits::CommandTransport;

#[cfg(unix)]
pub use client::MailboxClient;
#[cfg(unix)]
pub use server::{serve_connection, MailboxServer};
#[cfg(unix)]
pub use uds::UnixDomainSocket;
