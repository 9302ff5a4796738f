use std::sync::Arc;

use crate::error::Result;

/// A synchronous firmware command interface.
///
/// `submit` sends one complete input command buffer and blocks until the
/// interface returns the output buffer, which must not exceed `out_capacity`
/// bytes. Implementations decide their own timeouts; callers never retry.
///
/// Implementations that are `Sync` may be shared between threads: the
/// command layer issues independent submissions for independent objects and
/// relies on the transport for any serialization it needs.
pub trait CommandTransport {
    /// Submit one command and return the raw output buffer.
    fn submit(&self, input: &[u8], out_capacity: usize) -> Result<Vec<u8>>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str {
        "command-transport"
    }
}

impl<T: CommandTransport + ?Sized> CommandTransport for &T {
    fn submit(&self, input: &[u8], out_capacity: usize) -> Result<Vec<u8>> {
        (**self).submit(input, out_capacity)
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}

impl<T: CommandTransport + ?Sized> CommandTransport for Box<T> {
    fn submit(&self, input: &[u8], out_capacity: usize) -> Result<Vec<u8>> {
        (**self).submit(input, out_capacity)
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}

impl<T: CommandTransport + ?Sized> CommandTransport for Arc<T> {
    fn submit(&self, input: &[u8], out_capacity: usize) -> Result<Vec<u8>> {
        (**self).submit(input, out_capacity)
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}
