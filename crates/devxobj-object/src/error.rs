use devxobj_transport::TransportError;
use devxobj_wire::EncodingError;

use crate::lifecycle::HandleState;
use crate::syndrome::Syndrome;

/// A configuration rejected before any command is submitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("queue size {size} outside 1..={max}")]
    QueueSizeOutOfRange { size: u32, max: u32 },

    #[error("queue address must not be zero")]
    ZeroQueueAddress,

    #[error("memory key must not be zero")]
    ZeroMemoryKey,

    #[error("protocol mode {0} is not supported (only mode 0)")]
    UnsupportedProtocolMode(u8),

    #[error("memory key {config:#x} does not match region key {region:#x}")]
    MemoryKeyMismatch { config: u32, region: u32 },

    #[error(
        "queue [{address:#x}, +{size}) lies outside region [{region_address:#x}, +{region_size})"
    )]
    QueueOutsideRegion {
        address: u64,
        size: u32,
        region_address: u64,
        region_size: u32,
    },

    #[error("region of {size} bytes is smaller than the {required} bytes needed")]
    RegionTooSmall { size: u32, required: u32 },

    #[error("memory region with key {0:#x} is already bound to a live object")]
    RegionInUse(u32),
}

/// Failure decoding a command response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The response buffer was short or a field could not be decoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Firmware reported a non-zero status.
    #[error("firmware rejected command: {0}")]
    Firmware(Syndrome),
}

/// Errors surfaced by lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid channel configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("firmware rejected command: {0}")]
    Firmware(Syndrome),

    /// The handle is not in a state that allows `operation`.
    #[error("cannot {operation} a handle in state {state}")]
    InvalidState {
        operation: &'static str,
        state: HandleState,
    },

    /// The handle's memory region was already released.
    #[error("memory region already released")]
    RegionReleased,
}

impl LifecycleError {
    /// The firmware syndrome, if firmware rejected the command.
    pub fn syndrome(&self) -> Option<&Syndrome> {
        match self {
            LifecycleError::Firmware(syndrome) => Some(syndrome),
            _ => None,
        }
    }
}

impl From<CommandError> for LifecycleError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Encoding(err) => LifecycleError::Encoding(err),
            CommandError::Firmware(syndrome) => LifecycleError::Firmware(syndrome),
        }
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
