//! Firmware channel objects driven through generic-object commands.
//!
//! # Crate Structure
//!
//! - [`wire`]: bit-exact field codec, command headers and the channel body
//! - [`transport`]: the `CommandTransport` seam and the socket mailbox
//! - [`object`]: command builders, syndrome classification, lifecycle
//!   manager and emulated firmware

/// Re-export wire types.
pub mod wire {
    pub use devxobj_wire::*;
}

/// Re-export transport types.
pub mod transport {
    pub use devxobj_transport::*;
}

/// Re-export object types.
pub mod object {
    pub use devxobj_object::*;
}

pub use devxobj_object::{
    ChannelConfig, EmulatedFirmware, LifecycleError, MemoryRegion, ObjectHandle,
    ObjectLifecycleManager,
};
pub use devxobj_transport::CommandTransport;
