//! Generic firmware object commands for channel objects.
//!
//! Builds CREATE / QUERY / DESTROY command buffers, classifies firmware
//! syndromes, and drives an [`ObjectHandle`] through its lifecycle over any
//! [`CommandTransport`](devxobj_transport::CommandTransport).
//!
//! ```no_run
//! use devxobj_object::{
//!     ChannelConfig, EmulatedFirmware, MemoryRegion, ObjectHandle, ObjectLifecycleManager,
//! };
//!
//! let firmware = EmulatedFirmware::new();
//! let manager = ObjectLifecycleManager::new();
//! let mut handle = ObjectHandle::new(MemoryRegion::new(0x1000, 0x1000, 0x55));
//!
//! let config = ChannelConfig::new(0x1000, 4096, 0x55).with_stride_index(1);
//! manager.create(&firmware, &mut handle, &config)?;
//! assert_eq!(manager.query(&firmware, &handle)?, config);
//! manager.destroy(&firmware, &mut handle)?;
//! # Ok::<(), devxobj_object::LifecycleError>(())
//! ```

pub mod body;
pub mod builder;
pub mod channel;
pub mod emulator;
pub mod error;
pub mod lifecycle;
pub mod region;
pub mod syndrome;

pub use body::ObjectBody;
pub use builder::{
    build_create, build_destroy, build_query, check_status, decode_input_header,
    parse_create_response, parse_destroy_response, parse_query_response, query_out_size,
    CommandBuffer, InputHeader, CREATE_OUT_SIZE, DESTROY_OUT_SIZE,
};
pub use channel::{ChannelConfig, FieldDiff};
pub use emulator::{EmulatedFirmware, EmulatorConfig};
pub use error::{CommandError, LifecycleError, Result, ValidationError};
pub use lifecycle::{HandleState, LifecycleConfig, ObjectHandle, ObjectLifecycleManager, Support};
pub use region::MemoryRegion;
pub use syndrome::{CommandStatus, Syndrome, SyndromeKind};
