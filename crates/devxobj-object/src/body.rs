use devxobj_wire::Layout;

use crate::error::ValidationError;
use crate::lifecycle::LifecycleConfig;
use crate::region::MemoryRegion;

/// An object-specific command body.
///
/// Ties a typed configuration to the object type tag and the layout that
/// encodes it, so the builder never picks a layout by guessing.
pub trait ObjectBody: Sized {
    /// Object type written into the generic header.
    const OBJ_TYPE: u16;

    /// Body layout following the header on CREATE input and QUERY output.
    const LAYOUT: Layout;

    /// Write the body into a zeroed buffer of `LAYOUT.size()` bytes.
    fn encode(&self, body: &mut [u8]) -> devxobj_wire::Result<()>;

    /// Read a body of exactly `LAYOUT.size()` bytes.
    fn decode(body: &[u8]) -> devxobj_wire::Result<Self>;

    /// Local checks run before CREATE is submitted.
    fn validate(&self, policy: &LifecycleConfig) -> Result<(), ValidationError>;

    /// Checks against the memory region the object will be bound to.
    fn check_region(&self, _region: &MemoryRegion) -> Result<(), ValidationError> {
        Ok(())
    }
}
