/// A registered host memory range the device may access, identified by its
/// memory key.
///
/// Not `Clone`: a region descriptor is moved into the [`ObjectHandle`] that
/// uses it, so one descriptor can back at most one live object.
///
/// [`ObjectHandle`]: crate::lifecycle::ObjectHandle
#[derive(Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    address: u64,
    size: u32,
    key: u32,
}

impl MemoryRegion {
    pub fn new(address: u64, size: u32, key: u32) -> Self {
        Self { address, size, key }
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn key(&self) -> u32 {
        self.key
    }

    /// Whether `[address, address + len)` lies inside this region.
    pub fn contains(&self, address: u64, len: u32) -> bool {
        let start = u128::from(self.address);
        let end = start + u128::from(self.size);
        let queue_start = u128::from(address);
        queue_start >= start && queue_start + u128::from(len) <= end
    }
}
