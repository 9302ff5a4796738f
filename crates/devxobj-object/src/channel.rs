use devxobj_wire::bitfield::{get, get_u16, get_u32, get_u8, set, set_u16, set_u32, set_u8};
use devxobj_wire::channel::{BODY, Q_ADDR, Q_MKEY, Q_PROTOCOL_MODE, Q_SIZE, STRIDE_INDEX};
use devxobj_wire::{Layout, OBJ_TYPE_TLP_EMU_CHANNEL};
use serde::{Deserialize, Serialize};

use crate::body::ObjectBody;
use crate::error::ValidationError;
use crate::lifecycle::LifecycleConfig;
use crate::region::MemoryRegion;

/// Configuration of a channel object.
///
/// Serialized with serde so it can be loaded from JSON files:
///
/// ```json
/// { "queue_address": 4096, "queue_size": 4096, "memory_key": 1 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    #[serde(default)]
    pub protocol_mode: u8,
    pub queue_size: u32,
    pub queue_address: u64,
    pub memory_key: u32,
    #[serde(default)]
    pub stride_index: u16,
}

/// One field whose value differs between two configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: &'static str,
    pub expected: u64,
    pub actual: u64,
}

impl ChannelConfig {
    /// The only protocol mode current firmware accepts.
    pub const SUPPORTED_PROTOCOL_MODE: u8 = 0;

    /// Largest queue firmware accepts, in bytes.
    pub const MAX_QUEUE_SIZE: u32 = 64 * 1024;

    /// Mode 0, stride 0.
    pub fn new(queue_address: u64, queue_size: u32, memory_key: u32) -> Self {
        Self {
            protocol_mode: Self::SUPPORTED_PROTOCOL_MODE,
            queue_size,
            queue_address,
            memory_key,
            stride_index: 0,
        }
    }

    pub fn with_protocol_mode(mut self, protocol_mode: u8) -> Self {
        self.protocol_mode = protocol_mode;
        self
    }

    pub fn with_stride_index(mut self, stride_index: u16) -> Self {
        self.stride_index = stride_index;
        self
    }

    /// Fields whose values differ from `actual`, in layout order.
    pub fn diff(&self, actual: &ChannelConfig) -> Vec<FieldDiff> {
        self.fields()
            .into_iter()
            .zip(actual.fields())
            .filter(|((_, expected), (_, actual))| expected != actual)
            .map(|((field, expected), (_, actual))| FieldDiff {
                field,
                expected,
                actual,
            })
            .collect()
    }

    fn fields(&self) -> [(&'static str, u64); 5] {
        [
            (Q_PROTOCOL_MODE.name(), u64::from(self.protocol_mode)),
            (Q_MKEY.name(), u64::from(self.memory_key)),
            (Q_SIZE.name(), u64::from(self.queue_size)),
            (Q_ADDR.name(), self.queue_address),
            (STRIDE_INDEX.name(), u64::from(self.stride_index)),
        ]
    }
}

impl ObjectBody for ChannelConfig {
    const OBJ_TYPE: u16 = OBJ_TYPE_TLP_EMU_CHANNEL;
    const LAYOUT: Layout = BODY;

    fn encode(&self, body: &mut [u8]) -> devxobj_wire::Result<()> {
        BODY.check_len(body.len())?;
        set_u8(body, &Q_PROTOCOL_MODE, self.protocol_mode)?;
        set_u32(body, &Q_MKEY, self.memory_key)?;
        set_u32(body, &Q_SIZE, self.queue_size)?;
        set(body, &Q_ADDR, self.queue_address)?;
        set_u16(body, &STRIDE_INDEX, self.stride_index)
    }

    fn decode(body: &[u8]) -> devxobj_wire::Result<Self> {
        BODY.check_len(body.len())?;
        Ok(Self {
            protocol_mode: get_u8(body, &Q_PROTOCOL_MODE)?,
            queue_size: get_u32(body, &Q_SIZE)?,
            queue_address: get(body, &Q_ADDR)?,
            memory_key: get_u32(body, &Q_MKEY)?,
            stride_index: get_u16(body, &STRIDE_INDEX)?,
        })
    }

    fn validate(&self, policy: &LifecycleConfig) -> Result<(), ValidationError> {
        if policy.strict_protocol_mode && self.protocol_mode != Self::SUPPORTED_PROTOCOL_MODE {
            return Err(ValidationError::UnsupportedProtocolMode(self.protocol_mode));
        }
        let max = policy.max_queue_size.min(Self::MAX_QUEUE_SIZE);
        if self.queue_size == 0 || self.queue_size > max {
            return Err(ValidationError::QueueSizeOutOfRange {
                size: self.queue_size,
                max,
            });
        }
        if self.queue_address == 0 {
            return Err(ValidationError::ZeroQueueAddress);
        }
        if self.memory_key == 0 {
            return Err(ValidationError::ZeroMemoryKey);
        }
        Ok(())
    }

    fn check_region(&self, region: &MemoryRegion) -> Result<(), ValidationError> {
        if self.memory_key != region.key() {
            return Err(ValidationError::MemoryKeyMismatch {
                config: self.memory_key,
                region: region.key(),
            });
        }
        if !region.contains(self.queue_address, self.queue_size) {
            return Err(ValidationError::QueueOutsideRegion {
                address: self.queue_address,
                size: self.queue_size,
                region_address: region.address(),
                region_size: region.size(),
            });
        }
        Ok(())
    }
}
