use std::fmt;

use serde::Serialize;

/// Firmware syndrome codes with a documented meaning.
pub mod code {
    pub const INVALID_PROTOCOL_MODE: u32 = 0x00E1_E101;
    pub const INVALID_QUEUE_SIZE: u32 = 0x00E1_E102;
    pub const INVALID_QUEUE_ADDRESS: u32 = 0x00E1_E103;
    pub const RESOURCE_ALLOCATION_FAILED: u32 = 0x00E1_E104;
    pub const INVALID_OBJECT_ID: u32 = 0x00E1_E105;
    pub const ADDRESS_TRANSLATION_FAILED: u32 = 0x00E1_E108;
    pub const INVALID_MEMORY_KEY: u32 = 0x00E1_E109;
    pub const OBJECT_TYPE_UNSUPPORTED: u32 = 0x0035_90F5;
}

/// What a firmware syndrome means.
///
/// Only codes in the fixed table are given a meaning; everything else is
/// [`SyndromeKind::Unknown`] and keeps its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyndromeKind {
    InvalidProtocolMode,
    InvalidQueueSize,
    InvalidQueueAddress,
    ResourceAllocationFailed,
    AddressTranslationFailed,
    InvalidMemoryKey,
    ObjectTypeUnsupported,
    InvalidObjectId,
    Unknown(u32),
}

const TABLE: [(u32, SyndromeKind); 8] = [
    (code::INVALID_PROTOCOL_MODE, SyndromeKind::InvalidProtocolMode),
    (code::INVALID_QUEUE_SIZE, SyndromeKind::InvalidQueueSize),
    (code::INVALID_QUEUE_ADDRESS, SyndromeKind::InvalidQueueAddress),
    (code::RESOURCE_ALLOCATION_FAILED, SyndromeKind::ResourceAllocationFailed),
    (code::INVALID_OBJECT_ID, SyndromeKind::InvalidObjectId),
    (code::ADDRESS_TRANSLATION_FAILED, SyndromeKind::AddressTranslationFailed),
    (code::INVALID_MEMORY_KEY, SyndromeKind::InvalidMemoryKey),
    (code::OBJECT_TYPE_UNSUPPORTED, SyndromeKind::ObjectTypeUnsupported),
];

impl SyndromeKind {
    /// Classify a raw syndrome code.
    pub fn classify(raw_code: u32) -> Self {
        TABLE
            .iter()
            .find(|(code, _)| *code == raw_code)
            .map(|(_, kind)| *kind)
            .unwrap_or(SyndromeKind::Unknown(raw_code))
    }

    /// The raw code this kind stands for.
    pub fn code(self) -> u32 {
        match self {
            SyndromeKind::Unknown(raw) => raw,
            known => TABLE
                .iter()
                .find(|(_, kind)| *kind == known)
                .map(|(code, _)| *code)
                .unwrap_or_default(),
        }
    }

    /// Stable identifier, suitable for logs and machine output.
    pub fn as_str(self) -> &'static str {
        match self {
            SyndromeKind::InvalidProtocolMode => "invalid_protocol_mode",
            SyndromeKind::InvalidQueueSize => "invalid_queue_size",
            SyndromeKind::InvalidQueueAddress => "invalid_queue_address",
            SyndromeKind::ResourceAllocationFailed => "resource_allocation_failed",
            SyndromeKind::AddressTranslationFailed => "address_translation_failed",
            SyndromeKind::InvalidMemoryKey => "invalid_memory_key",
            SyndromeKind::ObjectTypeUnsupported => "object_type_unsupported",
            SyndromeKind::InvalidObjectId => "invalid_object_id",
            SyndromeKind::Unknown(_) => "unknown",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SyndromeKind::InvalidProtocolMode => "invalid protocol mode (only mode 0 is supported)",
            SyndromeKind::InvalidQueueSize => "invalid queue size (must be between 1 and 64KB)",
            SyndromeKind::InvalidQueueAddress => "invalid queue address (cannot be zero)",
            SyndromeKind::ResourceAllocationFailed => "failed to allocate object resource",
            SyndromeKind::AddressTranslationFailed => {
                "VA to PA translation failed (check memory key validity)"
            }
            SyndromeKind::InvalidMemoryKey => "invalid memory key (cannot be zero)",
            SyndromeKind::ObjectTypeUnsupported => "object type not supported by firmware",
            SyndromeKind::InvalidObjectId => "invalid object id",
            SyndromeKind::Unknown(_) => "undocumented syndrome",
        }
    }

    /// Likely reasons, for kinds where firmware configuration is the usual
    /// culprit.
    pub fn probable_causes(self) -> &'static [&'static str] {
        match self {
            SyndromeKind::ObjectTypeUnsupported => &[
                "firmware does not include channel object support",
                "object type 0x59 not registered in firmware",
                "firmware configuration missing generic emulation",
            ],
            SyndromeKind::Unknown(_) => &[
                "firmware version mismatch",
                "missing firmware features or configuration",
                "device capability limitations",
            ],
            _ => &[],
        }
    }
}

impl fmt::Display for SyndromeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command status byte from the output header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Ok,
    InternalError,
    BadOp,
    BadParam,
    BadSysState,
    BadResource,
    ResourceBusy,
    ExceedLimit,
    BadResState,
    BadIndex,
    NoResources,
    BadInputLen,
    BadOutputLen,
    Other(u8),
}

impl CommandStatus {
    pub const OK: u8 = 0x00;
    pub const INTERNAL_ERR: u8 = 0x01;
    pub const BAD_OP: u8 = 0x02;
    pub const BAD_PARAM: u8 = 0x03;
    pub const BAD_SYS_STATE: u8 = 0x04;
    pub const BAD_RESOURCE: u8 = 0x05;
    pub const RESOURCE_BUSY: u8 = 0x06;
    pub const EXCEED_LIM: u8 = 0x08;
    pub const BAD_RES_STATE: u8 = 0x09;
    pub const BAD_INDEX: u8 = 0x0a;
    pub const NO_RESOURCES: u8 = 0x0f;
    pub const BAD_INPUT_LEN: u8 = 0x50;
    pub const BAD_OUTPUT_LEN: u8 = 0x51;

    pub fn from_byte(status: u8) -> Self {
        match status {
            Self::OK => CommandStatus::Ok,
            Self::INTERNAL_ERR => CommandStatus::InternalError,
            Self::BAD_OP => CommandStatus::BadOp,
            Self::BAD_PARAM => CommandStatus::BadParam,
            Self::BAD_SYS_STATE => CommandStatus::BadSysState,
            Self::BAD_RESOURCE => CommandStatus::BadResource,
            Self::RESOURCE_BUSY => CommandStatus::ResourceBusy,
            Self::EXCEED_LIM => CommandStatus::ExceedLimit,
            Self::BAD_RES_STATE => CommandStatus::BadResState,
            Self::BAD_INDEX => CommandStatus::BadIndex,
            Self::NO_RESOURCES => CommandStatus::NoResources,
            Self::BAD_INPUT_LEN => CommandStatus::BadInputLen,
            Self::BAD_OUTPUT_LEN => CommandStatus::BadOutputLen,
            other => CommandStatus::Other(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            CommandStatus::Ok => Self::OK,
            CommandStatus::InternalError => Self::INTERNAL_ERR,
            CommandStatus::BadOp => Self::BAD_OP,
            CommandStatus::BadParam => Self::BAD_PARAM,
            CommandStatus::BadSysState => Self::BAD_SYS_STATE,
            CommandStatus::BadResource => Self::BAD_RESOURCE,
            CommandStatus::ResourceBusy => Self::RESOURCE_BUSY,
            CommandStatus::ExceedLimit => Self::EXCEED_LIM,
            CommandStatus::BadResState => Self::BAD_RES_STATE,
            CommandStatus::BadIndex => Self::BAD_INDEX,
            CommandStatus::NoResources => Self::NO_RESOURCES,
            CommandStatus::BadInputLen => Self::BAD_INPUT_LEN,
            CommandStatus::BadOutputLen => Self::BAD_OUTPUT_LEN,
            CommandStatus::Other(byte) => byte,
        }
    }
}

/// A classified firmware rejection, decoded from a failed output header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Syndrome {
    pub raw_code: u32,
    pub category: SyndromeKind,
    pub status: CommandStatus,
}

impl Syndrome {
    pub fn new(status: u8, raw_code: u32) -> Self {
        Self {
            raw_code,
            category: SyndromeKind::classify(raw_code),
            status: CommandStatus::from_byte(status),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self.category, SyndromeKind::Unknown(_))
    }
}

impl fmt::Display for Syndrome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (syndrome {:#x}, status {:?}): {}",
            self.category,
            self.raw_code,
            self.status,
            self.category.description()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_codes_classify() {
        let cases = [
            (0xE1E101, SyndromeKind::InvalidProtocolMode),
            (0xE1E102, SyndromeKind::InvalidQueueSize),
            (0xE1E103, SyndromeKind::InvalidQueueAddress),
            (0xE1E104, SyndromeKind::ResourceAllocationFailed),
            (0xE1E105, SyndromeKind::InvalidObjectId),
            (0xE1E108, SyndromeKind::AddressTranslationFailed),
            (0xE1E109, SyndromeKind::InvalidMemoryKey),
            (0x3590F5, SyndromeKind::ObjectTypeUnsupported),
        ];
        for (raw, kind) in cases {
            assert_eq!(SyndromeKind::classify(raw), kind, "{raw:#x}");
            assert_eq!(kind.code(), raw);
        }
    }

    #[test]
    fn undocumented_codes_keep_raw_value() {
        for raw in [0, 0xE1E106, 0xE1E107, 0xE1E10A, 0xFFFF_FFFF] {
            let kind = SyndromeKind::classify(raw);
            assert_eq!(kind, SyndromeKind::Unknown(raw));
            assert_eq!(kind.code(), raw);
        }
    }

    #[test]
    fn display_carries_category_and_raw_code() {
        let syndrome = Syndrome::new(CommandStatus::BAD_PARAM, 0xE1E101);
        let text = syndrome.to_string();
        assert!(text.starts_with("invalid_protocol_mode"), "{text}");
        assert!(text.contains("0xe1e101"), "{text}");
        assert!(text.contains("BadParam"), "{text}");

        let unknown = Syndrome::new(0x01, 0x1234).to_string();
        assert!(unknown.starts_with("unknown"), "{unknown}");
        assert!(unknown.contains("0x1234"), "{unknown}");
    }

    #[test]
    fn status_byte_roundtrip() {
        for byte in 0u8..=0xFF {
            assert_eq!(CommandStatus::from_byte(byte).as_byte(), byte);
        }
        assert_eq!(CommandStatus::from_byte(0x03), CommandStatus::BadParam);
        assert_eq!(CommandStatus::from_byte(0x42), CommandStatus::Other(0x42));
    }

    #[test]
    fn causes_only_for_configuration_kinds() {
        assert_eq!(SyndromeKind::ObjectTypeUnsupported.probable_causes().len(), 3);
        assert!(SyndromeKind::InvalidQueueSize.probable_causes().is_empty());
    }
}
