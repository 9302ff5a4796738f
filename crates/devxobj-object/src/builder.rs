//! Command buffer construction and response parsing.
//!
//! Builders are pure: they allocate and fill a buffer, nothing else. Parsers
//! check the status byte before anything else, so a failed command yields a
//! [`Syndrome`] even when its output is shorter than a successful one.

use devxobj_wire::bitfield::{get_u16, get_u32, get_u8, set_u16, set_u32};
use devxobj_wire::general::{input, output, IN_HEADER, OUT_HEADER};
use devxobj_wire::{EncodingError, HEADER_SIZE, OPCODE_CREATE, OPCODE_DESTROY, OPCODE_QUERY};

use crate::body::ObjectBody;
use crate::error::CommandError;
use crate::syndrome::{CommandStatus, Syndrome};

/// Output capacity of CREATE: the output header alone.
pub const CREATE_OUT_SIZE: usize = HEADER_SIZE;

/// Output capacity of DESTROY: the output header alone.
pub const DESTROY_OUT_SIZE: usize = HEADER_SIZE;

/// Output capacity of QUERY for body type `B`.
pub fn query_out_size<B: ObjectBody>() -> usize {
    HEADER_SIZE + B::LAYOUT.size()
}

/// An encoded input command and the output capacity it expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuffer {
    opcode: u16,
    obj_type: u16,
    bytes: Vec<u8>,
    out_capacity: usize,
}

impl CommandBuffer {
    pub fn opcode(&self) -> u16 {
        self.opcode
    }

    pub fn obj_type(&self) -> u16 {
        self.obj_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes the caller must allow for the response.
    pub fn out_capacity(&self) -> usize {
        self.out_capacity
    }
}

/// Decoded input header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputHeader {
    pub opcode: u16,
    pub obj_type: u16,
    pub obj_id: u32,
}

/// Build a CREATE command: input header followed by the encoded body.
pub fn build_create<B: ObjectBody>(body: &B) -> Result<CommandBuffer, EncodingError> {
    let mut bytes = header(OPCODE_CREATE, B::OBJ_TYPE, 0, B::LAYOUT.size())?;
    body.encode(&mut bytes[HEADER_SIZE..])?;
    Ok(CommandBuffer {
        opcode: OPCODE_CREATE,
        obj_type: B::OBJ_TYPE,
        bytes,
        out_capacity: CREATE_OUT_SIZE,
    })
}

/// Build a QUERY command for `object_id`.
pub fn build_query<B: ObjectBody>(object_id: u32) -> Result<CommandBuffer, EncodingError> {
    Ok(CommandBuffer {
        opcode: OPCODE_QUERY,
        obj_type: B::OBJ_TYPE,
        bytes: header(OPCODE_QUERY, B::OBJ_TYPE, object_id, 0)?,
        out_capacity: query_out_size::<B>(),
    })
}

/// Build a DESTROY command for `object_id`.
pub fn build_destroy<B: ObjectBody>(object_id: u32) -> Result<CommandBuffer, EncodingError> {
    Ok(CommandBuffer {
        opcode: OPCODE_DESTROY,
        obj_type: B::OBJ_TYPE,
        bytes: header(OPCODE_DESTROY, B::OBJ_TYPE, object_id, 0)?,
        out_capacity: DESTROY_OUT_SIZE,
    })
}

fn header(
    opcode: u16,
    obj_type: u16,
    object_id: u32,
    body_len: usize,
) -> Result<Vec<u8>, EncodingError> {
    let mut bytes = vec![0u8; HEADER_SIZE + body_len];
    set_u16(&mut bytes, &input::OPCODE, opcode)?;
    set_u16(&mut bytes, &input::OBJ_TYPE, obj_type)?;
    set_u32(&mut bytes, &input::OBJ_ID, object_id)?;
    Ok(bytes)
}

/// Decode the generic input header at the front of `bytes`.
pub fn decode_input_header(bytes: &[u8]) -> Result<InputHeader, EncodingError> {
    IN_HEADER.check_min_len(bytes.len())?;
    Ok(InputHeader {
        opcode: get_u16(bytes, &input::OPCODE)?,
        obj_type: get_u16(bytes, &input::OBJ_TYPE)?,
        obj_id: get_u32(bytes, &input::OBJ_ID)?,
    })
}

/// Fail with the firmware syndrome if the output header reports an error.
pub fn check_status(out: &[u8]) -> Result<(), CommandError> {
    OUT_HEADER.check_min_len(out.len())?;
    let status = get_u8(out, &output::STATUS)?;
    if status != CommandStatus::OK {
        let syndrome = get_u32(out, &output::SYNDROME)?;
        return Err(CommandError::Firmware(Syndrome::new(status, syndrome)));
    }
    Ok(())
}

/// Object id assigned by a successful CREATE.
pub fn parse_create_response(out: &[u8]) -> Result<u32, CommandError> {
    check_status(out)?;
    Ok(get_u32(out, &output::OBJ_ID)?)
}

/// Object body returned by a successful QUERY.
pub fn parse_query_response<B: ObjectBody>(out: &[u8]) -> Result<B, CommandError> {
    check_status(out)?;
    let expected = query_out_size::<B>();
    let body = out
        .get(HEADER_SIZE..expected)
        .ok_or(EncodingError::SizeMismatch {
            layout: B::LAYOUT.name(),
            expected,
            actual: out.len(),
        })?;
    Ok(B::decode(body)?)
}

/// Status of a DESTROY.
pub fn parse_destroy_response(out: &[u8]) -> Result<(), CommandError> {
    check_status(out)
}

#[cfg(test)]
mod tests {
    use devxobj_wire::bitfield::{set, set_u8};

    use super::*;
    use crate::channel::ChannelConfig;
    use crate::syndrome::SyndromeKind;

    fn out_header(status: u8, syndrome: u32, object_id: u32, extra: usize) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_SIZE + extra];
        set_u8(&mut out, &output::STATUS, status).unwrap();
        set_u32(&mut out, &output::SYNDROME, syndrome).unwrap();
        set_u32(&mut out, &output::OBJ_ID, object_id).unwrap();
        out
    }

    #[test]
    fn create_buffer_layout() {
        let config = ChannelConfig::new(0x1000, 4096, 0x42);
        let cmd = build_create(&config).unwrap();

        assert_eq!(cmd.len(), 80);
        assert_eq!(cmd.out_capacity(), 16);
        let bytes = cmd.as_bytes();
        assert_eq!(&bytes[0..2], &[0x0a, 0x00]);
        assert_eq!(&bytes[2..6], &[0, 0, 0, 0]);
        assert_eq!(&bytes[6..8], &[0x00, 0x59]);
        assert_eq!(&bytes[8..16], &[0; 8]);
        // q_size, q_mkey and q_addr inside the body.
        assert_eq!(&bytes[16 + 4..16 + 8], &[0, 0, 0, 0x42]);
        assert_eq!(&bytes[16 + 8..16 + 12], &[0, 0, 0x10, 0]);
        assert_eq!(&bytes[16 + 16..16 + 24], &[0, 0, 0, 0, 0, 0, 0x10, 0]);
    }

    #[test]
    fn query_and_destroy_carry_object_id() {
        let query = build_query::<ChannelConfig>(0x0102_0304).unwrap();
        assert_eq!(query.len(), 16);
        assert_eq!(query.out_capacity(), 80);
        assert_eq!(&query.as_bytes()[0..2], &[0x0a, 0x02]);
        assert_eq!(&query.as_bytes()[8..12], &[1, 2, 3, 4]);

        let destroy = build_destroy::<ChannelConfig>(7).unwrap();
        assert_eq!(destroy.len(), 16);
        assert_eq!(destroy.out_capacity(), 16);
        let header = decode_input_header(destroy.as_bytes()).unwrap();
        assert_eq!(
            header,
            InputHeader {
                opcode: OPCODE_DESTROY,
                obj_type: 0x59,
                obj_id: 7
            }
        );
    }

    #[test]
    fn create_response_yields_object_id() {
        let out = out_header(0, 0, 0x1234, 0);
        assert_eq!(parse_create_response(&out).unwrap(), 0x1234);
    }

    #[test]
    fn failed_status_yields_classified_syndrome() {
        let out = out_header(CommandStatus::BAD_PARAM, 0xE1E102, 0, 0);
        let err = parse_create_response(&out).unwrap_err();
        let CommandError::Firmware(syndrome) = err else {
            panic!("expected firmware error, got {err:?}");
        };
        assert_eq!(syndrome.category, SyndromeKind::InvalidQueueSize);
        assert_eq!(syndrome.status, CommandStatus::BadParam);
        assert_eq!(syndrome.raw_code, 0xE1E102);
    }

    #[test]
    fn failed_query_is_reported_before_short_body() {
        let out = out_header(CommandStatus::BAD_PARAM, 0xE1E105, 0, 0);
        let err = parse_query_response::<ChannelConfig>(&out).unwrap_err();
        assert!(matches!(
            err,
            CommandError::Firmware(s) if s.category == SyndromeKind::InvalidObjectId
        ));
    }

    #[test]
    fn query_response_decodes_body() {
        let mut out = out_header(0, 0, 9, 64);
        set(&mut out[HEADER_SIZE..], &devxobj_wire::channel::Q_ADDR, 0x8000).unwrap();
        set(&mut out[HEADER_SIZE..], &devxobj_wire::channel::Q_SIZE, 256).unwrap();
        set(&mut out[HEADER_SIZE..], &devxobj_wire::channel::Q_MKEY, 3).unwrap();
        let config: ChannelConfig = parse_query_response(&out).unwrap();
        assert_eq!(config, ChannelConfig::new(0x8000, 256, 3));
    }

    #[test]
    fn truncated_responses_are_encoding_errors() {
        assert!(matches!(
            parse_destroy_response(&[0u8; 8]),
            Err(CommandError::Encoding(EncodingError::SizeMismatch { .. }))
        ));
        let out = out_header(0, 0, 9, 10);
        assert!(matches!(
            parse_query_response::<ChannelConfig>(&out),
            Err(CommandError::Encoding(EncodingError::SizeMismatch {
                expected: 80,
                actual: 26,
                ..
            }))
        ));
    }

    #[test]
    fn destroy_success_and_failure() {
        parse_destroy_response(&out_header(0, 0, 0, 0)).unwrap();
        assert!(parse_destroy_response(&out_header(0x05, 0xE1E105, 0, 0)).is_err());
    }
}
