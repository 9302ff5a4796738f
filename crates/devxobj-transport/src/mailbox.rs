use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// Mailbox header: magic (2) + kind (1) + reserved (1) + length (4) + aux (4).
pub const HEADER_SIZE: usize = 12;

/// Magic bytes: "FW" (0x46 0x57).
pub const MAGIC: [u8; 2] = [0x46, 0x57];

/// Default maximum payload size: 1 MiB. Command buffers are a few hundred
/// bytes; anything near this is a framing error.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// What a mailbox frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxKind {
    /// Input command buffer; `aux` is the output capacity.
    Request,
    /// Output command buffer produced by the endpoint.
    Response,
    /// The endpoint could not run the command; payload is a UTF-8 reason.
    Failure,
}

impl MailboxKind {
    pub fn as_byte(self) -> u8 {
        match self {
            MailboxKind::Request => 0x01,
            MailboxKind::Response => 0x02,
            MailboxKind::Failure => 0x03,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(MailboxKind::Request),
            0x02 => Ok(MailboxKind::Response),
            0x03 => Ok(MailboxKind::Failure),
            other => Err(TransportError::UnexpectedKind(other)),
        }
    }
}

/// One framed command exchange unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    pub kind: MailboxKind,
    /// Output capacity on requests, zero otherwise.
    pub aux: u32,
    pub payload: Bytes,
}

impl Mailbox {
    pub fn request(input: &[u8], out_capacity: u32) -> Self {
        Self {
            kind: MailboxKind::Request,
            aux: out_capacity,
            payload: Bytes::copy_from_slice(input),
        }
    }

    pub fn response(output: Vec<u8>) -> Self {
        Self {
            kind: MailboxKind::Response,
            aux: 0,
            payload: Bytes::from(output),
        }
    }

    pub fn failure(reason: &str) -> Self {
        Self {
            kind: MailboxKind::Failure,
            aux: 0,
            payload: Bytes::copy_from_slice(reason.as_bytes()),
        }
    }

    /// The total wire size of this mailbox (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Configuration for mailbox streams.
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    /// Maximum payload size in bytes. Default: 1 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

/// Encode a mailbox into the wire format.
///
/// ```text
/// ┌────────────┬──────┬─────┬─────────────┬────────────┬──────────────────┐
/// │ Magic (2B) │ Kind │ Rsv │ Length      │ Aux        │ Payload          │
/// │ 0x46 0x57  │ (1B) │ (1B)│ (4B BE)     │ (4B BE)    │ (Length bytes)   │
/// └────────────┴──────┴─────┴─────────────┴────────────┴──────────────────┘
/// ```
pub fn encode_mailbox(mailbox: &Mailbox, dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(mailbox.payload.len()).map_err(|_| TransportError::PayloadTooLarge {
        size: mailbox.payload.len(),
        max: u32::MAX as usize,
    })?;
    dst.reserve(mailbox.wire_size());
    dst.put_slice(&MAGIC);
    dst.put_u8(mailbox.kind.as_byte());
    dst.put_u8(0);
    dst.put_u32(len);
    dst.put_u32(mailbox.aux);
    dst.put_slice(&mailbox.payload);
    Ok(())
}

/// Decode one mailbox from the front of `src`.
///
/// Returns `Ok(None)` until a complete mailbox is buffered; on success the
/// consumed bytes are removed from `src`.
pub fn decode_mailbox(src: &mut BytesMut, max_payload: usize) -> Result<Option<Mailbox>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }
    if src[0..2] != MAGIC {
        return Err(TransportError::InvalidMagic);
    }

    let mut header = &src[2..HEADER_SIZE];
    let kind = MailboxKind::from_byte(header.get_u8())?;
    let _reserved = header.get_u8();
    let payload_len = header.get_u32() as usize;
    let aux = header.get_u32();

    if payload_len > max_payload {
        return Err(TransportError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }
    if src.len() < HEADER_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    Ok(Some(Mailbox { kind, aux, payload }))
}

/// Read exactly one mailbox from a blocking stream.
///
/// `buf` carries bytes read past the end of the previous mailbox.
pub fn read_mailbox<R: Read>(
    reader: &mut R,
    buf: &mut BytesMut,
    max_payload: usize,
) -> Result<Mailbox> {
    loop {
        if let Some(mailbox) = decode_mailbox(buf, max_payload)? {
            return Ok(mailbox);
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let read = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        };
        if read == 0 {
            return Err(TransportError::ConnectionClosed);
        }
        buf.extend_from_slice(&chunk[..read]);
    }
}

/// Write one mailbox to a blocking stream and flush it.
pub fn write_mailbox<W: Write>(writer: &mut W, mailbox: &Mailbox) -> Result<()> {
    let mut wire = BytesMut::with_capacity(mailbox.wire_size());
    encode_mailbox(mailbox, &mut wire)?;

    let mut offset = 0usize;
    while offset < wire.len() {
        match writer.write(&wire[offset..]) {
            Ok(0) => return Err(TransportError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn request_header_layout() {
        let mut buf = BytesMut::new();
        encode_mailbox(&Mailbox::request(&[0x0a, 0x00], 16), &mut buf).unwrap();
        assert_eq!(
            buf.as_ref(),
            &[0x46, 0x57, 0x01, 0x00, 0, 0, 0, 2, 0, 0, 0, 16, 0x0a, 0x00]
        );
    }

    #[test]
    fn encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        let sent = Mailbox::request(b"create", 80);
        encode_mailbox(&sent, &mut buf).unwrap();

        let got = decode_mailbox(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(got, sent);
        assert!(buf.is_empty());
    }

    #[test]
    fn incomplete_header_and_payload_wait_for_more() {
        let mut buf = BytesMut::from(&MAGIC[..]);
        assert!(decode_mailbox(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());

        let mut buf = BytesMut::new();
        encode_mailbox(&Mailbox::response(vec![1, 2, 3, 4]), &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);
        assert!(decode_mailbox(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
    }

    #[test]
    fn bad_magic_and_kind_are_rejected() {
        let mut buf = BytesMut::from(&[0xFFu8; HEADER_SIZE][..]);
        assert!(matches!(
            decode_mailbox(&mut buf, DEFAULT_MAX_PAYLOAD),
            Err(TransportError::InvalidMagic)
        ));

        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(0x7F);
        buf.put_u8(0);
        buf.put_u32(0);
        buf.put_u32(0);
        assert!(matches!(
            decode_mailbox(&mut buf, DEFAULT_MAX_PAYLOAD),
            Err(TransportError::UnexpectedKind(0x7F))
        ));
    }

    #[test]
    fn oversized_payload_is_rejected_before_buffering() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(MailboxKind::Response.as_byte());
        buf.put_u8(0);
        buf.put_u32(4096);
        buf.put_u32(0);
        assert!(matches!(
            decode_mailbox(&mut buf, 64),
            Err(TransportError::PayloadTooLarge { size: 4096, max: 64 })
        ));
    }

    #[test]
    fn stream_helpers_roundtrip_back_to_back() {
        let mut wire = Vec::new();
        write_mailbox(&mut wire, &Mailbox::request(b"one", 16)).unwrap();
        write_mailbox(&mut wire, &Mailbox::failure("no such object")).unwrap();

        let mut reader = Cursor::new(wire);
        let mut buf = BytesMut::new();
        let first = read_mailbox(&mut reader, &mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        let second = read_mailbox(&mut reader, &mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert_eq!(first.payload.as_ref(), b"one");
        assert_eq!(second.kind, MailboxKind::Failure);
        assert_eq!(second.payload.as_ref(), b"no such object");

        let err = read_mailbox(&mut reader, &mut buf, DEFAULT_MAX_PAYLOAD).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
    }

    #[test]
    fn zero_length_write_means_closed() {
        struct ZeroWriter;
        impl Write for ZeroWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let err = write_mailbox(&mut ZeroWriter, &Mailbox::response(vec![0])).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
    }
}
