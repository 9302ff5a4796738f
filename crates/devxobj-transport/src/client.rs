use std::path::Path;
use std::sync::Mutex;

use bytes::BytesMut;
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::mailbox::{read_mailbox, write_mailbox, Mailbox, MailboxConfig, MailboxKind};
use crate::stream::IpcStream;
use crate::traits::CommandTransport;

/// [`CommandTransport`] that forwards each command to a remote endpoint over
/// a mailbox stream.
///
/// Submissions are serialized on the single connection, so the client can be
/// shared between threads. A failed read or write leaves the stream at an
/// unknown frame boundary; every later submission then fails with
/// [`TransportError::Shutdown`].
pub struct MailboxClient {
    conn: Mutex<Connection>,
    config: MailboxConfig,
}

struct Connection {
    stream: IpcStream,
    buf: BytesMut,
    broken: bool,
}

impl MailboxClient {
    /// Connect to a mailbox endpoint with default configuration.
    #[cfg(unix)]
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(path, MailboxConfig::default())
    }

    /// Connect with explicit configuration.
    #[cfg(unix)]
    pub fn connect_with_config(path: impl AsRef<Path>, config: MailboxConfig) -> Result<Self> {
        let stream = crate::uds::UnixDomainSocket::connect(path)?;
        Self::with_stream(stream, config)
    }

    /// Wrap an already connected stream and apply the configured timeouts.
    pub fn with_stream(stream: IpcStream, config: MailboxConfig) -> Result<Self> {
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        Ok(Self {
            conn: Mutex::new(Connection {
                stream,
                buf: BytesMut::new(),
                broken: false,
            }),
            config,
        })
    }

    /// Current client configuration.
    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }
}

impl CommandTransport for MailboxClient {
    fn submit(&self, input: &[u8], out_capacity: usize) -> Result<Vec<u8>> {
        let capacity = u32::try_from(out_capacity).map_err(|_| TransportError::PayloadTooLarge {
            size: out_capacity,
            max: u32::MAX as usize,
        })?;
        if input.len() > self.config.max_payload_size {
            return Err(TransportError::PayloadTooLarge {
                size: input.len(),
                max: self.config.max_payload_size,
            });
        }

        let mut conn = self.conn.lock().map_err(|_| TransportError::Shutdown)?;
        let Connection {
            stream,
            buf,
            broken,
        } = &mut *conn;
        if *broken {
            return Err(TransportError::Shutdown);
        }

        debug!(in_len = input.len(), out_capacity, "submitting mailbox request");
        let exchanged = write_mailbox(stream, &Mailbox::request(input, capacity))
            .and_then(|()| read_mailbox(stream, buf, self.config.max_payload_size));
        let reply = match exchanged {
            Ok(reply) => reply,
            Err(err) => {
                *broken = true;
                buf.clear();
                warn!(error = %err, "mailbox exchange failed; connection unusable");
                return Err(err);
            }
        };

        match reply.kind {
            MailboxKind::Response if reply.payload.len() > out_capacity => {
                Err(TransportError::ResponseTooLarge {
                    size: reply.payload.len(),
                    capacity: out_capacity,
                })
            }
            MailboxKind::Response => Ok(reply.payload.to_vec()),
            MailboxKind::Failure => Err(TransportError::Remote(
                String::from_utf8_lossy(&reply.payload).into_owned(),
            )),
            MailboxKind::Request => Err(TransportError::UnexpectedKind(reply.kind.as_byte())),
        }
    }

    fn transport_name(&self) -> &'static str {
        "mailbox"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::thread;

    use super::*;

    fn pair() -> (IpcStream, IpcStream) {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        (IpcStream::from_unix(left), IpcStream::from_unix(right))
    }

    /// Answer one request on `server` with `reply(request)`.
    fn answer_once(
        mut server: IpcStream,
        reply: impl FnOnce(Mailbox) -> Mailbox + Send + 'static,
    ) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            let mut buf = BytesMut::new();
            let request = read_mailbox(&mut server, &mut buf, 1024).unwrap();
            write_mailbox(&mut server, &reply(request)).unwrap();
        })
    }

    #[test]
    fn submit_returns_response_payload() {
        let (client, server) = pair();
        let endpoint = answer_once(server, |req| {
            assert_eq!(req.kind, MailboxKind::Request);
            assert_eq!(req.aux, 16);
            Mailbox::response(req.payload.iter().rev().copied().collect())
        });

        let client = MailboxClient::with_stream(client, MailboxConfig::default()).unwrap();
        let out = client.submit(&[1, 2, 3], 16).unwrap();
        assert_eq!(out, vec![3, 2, 1]);
        endpoint.join().unwrap();
    }

    #[test]
    fn remote_failure_is_surfaced() {
        let (client, server) = pair();
        let endpoint = answer_once(server, |_| Mailbox::failure("device gone"));

        let client = MailboxClient::with_stream(client, MailboxConfig::default()).unwrap();
        let err = client.submit(&[0], 16).unwrap_err();
        assert!(matches!(err, TransportError::Remote(reason) if reason == "device gone"));
        endpoint.join().unwrap();
    }

    #[test]
    fn response_larger_than_capacity_is_rejected() {
        let (client, server) = pair();
        let endpoint = answer_once(server, |_| Mailbox::response(vec![0; 32]));

        let client = MailboxClient::with_stream(client, MailboxConfig::default()).unwrap();
        let err = client.submit(&[0], 16).unwrap_err();
        assert!(matches!(
            err,
            TransportError::ResponseTooLarge {
                size: 32,
                capacity: 16
            }
        ));
        endpoint.join().unwrap();
    }

    #[test]
    fn oversized_input_never_reaches_the_wire() {
        let (client, _server) = pair();
        let config = MailboxConfig {
            max_payload_size: 4,
            ..MailboxConfig::default()
        };
        let client = MailboxClient::with_stream(client, config).unwrap();
        let err = client.submit(&[0; 8], 16).unwrap_err();
        assert!(matches!(err, TransportError::PayloadTooLarge { size: 8, max: 4 }));
    }

    #[test]
    fn late_reply_is_never_taken_for_the_next_one() {
        let (client, mut server) = pair();
        let endpoint = thread::spawn(move || {
            let mut buf = BytesMut::new();
            while let Ok(request) = read_mailbox(&mut server, &mut buf, 1024) {
                thread::sleep(std::time::Duration::from_millis(300));
                let reply = Mailbox::response(request.payload.to_vec());
                if write_mailbox(&mut server, &reply).is_err() {
                    break;
                }
            }
        });

        let config = MailboxConfig {
            read_timeout: Some(std::time::Duration::from_millis(100)),
            ..MailboxConfig::default()
        };
        let client = MailboxClient::with_stream(client, config).unwrap();
        let first = client.submit(b"first", 16).unwrap_err();
        assert!(matches!(first, TransportError::Io(_)), "{first:?}");

        thread::sleep(std::time::Duration::from_millis(400));
        let second = client.submit(b"second", 16).unwrap_err();
        assert!(matches!(second, TransportError::Shutdown), "{second:?}");

        drop(client);
        endpoint.join().unwrap();
    }

    #[test]
    fn failed_exchange_makes_later_submissions_fail() {
        let (client, server) = pair();
        drop(server);
        let client = MailboxClient::with_stream(client, MailboxConfig::default()).unwrap();
        client.submit(&[0], 16).unwrap_err();
        assert!(matches!(
            client.submit(&[0], 16),
            Err(TransportError::Shutdown)
        ));
    }

    #[test]
    fn closed_endpoint_reports_connection_closed() {
        let (client, server) = pair();
        drop(server);
        let client = MailboxClient::with_stream(client, MailboxConfig::default()).unwrap();
        let err = client.submit(&[0], 16).unwrap_err();
        assert!(matches!(
            err,
            TransportError::ConnectionClosed | TransportError::Io(_)
        ));
    }
}
