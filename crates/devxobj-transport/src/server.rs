use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::mailbox::{read_mailbox, write_mailbox, Mailbox, MailboxConfig, MailboxKind};
use crate::stream::IpcStream;
use crate::traits::CommandTransport;
use crate::uds::UnixDomainSocket;

/// Hosts a [`CommandTransport`] backend on a Unix socket.
///
/// Each accepted connection is served on its own thread; requests on one
/// connection are answered in order.
pub struct MailboxServer<T> {
    socket: UnixDomainSocket,
    backend: Arc<T>,
    config: MailboxConfig,
    stop: Arc<AtomicBool>,
}

impl<T> MailboxServer<T>
where
    T: CommandTransport + Send + Sync + 'static,
{
    /// Bind to a Unix domain socket path.
    pub fn bind(path: impl AsRef<Path>, backend: Arc<T>) -> Result<Self> {
        Ok(Self {
            socket: UnixDomainSocket::bind(path)?,
            backend,
            config: MailboxConfig::default(),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Override mailbox configuration for accepted connections.
    pub fn with_config(mut self, config: MailboxConfig) -> Self {
        self.config = config;
        self
    }

    /// Flag that makes [`Self::run`] return after the next accepted
    /// connection.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn path(&self) -> &Path {
        self.socket.path()
    }

    /// Accept and serve connections until the stop flag is raised.
    ///
    /// Returns the number of connections accepted.
    pub fn run(&self) -> Result<usize> {
        let mut accepted = 0usize;
        while !self.stop.load(Ordering::SeqCst) {
            let stream = self.socket.accept()?;
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            accepted += 1;
            let backend = Arc::clone(&self.backend);
            let config = self.config.clone();
            std::thread::spawn(move || {
                if let Err(err) = serve_connection(stream, &*backend, &config) {
                    warn!(error = %err, "command connection ended with error");
                }
            });
        }
        info!(accepted, "command endpoint stopped");
        Ok(accepted)
    }

    /// Accept a single connection and serve it on the calling thread.
    pub fn serve_one(&self) -> Result<usize> {
        let stream = self.socket.accept()?;
        serve_connection(stream, &*self.backend, &self.config)
    }
}

/// Answer mailbox requests on `stream` with `backend` until the peer hangs up.
///
/// Backend failures are reported to the peer as failure mailboxes and do not
/// end the session. Returns the number of requests served.
pub fn serve_connection<T>(
    mut stream: IpcStream,
    backend: &T,
    config: &MailboxConfig,
) -> Result<usize>
where
    T: CommandTransport + ?Sized,
{
    stream.set_read_timeout(config.read_timeout)?;
    stream.set_write_timeout(config.write_timeout)?;

    let mut buf = BytesMut::new();
    let mut served = 0usize;
    loop {
        let request = match read_mailbox(&mut stream, &mut buf, config.max_payload_size) {
            Ok(request) => request,
            Err(TransportError::ConnectionClosed) if buf.is_empty() => {
                debug!(served, "command peer disconnected");
                return Ok(served);
            }
            Err(err) => return Err(err),
        };

        let reply = match request.kind {
            MailboxKind::Request => {
                match backend.submit(&request.payload, request.aux as usize) {
                    Ok(output) => Mailbox::response(output),
                    Err(err) => {
                        warn!(
                            error = %err,
                            backend = backend.transport_name(),
                            "backend rejected command"
                        );
                        Mailbox::failure(&err.to_string())
                    }
                }
            }
            other => Mailbox::failure(&format!("expected request, got {other:?}")),
        };
        write_mailbox(&mut stream, &reply)?;
        served += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use super::*;
    use crate::client::MailboxClient;

    struct Upper {
        calls: AtomicUsize,
    }

    impl CommandTransport for Upper {
        fn submit(&self, input: &[u8], out_capacity: usize) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if input.is_empty() {
                return Err(TransportError::Remote("empty command".to_string()));
            }
            let mut out = input.to_ascii_uppercase();
            out.truncate(out_capacity);
            Ok(out)
        }
    }

    fn temp_sock(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "devxobj-srv-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("fw.sock")
    }

    #[test]
    fn serves_requests_and_backend_errors_over_socket() {
        let sock_path = temp_sock("basic");
        let backend = Arc::new(Upper {
            calls: AtomicUsize::new(0),
        });
        let server = MailboxServer::bind(&sock_path, Arc::clone(&backend)).unwrap();

        let endpoint = thread::spawn(move || server.serve_one().unwrap());

        let client = MailboxClient::connect(&sock_path).unwrap();
        assert_eq!(client.submit(b"query", 16).unwrap(), b"QUERY");
        let err = client.submit(b"", 16).unwrap_err();
        assert!(matches!(err, TransportError::Remote(msg) if msg.contains("empty command")));
        assert_eq!(client.submit(b"again", 3).unwrap(), b"AGA");
        drop(client);

        assert_eq!(endpoint.join().unwrap(), 3);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        if let Some(dir) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn non_request_frames_get_failure_reply() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let backend = Upper {
            calls: AtomicUsize::new(0),
        };
        let server = thread::spawn(move || {
            serve_connection(
                IpcStream::from_unix(right),
                &backend,
                &MailboxConfig::default(),
            )
            .unwrap()
        });

        let mut peer = IpcStream::from_unix(left);
        write_mailbox(&mut peer, &Mailbox::response(vec![1])).unwrap();
        let mut buf = BytesMut::new();
        let reply = read_mailbox(&mut peer, &mut buf, 1024).unwrap();
        assert_eq!(reply.kind, MailboxKind::Failure);
        drop(peer);

        assert_eq!(server.join().unwrap(), 1);
    }

    #[test]
    fn run_returns_after_stop_flag() {
        let sock_path = temp_sock("stop");
        let backend = Arc::new(Upper {
            calls: AtomicUsize::new(0),
        });
        let server = MailboxServer::bind(&sock_path, backend).unwrap();
        let stop = server.stop_handle();
        let path = server.path().to_path_buf();

        let runner = thread::spawn(move || server.run().unwrap());

        let client = MailboxClient::connect(&path).unwrap();
        assert_eq!(client.submit(b"x", 4).unwrap(), b"X");
        stop.store(true, Ordering::SeqCst);
        // Wake the blocking accept.
        let _wake = UnixDomainSocket::connect(&path);

        assert_eq!(runner.join().unwrap(), 1);
        if let Some(dir) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
