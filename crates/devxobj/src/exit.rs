use std::fmt;
use std::io;

use devxobj_object::LifecycleError;
use devxobj_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const FIRMWARE_REJECTED: i32 = 40;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::PathTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn lifecycle_error(context: &str, err: LifecycleError) -> CliError {
    match err {
        LifecycleError::Transport(err) => transport_error(context, err),
        LifecycleError::Validation(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        LifecycleError::Firmware(syndrome) => {
            let mut message = format!("{context}: firmware rejected command: {syndrome}");
            let causes = syndrome.category.probable_causes();
            if !causes.is_empty() {
                message.push_str("\nprobable causes:");
                for cause in causes {
                    message.push_str("\n  - ");
                    message.push_str(cause);
                }
            }
            CliError::new(FIRMWARE_REJECTED, message)
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use devxobj_object::{Syndrome, ValidationError};

    use super::*;

    #[test]
    fn firmware_rejection_lists_causes() {
        let err = lifecycle_error(
            "create failed",
            LifecycleError::Firmware(Syndrome::new(0x03, 0x3590F5)),
        );
        assert_eq!(err.code, FIRMWARE_REJECTED);
        assert!(err.message.contains("0x3590f5"), "{}", err.message);
        assert!(err.message.contains("probable causes"), "{}", err.message);
    }

    #[test]
    fn validation_is_data_invalid() {
        let err = lifecycle_error(
            "create failed",
            LifecycleError::Validation(ValidationError::ZeroMemoryKey),
        );
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn missing_endpoint_is_transport_error() {
        let err = transport_error(
            "connect failed",
            TransportError::Connect {
                path: "/nonexistent.sock".into(),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }
}
