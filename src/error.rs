use std::fmt;
use std::io;

use crate::alert::AlertDescription;

/// Errors surfaced by the handshake driver.
///
/// Every handshake failure is fatal. `FatalAlert` carries the alert
/// description that was (or would have been) sent to the peer; `Transport`
/// wraps an I/O failure from the underlying datagram transport, in which
/// case no alert can be delivered.
#[derive(Debug)]
pub enum Error {
    FatalAlert(AlertDescription, String),
    Transport(io::Error),
}

impl Error {
    pub(crate) fn alert(description: AlertDescription, reason: impl Into<String>) -> Error {
        Error::FatalAlert(description, reason.into())
    }

    /// The alert description associated with this error, if any.
    pub fn alert_description(&self) -> Option<AlertDescription> {
        match self {
            Error::FatalAlert(description, _) => Some(*description),
            Error::Transport(_) => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FatalAlert(description, reason) => {
                write!(f, "fatal alert {}: {}", description, reason)
            }
            Error::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Transport(value)
    }
}

// Short reads and malformed vectors from the codec layer all surface as
// decode_error (RFC 5246 7.2.2).
impl<'a> From<nom::Err<nom::error::Error<&'a [u8]>>> for Error {
    fn from(value: nom::Err<nom::error::Error<&'a [u8]>>) -> Self {
        let kind = match value {
            nom::Err::Incomplete(_) => None,
            nom::Err::Error(x) => Some(x.code),
            nom::Err::Failure(x) => Some(x.code),
        };
        match kind {
            Some(code) => Error::alert(
                AlertDescription::DecodeError,
                format!("malformed handshake body ({:?})", code),
            ),
            None => Error::alert(AlertDescription::DecodeError, "truncated handshake body"),
        }
    }
}
