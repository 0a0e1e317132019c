//! Connection errors and convenience types.

use crate::{
    driver::tasks::{error::Recipient, message::*},
    model::{CloseCode, FromPrimitive},
    ws::Error as WsError,
};
use crypto_secretbox::Error as CryptoError;
use flume::SendError;
use serde_json::Error as JsonError;
use std::{error::Error as StdError, fmt, io::Error as IoError};
use tokio::time::error::Elapsed;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;

/// Errors encountered while negotiating or driving a voice session.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The driver hung up an internal signaller, either due to another
    /// connection attempt or a crash.
    AttemptDiscarded,
    /// The secret key delivered in the session description was not 32 bytes.
    BadSecretKeyLength,
    /// An error occurred during encryption of voice packets.
    Crypto(CryptoError),
    /// The voice server closed the control channel with a recognized close
    /// code.
    Gateway(CloseCode),
    /// No usable host could be extracted from the assigned endpoint.
    MalformedEndpoint,
    /// The voice server never answered IP discovery on the media socket, or
    /// answered with an unusable address.
    IpDiscoveryFailed,
    /// Miscellaneous I/O error.
    Io(IoError),
    /// JSON (de)serialization error.
    Json(JsonError),
    /// Failed to message other background tasks after connection establishment.
    InterconnectFailure(Recipient),
    /// The voice server settled on an encryption mode this client does not
    /// implement.
    UnsupportedMode(String),
    /// Error communicating with the gateway server over WebSocket.
    Ws(WsError),
    /// Connection attempt timed out.
    TimedOut,
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        Error::Crypto(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Error {
        Error::Io(e)
    }
}

impl From<JsonError> for Error {
    fn from(e: JsonError) -> Error {
        Error::Json(e)
    }
}

impl From<SendError<WsMessage>> for Error {
    fn from(_e: SendError<WsMessage>) -> Error {
        Error::InterconnectFailure(Recipient::AuxNetwork)
    }
}

impl From<SendError<UdpTxMessage>> for Error {
    fn from(_e: SendError<UdpTxMessage>) -> Error {
        Error::InterconnectFailure(Recipient::UdpTx)
    }
}

impl From<WsError> for Error {
    fn from(e: WsError) -> Error {
        // Recognized close codes become their protocol-level kind; anything
        // else stays a transport error.
        match close_code_of(&e) {
            Some(code) => Error::Gateway(code),
            None => Error::Ws(e),
        }
    }
}

impl From<Elapsed> for Error {
    fn from(_e: Elapsed) -> Error {
        Error::TimedOut
    }
}

/// The voice-protocol close code carried by a framed-channel error, if any.
pub(crate) fn close_code_of(e: &WsError) -> Option<CloseCode> {
    if let WsError::WsClosed(Some(frame)) = e {
        if let WsCloseCode::Library(l) = frame.code {
            return CloseCode::from_u16(l);
        }
    }

    None
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to connect to voice server: ")?;
        match self {
            Self::AttemptDiscarded => write!(f, "connection attempt was aborted/discarded"),
            Self::BadSecretKeyLength => write!(f, "server supplied key of wrong length"),
            Self::Crypto(e) => e.fmt(f),
            Self::Gateway(code) =>
                write!(f, "server closed the session ({}): {}", *code as u16, code.description()),
            Self::MalformedEndpoint => write!(f, "no host in the assigned endpoint"),
            Self::IpDiscoveryFailed => write!(f, "IP discovery/NAT punching went unanswered"),
            Self::Io(e) => e.fmt(f),
            Self::Json(e) => e.fmt(f),
            Self::InterconnectFailure(e) => write!(f, "failed to contact other task ({e:?})"),
            Self::UnsupportedMode(mode) => write!(f, "server chose unsupported encryption mode {mode:?}"),
            Self::Ws(e) => write!(f, "websocket issue ({e:?})."),
            Self::TimedOut => write!(f, "connection attempt timed out"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::AttemptDiscarded
            | Error::BadSecretKeyLength
            | Error::Gateway(_)
            | Error::MalformedEndpoint
            | Error::IpDiscoveryFailed
            | Error::InterconnectFailure(_)
            | Error::UnsupportedMode(_)
            | Error::Ws(_)
            | Error::TimedOut
            | Error::Crypto(_) => None,
            Error::Io(e) => e.source(),
            Error::Json(e) => e.source(),
        }
    }
}

/// Convenience type for voice connection error handling.
pub type Result<T> = std::result::Result<T, Error>;
