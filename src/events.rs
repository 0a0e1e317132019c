//! Lifecycle notifications delivered to the driver's owner.

use crate::{
    driver::connection::error::{close_code_of, Error},
    id::GuildId,
    model::CloseCode,
    ws::Error as WsError,
};

/// Session lifecycle changes observed after [`Driver::connect`] was called.
///
/// [`Driver::connect`]: crate::Driver::connect
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum DriverEvent {
    /// A voice session finished negotiation and can carry audio.
    Connect(ConnectData),
    /// A voice session was torn down, by the peer or by the user.
    Disconnect(DisconnectData),
}

/// Voice connection details gathered at establishment.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct ConnectData {
    /// ID of the guild whose call was joined.
    pub guild_id: GuildId,
    /// Unique string describing the negotiated session.
    pub session_id: String,
    /// Synchronization source assigned to this client's RTP stream.
    pub ssrc: u32,
}

/// Voice connection details gathered at termination or failure.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct DisconnectData {
    /// The location that a voice connection was terminated.
    pub kind: DisconnectKind,
    /// The cause of any connection failure.
    ///
    /// If `None`, then this disconnect was requested by the user.
    pub reason: Option<DisconnectReason>,
    /// ID of the guild whose call was left.
    pub guild_id: GuildId,
    /// Unique string describing the lost session.
    pub session_id: String,
}

/// The location that a voice connection was terminated.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum DisconnectKind {
    /// The driver failed to establish a voice connection.
    Connect,
    /// The driver failed to resume an interrupted voice connection.
    Reconnect,
    /// The voice connection was terminated mid-session by either
    /// the user or the peer.
    Runtime,
}

/// The reason that a voice connection failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum DisconnectReason {
    /// This (re)connection attempt was dropped due to another request.
    AttemptDiscarded,
    /// The driver had an internal error.
    Internal,
    /// A host-specific I/O error caused the fault; this is likely transient,
    /// and should be retried some time later.
    Io,
    /// The driver and the peer disagreed on the protocol used to establish a
    /// voice connection.
    ProtocolViolation,
    /// A voice connection was not established in the specified time.
    TimedOut,
    /// The WebSocket connection was closed by the peer, carrying the close
    /// code when one was recognized.
    WsClosed(Option<CloseCode>),
}

impl From<&Error> for DisconnectReason {
    fn from(e: &Error) -> Self {
        match e {
            Error::AttemptDiscarded => Self::AttemptDiscarded,
            Error::BadSecretKeyLength
            | Error::MalformedEndpoint
            | Error::IpDiscoveryFailed
            | Error::UnsupportedMode(_)
            | Error::Json(_) => Self::ProtocolViolation,
            Error::Gateway(code) => Self::WsClosed(Some(*code)),
            Error::Io(_) => Self::Io,
            Error::Crypto(_) | Error::InterconnectFailure(_) => Self::Internal,
            Error::Ws(ws) => ws.into(),
            Error::TimedOut => Self::TimedOut,
        }
    }
}

impl From<&WsError> for DisconnectReason {
    fn from(e: &WsError) -> Self {
        Self::WsClosed(close_code_of(e))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::CloseCode;

    #[test]
    fn gateway_errors_carry_their_close_code() {
        let reason = DisconnectReason::from(&Error::Gateway(CloseCode::VoiceServerCrashed));

        assert_eq!(reason, DisconnectReason::WsClosed(Some(CloseCode::VoiceServerCrashed)));
    }

    #[test]
    fn local_protocol_failures_map_to_violation() {
        assert_eq!(
            DisconnectReason::from(&Error::IpDiscoveryFailed),
            DisconnectReason::ProtocolViolation,
        );
        assert_eq!(
            DisconnectReason::from(&Error::UnsupportedMode("aead_aes256_gcm".into())),
            DisconnectReason::ProtocolViolation,
        );
    }
}
