use num_derive::FromPrimitive;

/// Close codes with which the voice server terminates the control channel.
///
/// Numeric values are fixed by the wire protocol.
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, Hash, PartialEq)]
#[non_exhaustive]
pub enum CloseCode {
    /// An opcode the server does not recognize was sent.
    UnknownOpcode = 4001,
    /// A payload was sent before identifying.
    NotAuthenticated = 4003,
    /// The token in the identify payload was incorrect.
    AuthenticationFailed = 4004,
    /// More than one identify payload was sent.
    AlreadyAuthenticated = 4005,
    /// The session is no longer valid.
    SessionNoLongerValid = 4006,
    /// The session timed out.
    SessionTimeout = 4009,
    /// The server the client tried to connect to was not found.
    ServerNotFound = 4011,
    /// A protocol the server does not recognize was selected.
    UnknownProtocol = 4012,
    /// The client was disconnected from the call.
    Disconnected = 4014,
    /// The voice server crashed.
    VoiceServerCrashed = 4015,
    /// An encryption mode the server does not recognize was selected.
    UnknownEncryptionMode = 4016,
}

impl CloseCode {
    /// Short human-readable summary of the closure cause.
    pub fn description(self) -> &'static str {
        match self {
            Self::UnknownOpcode => "sent an unrecognized opcode",
            Self::NotAuthenticated => "sent a payload before identifying",
            Self::AuthenticationFailed => "token was invalid",
            Self::AlreadyAuthenticated => "sent more than one identify payload",
            Self::SessionNoLongerValid => "session is no longer valid",
            Self::SessionTimeout => "session timed out",
            Self::ServerNotFound => "voice server was not found",
            Self::UnknownProtocol => "selected an unrecognized protocol",
            Self::Disconnected => "disconnected from the call",
            Self::VoiceServerCrashed => "voice server crashed",
            Self::UnknownEncryptionMode => "selected an unrecognized encryption mode",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn known_codes_resolve() {
        assert_eq!(CloseCode::from_u16(4001), Some(CloseCode::UnknownOpcode));
        assert_eq!(CloseCode::from_u16(4014), Some(CloseCode::Disconnected));
        assert_eq!(CloseCode::from_u16(4015), Some(CloseCode::VoiceServerCrashed));
        assert_eq!(CloseCode::from_u16(4016), Some(CloseCode::UnknownEncryptionMode));
    }

    #[test]
    fn unknown_codes_do_not() {
        assert_eq!(CloseCode::from_u16(1000), None);
        assert_eq!(CloseCode::from_u16(4000), None);
        assert_eq!(CloseCode::from_u16(4002), None);
    }
}
