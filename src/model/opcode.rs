use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

/// Tags of all messages spoken on the voice gateway's control channel.
///
/// Numeric values are fixed by the wire protocol.
#[derive(Clone, Copy, Debug, Deserialize, Eq, FromPrimitive, Hash, PartialEq, Serialize)]
#[serde(into = "u8", try_from = "u8")]
#[non_exhaustive]
pub enum OpCode {
    /// Client's opening message, used to begin a new session.
    Identify = 0,
    /// Client's selection of the media transport and encryption mode.
    SelectProtocol = 1,
    /// Server's description of the media endpoint and SSRC assignment.
    Ready = 2,
    /// Periodic client keep-alive.
    Heartbeat = 3,
    /// Server's delivery of the session encryption key.
    SessionDescription = 4,
    /// Speaking-state change, sent in either direction.
    Speaking = 5,
    /// Server acknowledgement of a heartbeat.
    HeartbeatAck = 6,
    /// Client request to revive an interrupted session.
    Resume = 7,
    /// Server's first message, carrying the heartbeat interval.
    Hello = 8,
    /// Server acknowledgement of a successful resume.
    Resumed = 9,
    /// Notification that another client left the call.
    ClientDisconnect = 13,
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op as u8
    }
}

impl TryFrom<u8> for OpCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use num_traits::FromPrimitive;

        Self::from_u8(value).ok_or_else(|| format!("invalid opcode: {value}"))
    }
}
