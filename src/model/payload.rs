//! Bodies of the control-channel messages.

use crate::id::{GuildId, UserId};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Opening message of a new session.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Identify {
    /// ID of the guild that owns the call being joined.
    pub server_id: GuildId,
    /// Session identifier issued by the main gateway.
    pub session_id: String,
    /// Ephemeral authentication token for this session.
    pub token: String,
    /// ID of the connecting user.
    pub user_id: UserId,
}

/// Client selection of media transport and encryption, sent once the
/// externally visible address is known.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SelectProtocol {
    /// Transport carrying the media stream; always `"udp"`.
    pub protocol: String,
    /// Address/port/mode triple discovered over the media socket.
    pub data: ProtocolData,
}

/// Externally visible connection parameters echoed back to the server.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ProtocolData {
    /// The client's external IP as reflected by the media server.
    pub address: IpAddr,
    /// Requested encryption scheme.
    pub mode: String,
    /// The client's external UDP port.
    pub port: u16,
}

/// Server description of the negotiated media endpoint.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Ready {
    /// UDP port the media server listens on.
    pub port: u16,
    /// Synchronization source assigned to this client's RTP stream.
    pub ssrc: u32,
}

/// Periodic client keep-alive; the body is a bare integer nonce on the wire.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Heartbeat {
    /// Freshly chosen nonce, echoed back in the matching ack.
    pub nonce: i32,
}

/// Server acknowledgement of a heartbeat; a bare integer on the wire.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct HeartbeatAck {
    /// Nonce of the heartbeat being acknowledged.
    pub nonce: i32,
}

/// Server delivery of the session's encryption parameters.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SessionDescription {
    /// Encryption scheme the server settled on.
    pub mode: String,
    /// Symmetric key for the media stream; must be 32 bytes.
    pub secret_key: Vec<u8>,
}

/// Speaking-state change, spoken in either direction.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Speaking {
    /// Whether audio transmission is starting or stopping.
    pub speaking: bool,
    /// Grace period in milliseconds before the flag takes effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u32>,
    /// SSRC of the stream changing state, on server-sent updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssrc: Option<u32>,
    /// User whose state changed, on server-sent updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// Client request to revive an interrupted session.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Resume {
    /// ID of the guild that owns the interrupted call.
    pub server_id: GuildId,
    /// Session identifier issued by the main gateway.
    pub session_id: String,
    /// Ephemeral authentication token for this session.
    pub token: String,
}

/// Server's first message, fixing the keep-alive cadence.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Hello {
    /// Advertised interval between heartbeats, in milliseconds.
    pub heartbeat_interval: u32,
}

/// Notification that another client left the call.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ClientDisconnect {
    /// The departing user.
    pub user_id: UserId,
}
