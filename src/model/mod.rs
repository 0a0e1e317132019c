//! Wire model of the voice gateway's control protocol: opcodes, message
//! bodies, and the tagged `{"op": …, "d": …}` envelope they travel in.

mod close_code;
mod opcode;
pub mod payload;

pub use self::{close_code::CloseCode, opcode::OpCode};
pub use num_traits::FromPrimitive;

use payload::*;
use serde::{
    de::{Deserializer, Error as DeError},
    ser::{SerializeStruct, Serializer},
    Deserialize,
    Serialize,
};
use serde_json::Value;

/// A single message on the control channel, tagged with its opcode.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// Client's opening message.
    Identify(Identify),
    /// Client's media transport/encryption selection.
    SelectProtocol(SelectProtocol),
    /// Server's media endpoint description.
    Ready(Ready),
    /// Periodic client keep-alive.
    Heartbeat(Heartbeat),
    /// Server delivery of the encryption key.
    SessionDescription(SessionDescription),
    /// Speaking-state change.
    Speaking(Speaking),
    /// Server acknowledgement of a heartbeat.
    HeartbeatAck(HeartbeatAck),
    /// Client request to revive an interrupted session.
    Resume(Resume),
    /// Server's first message, fixing the keep-alive cadence.
    Hello(Hello),
    /// Server acknowledgement of a successful resume.
    Resumed,
    /// Notification that another client left the call.
    ClientDisconnect(ClientDisconnect),
}

impl Event {
    /// The opcode tagging this message on the wire.
    pub fn kind(&self) -> OpCode {
        match self {
            Self::Identify(_) => OpCode::Identify,
            Self::SelectProtocol(_) => OpCode::SelectProtocol,
            Self::Ready(_) => OpCode::Ready,
            Self::Heartbeat(_) => OpCode::Heartbeat,
            Self::SessionDescription(_) => OpCode::SessionDescription,
            Self::Speaking(_) => OpCode::Speaking,
            Self::HeartbeatAck(_) => OpCode::HeartbeatAck,
            Self::Resume(_) => OpCode::Resume,
            Self::Hello(_) => OpCode::Hello,
            Self::Resumed => OpCode::Resumed,
            Self::ClientDisconnect(_) => OpCode::ClientDisconnect,
        }
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Event", 2)?;

        s.serialize_field("op", &self.kind())?;

        match self {
            Self::Identify(d) => s.serialize_field("d", d)?,
            Self::SelectProtocol(d) => s.serialize_field("d", d)?,
            Self::Ready(d) => s.serialize_field("d", d)?,
            // Heartbeats and their acks carry a bare integer body.
            Self::Heartbeat(d) => s.serialize_field("d", &d.nonce)?,
            Self::SessionDescription(d) => s.serialize_field("d", d)?,
            Self::Speaking(d) => s.serialize_field("d", d)?,
            Self::HeartbeatAck(d) => s.serialize_field("d", &d.nonce)?,
            Self::Resume(d) => s.serialize_field("d", d)?,
            Self::Hello(d) => s.serialize_field("d", d)?,
            Self::Resumed => s.serialize_field("d", &Value::Null)?,
            Self::ClientDisconnect(d) => s.serialize_field("d", d)?,
        }

        s.end()
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Envelope {
            op: OpCode,
            #[serde(default)]
            d: Value,
        }

        let Envelope { op, d } = Envelope::deserialize(deserializer)?;

        let parse = DeError::custom;
        Ok(match op {
            OpCode::Identify => Self::Identify(serde_json::from_value(d).map_err(parse)?),
            OpCode::SelectProtocol =>
                Self::SelectProtocol(serde_json::from_value(d).map_err(parse)?),
            OpCode::Ready => Self::Ready(serde_json::from_value(d).map_err(parse)?),
            OpCode::Heartbeat => Self::Heartbeat(Heartbeat {
                nonce: serde_json::from_value(d).map_err(parse)?,
            }),
            OpCode::SessionDescription =>
                Self::SessionDescription(serde_json::from_value(d).map_err(parse)?),
            OpCode::Speaking => Self::Speaking(serde_json::from_value(d).map_err(parse)?),
            OpCode::HeartbeatAck => Self::HeartbeatAck(HeartbeatAck {
                nonce: serde_json::from_value(d).map_err(parse)?,
            }),
            OpCode::Resume => Self::Resume(serde_json::from_value(d).map_err(parse)?),
            OpCode::Hello => Self::Hello(serde_json::from_value(d).map_err(parse)?),
            OpCode::Resumed => Self::Resumed,
            OpCode::ClientDisconnect =>
                Self::ClientDisconnect(serde_json::from_value(d).map_err(parse)?),
        })
    }
}

impl From<Identify> for Event {
    fn from(d: Identify) -> Self {
        Self::Identify(d)
    }
}

impl From<SelectProtocol> for Event {
    fn from(d: SelectProtocol) -> Self {
        Self::SelectProtocol(d)
    }
}

impl From<Heartbeat> for Event {
    fn from(d: Heartbeat) -> Self {
        Self::Heartbeat(d)
    }
}

impl From<Speaking> for Event {
    fn from(d: Speaking) -> Self {
        Self::Speaking(d)
    }
}

impl From<Resume> for Event {
    fn from(d: Resume) -> Self {
        Self::Resume(d)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::id::{GuildId, UserId};
    use serde_json::json;
    use std::net::IpAddr;
    use std::str::FromStr;

    #[test]
    fn identify_serializes_the_wire_shape() {
        let event = Event::from(Identify {
            server_id: GuildId(41_771_983_423_143_937),
            session_id: "my_session_id".into(),
            token: "my_token".into(),
            user_id: UserId(104_694_319_306_248_192),
        });

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "op": 0,
                "d": {
                    "server_id": 41_771_983_423_143_937u64,
                    "session_id": "my_session_id",
                    "token": "my_token",
                    "user_id": 104_694_319_306_248_192u64,
                }
            }),
        );
    }

    #[test]
    fn heartbeat_body_is_a_bare_integer() {
        let event = Event::from(Heartbeat { nonce: 1_501_184_119 });

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"op": 3, "d": 1_501_184_119}),
        );
    }

    #[test]
    fn select_protocol_matches_the_wire_shape() {
        let event = Event::from(SelectProtocol {
            protocol: "udp".into(),
            data: ProtocolData {
                address: IpAddr::from_str("1.2.3.4").unwrap(),
                mode: "xsalsa20_poly1305".into(),
                port: 2000,
            },
        });

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "op": 1,
                "d": {
                    "protocol": "udp",
                    "data": {
                        "address": "1.2.3.4",
                        "mode": "xsalsa20_poly1305",
                        "port": 2000,
                    }
                }
            }),
        );
    }

    #[test]
    fn speaking_omits_absent_fields() {
        let event = Event::from(Speaking {
            speaking: true,
            delay: Some(0),
            ssrc: None,
            user_id: None,
        });

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"op": 5, "d": {"speaking": true, "delay": 0}}),
        );
    }

    #[test]
    fn hello_decodes() {
        let event: Event = serde_json::from_str(r#"{"op":8,"d":{"heartbeat_interval":41250}}"#).unwrap();

        assert_eq!(event, Event::Hello(Hello { heartbeat_interval: 41250 }));
    }

    #[test]
    fn ready_decodes_and_ignores_extras() {
        let event: Event = serde_json::from_str(
            r#"{"op":2,"d":{"ssrc":287346,"port":50000,"ip":"203.0.113.9","modes":["xsalsa20_poly1305"]}}"#,
        )
        .unwrap();

        assert_eq!(event, Event::Ready(Ready { port: 50_000, ssrc: 287_346 }));
    }

    #[test]
    fn session_description_decodes() {
        let event: Event = serde_json::from_str(
            r#"{"op":4,"d":{"mode":"xsalsa20_poly1305","secret_key":[1,1,1,1]}}"#,
        )
        .unwrap();

        assert_eq!(
            event,
            Event::SessionDescription(SessionDescription {
                mode: "xsalsa20_poly1305".into(),
                secret_key: vec![1; 4],
            }),
        );
    }

    #[test]
    fn heartbeat_ack_decodes_a_bare_integer() {
        let event: Event = serde_json::from_str(r#"{"op":6,"d":1501184119}"#).unwrap();

        assert_eq!(event, Event::HeartbeatAck(HeartbeatAck { nonce: 1_501_184_119 }));
    }

    #[test]
    fn resumed_decodes_with_null_body() {
        let event: Event = serde_json::from_str(r#"{"op":9,"d":null}"#).unwrap();

        assert_eq!(event, Event::Resumed);
    }

    #[test]
    fn unknown_opcode_is_an_error() {
        assert!(serde_json::from_str::<Event>(r#"{"op":12,"d":{}}"#).is_err());
    }
}
