#![allow(missing_docs)]

use crate::ws::WsStream;
use std::time::Duration;

pub enum WsMessage {
    Ws(Box<WsStream>),
    SetKeepalive(Duration),
    Speaking(bool),

    Poison,
}
