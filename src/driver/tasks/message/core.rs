#![allow(missing_docs)]

use crate::{
    driver::{connection::error::Error, AudioFrame},
    events::DisconnectReason,
    info::SessionEntry,
};
use flume::Sender;

#[derive(Debug)]
pub enum CoreMessage {
    ConnectWithResult(SessionEntry, Sender<Result<(), Error>>),
    Disconnect,
    Play(AudioFrame),
    Stop,
    Reconnect,
    SignalWsClosure(usize, Option<DisconnectReason>),
    Poison,
}
