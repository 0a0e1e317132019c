#![allow(missing_docs)]

use super::WsMessage;
use crate::driver::AudioFrame;
use crypto_secretbox::XSalsa20Poly1305 as Cipher;
use flume::Sender;
use tokio::net::UdpSocket;

pub enum UdpTxMessage {
    SetConn(TxConnection),
    DropConn,
    Frame(AudioFrame),
    Stop,
    Poison,
}

/// Everything the transmit task needs to carry one session's media stream.
pub struct TxConnection {
    pub cipher: Cipher,
    pub ssrc: u32,
    pub udp_tx: UdpSocket,
    pub ws: Sender<WsMessage>,
}
