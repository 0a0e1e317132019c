#![allow(missing_docs)]

mod core;
mod udp_tx;
mod ws;

pub use self::{core::*, udp_tx::*, ws::*};

use flume::Sender;

#[derive(Clone, Debug)]
pub struct Interconnect {
    pub core: Sender<CoreMessage>,
    pub udp_tx: Sender<UdpTxMessage>,
}

impl Interconnect {
    pub fn poison_all(&self) {
        drop(self.udp_tx.send(UdpTxMessage::Poison));
    }
}
