#![allow(missing_docs)]

/// Background task which could not be reached over its message channel.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Recipient {
    AuxNetwork,
    UdpTx,
}
