#![deny(missing_docs)]
//! Warbler is an async voice gateway client core for chat-service voice
//! bots, written in Rust. The library offers:
//!  * Negotiation of real-time voice sessions over a framed JSON WebSocket
//!  channel, including NAT reflection ("IP discovery") on the media socket
//!  and the protocol's keep-alive loop.
//!  * A send-only media path which sequences, encrypts
//!  (XSalsa20-Poly1305), and emits RTP packets around caller-supplied Opus
//!  frames.
//!
//! Session credentials (`endpoint`, `session_id`, `token`, …) are obtained
//! out-of-band from the main gateway and handed over as a [`SessionEntry`];
//! audio arrives pre-encoded. Everything in between — opcodes, discovery
//! datagrams, heartbeats, packet crypto — is this crate's job.
//!
//! [`SessionEntry`]: struct@SessionEntry

mod config;
pub mod constants;
pub mod driver;
pub(crate) mod endpoint;
pub mod error;
pub mod events;
pub mod id;
pub(crate) mod info;
pub mod model;
mod ws;

pub use crate::{
    config::Config,
    driver::{AudioFrame, Connect, Driver},
    events::DriverEvent,
};

pub use info::SessionEntry;
