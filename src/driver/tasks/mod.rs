#![allow(missing_docs)]

pub mod error;
pub mod message;
pub(crate) mod udp_tx;
pub(crate) mod ws;

use super::connection::{Connection, ConnectionState};
use crate::{
    events::{ConnectData, DisconnectData, DisconnectKind, DisconnectReason, DriverEvent},
    Config,
};
use flume::{Receiver, RecvError, Sender};
use message::*;
use tokio::spawn;
use tracing::{debug, instrument, trace};

pub(crate) fn start(
    config: Config,
    rx: Receiver<CoreMessage>,
    tx: Sender<CoreMessage>,
    events: Sender<DriverEvent>,
) {
    spawn(async move {
        trace!("Driver started.");
        runner(config, rx, tx, events).await;
        trace!("Driver finished.");
    });
}

fn start_internals(core: Sender<CoreMessage>) -> Interconnect {
    let (udp_msg_tx, udp_msg_rx) = flume::unbounded();

    let interconnect = Interconnect {
        core,
        udp_tx: udp_msg_tx,
    };

    spawn(udp_tx::runner(udp_msg_rx));

    interconnect
}

#[instrument(skip(rx, tx, events))]
async fn runner(
    config: Config,
    rx: Receiver<CoreMessage>,
    tx: Sender<CoreMessage>,
    events: Sender<DriverEvent>,
) {
    let mut connection: Option<Connection> = None;
    let mut state = ConnectionState::Disconnected;
    let mut attempt_idx = 0_usize;
    let interconnect = start_internals(tx);

    loop {
        match rx.recv_async().await {
            Ok(CoreMessage::ConnectWithResult(entry, result_tx)) => {
                if connection.take().is_some() {
                    drop(interconnect.udp_tx.send(UdpTxMessage::DropConn));
                }

                state = ConnectionState::Connecting;
                attempt_idx = attempt_idx.wrapping_add(1);

                let guild_id = entry.guild_id;
                let session_id = entry.session_id.clone();

                match Connection::new(entry, &interconnect, &config, attempt_idx).await {
                    Ok(conn) => {
                        state = ConnectionState::Connected;

                        drop(events.send(DriverEvent::Connect(ConnectData {
                            guild_id,
                            session_id,
                            ssrc: conn.ssrc,
                        })));

                        connection = Some(conn);

                        // Other side may not be listening: this is fine.
                        let _ = result_tx.send(Ok(()));
                    },
                    Err(why) => {
                        state = ConnectionState::Disconnected;

                        drop(events.send(DriverEvent::Disconnect(DisconnectData {
                            kind: DisconnectKind::Connect,
                            reason: Some(DisconnectReason::from(&why)),
                            guild_id,
                            session_id,
                        })));

                        // See above.
                        let _ = result_tx.send(Err(why));
                    },
                }
            },
            Ok(CoreMessage::Disconnect) => {
                state = ConnectionState::Disconnected;

                if let Some(conn) = connection.take() {
                    drop(interconnect.udp_tx.send(UdpTxMessage::DropConn));
                    drop(events.send(DriverEvent::Disconnect(DisconnectData {
                        kind: DisconnectKind::Runtime,
                        reason: None,
                        guild_id: conn.entry.guild_id,
                        session_id: conn.entry.session_id.clone(),
                    })));
                }
            },
            Ok(CoreMessage::Play(frame)) => {
                if state == ConnectionState::Connected {
                    drop(interconnect.udp_tx.send(UdpTxMessage::Frame(frame)));
                } else {
                    trace!("Audio frame discarded outside a connected session.");
                }
            },
            Ok(CoreMessage::Stop) => {
                drop(interconnect.udp_tx.send(UdpTxMessage::Stop));
            },
            Ok(CoreMessage::Reconnect) => {
                if let Some(mut conn) = connection.take() {
                    state = ConnectionState::Resuming;

                    match conn.resume(&config).await {
                        Ok(()) => {
                            state = ConnectionState::Connected;
                            connection = Some(conn);
                        },
                        Err(why) => {
                            state = ConnectionState::Disconnected;

                            drop(interconnect.udp_tx.send(UdpTxMessage::DropConn));
                            drop(events.send(DriverEvent::Disconnect(DisconnectData {
                                kind: DisconnectKind::Reconnect,
                                reason: Some(DisconnectReason::from(&why)),
                                guild_id: conn.entry.guild_id,
                                session_id: conn.entry.session_id.clone(),
                            })));
                        },
                    }
                }
            },
            Ok(CoreMessage::SignalWsClosure(idx, reason)) => {
                // Stale signals from a replaced ws task must not touch the
                // live connection.
                if idx != attempt_idx {
                    debug!("Ignored closure signal from stale attempt {idx}.");
                    continue;
                }

                if let Some(conn) = connection.take() {
                    state = ConnectionState::Disconnected;

                    drop(interconnect.udp_tx.send(UdpTxMessage::DropConn));
                    drop(events.send(DriverEvent::Disconnect(DisconnectData {
                        kind: DisconnectKind::Runtime,
                        reason,
                        guild_id: conn.entry.guild_id,
                        session_id: conn.entry.session_id.clone(),
                    })));
                }
            },
            Err(RecvError::Disconnected) | Ok(CoreMessage::Poison) => {
                break;
            },
        }
    }

    state = ConnectionState::Closed;
    debug!("Voice driver wound down ({state:?}).");

    interconnect.poison_all();
}
