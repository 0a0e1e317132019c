use super::message::*;
use crate::{
    events::DisconnectReason,
    model::{
        payload::{Heartbeat, Speaking},
        CloseCode as VoiceCloseCode,
        Event as GatewayEvent,
        FromPrimitive,
    },
    ws::{Error as WsError, WsStream},
};
use flume::{Receiver, RecvError};
use rand::random;
use std::time::Duration;
use tokio::{
    select,
    time::{sleep_until, Instant},
};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, instrument, trace, warn};

pub(crate) struct AuxNetwork {
    rx: Receiver<WsMessage>,
    ws_client: WsStream,
    dont_send: bool,

    heartbeat_interval: Duration,
    last_heartbeat_nonce: Option<i32>,
    heartbeat_acked: bool,

    attempt_idx: usize,
}

impl AuxNetwork {
    pub(crate) fn new(
        evt_rx: Receiver<WsMessage>,
        ws_client: WsStream,
        heartbeat_interval: Duration,
        attempt_idx: usize,
    ) -> Self {
        Self {
            rx: evt_rx,
            ws_client,
            dont_send: false,

            heartbeat_interval,
            last_heartbeat_nonce: None,
            heartbeat_acked: false,

            attempt_idx,
        }
    }

    #[instrument(skip(self, interconnect))]
    async fn run(&mut self, interconnect: &mut Interconnect) {
        let mut next_heartbeat = Instant::now() + self.heartbeat_interval;

        loop {
            let mut ws_error = false;
            let mut should_resume = false;
            let mut ws_reason = None;

            let hb = sleep_until(next_heartbeat);

            select! {
                () = hb => {
                    if self.liveness_lost() {
                        warn!("Heartbeat deadline elapsed without an ack; dropping session.");
                        drop(interconnect.core.send(CoreMessage::SignalWsClosure(
                            self.attempt_idx,
                            Some(DisconnectReason::WsClosed(Some(VoiceCloseCode::Disconnected))),
                        )));
                        break;
                    }

                    ws_error = match self.send_heartbeat().await {
                        Err(e) => {
                            should_resume = ws_error_is_resumable(&e);
                            ws_reason = Some((&e).into());
                            true
                        },
                        _ => false,
                    };
                    next_heartbeat = self.next_heartbeat();
                }
                ws_msg = self.ws_client.recv_json_no_timeout(), if !self.dont_send => {
                    ws_error = match ws_msg {
                        Err(e) => {
                            should_resume = ws_error_is_resumable(&e);
                            ws_reason = Some((&e).into());
                            true
                        },
                        Ok(Some(msg)) => {
                            self.process_ws(msg);
                            false
                        },
                        _ => false,
                    };
                }
                inner_msg = self.rx.recv_async() => {
                    match inner_msg {
                        Ok(WsMessage::Ws(data)) => {
                            self.ws_client = *data;
                            self.dont_send = false;
                            self.last_heartbeat_nonce = None;
                            self.heartbeat_acked = false;
                            next_heartbeat = self.next_heartbeat();
                        },
                        Ok(WsMessage::SetKeepalive(keepalive)) => {
                            self.heartbeat_interval = keepalive;
                            next_heartbeat = self.next_heartbeat();
                        },
                        Ok(WsMessage::Speaking(speaking)) => {
                            if !self.dont_send {
                                let ssu_status = self.ws_client
                                    .send_json(&GatewayEvent::from(Speaking {
                                        speaking,
                                        delay: Some(0),
                                        ssrc: None,
                                        user_id: None,
                                    }))
                                    .await;

                                ws_error |= match ssu_status {
                                    Err(e) => {
                                        should_resume = ws_error_is_resumable(&e);
                                        ws_reason = Some((&e).into());
                                        true
                                    },
                                    _ => false,
                                }
                            }
                        },
                        Ok(WsMessage::Poison) | Err(RecvError::Disconnected) => {
                            break;
                        },
                    }
                }
            }

            if ws_error {
                self.dont_send = true;

                if should_resume {
                    drop(interconnect.core.send(CoreMessage::Reconnect));
                } else {
                    drop(interconnect.core.send(CoreMessage::SignalWsClosure(
                        self.attempt_idx,
                        ws_reason,
                    )));
                    break;
                }
            }
        }
    }

    fn next_heartbeat(&self) -> Instant {
        Instant::now() + self.heartbeat_interval
    }

    fn liveness_lost(&self) -> bool {
        !self.dont_send && self.last_heartbeat_nonce.is_some() && !self.heartbeat_acked
    }

    async fn send_heartbeat(&mut self) -> Result<(), WsError> {
        let nonce = random::<i32>();
        self.last_heartbeat_nonce = Some(nonce);
        self.heartbeat_acked = false;

        trace!("Sending heartbeat nonce {nonce}.");

        if !self.dont_send {
            self.ws_client
                .send_json(&GatewayEvent::from(Heartbeat { nonce }))
                .await?;
        }

        Ok(())
    }

    fn process_ws(&mut self, value: GatewayEvent) {
        match value {
            GatewayEvent::HeartbeatAck(ev) => {
                self.heartbeat_acked = true;
                if let Some(nonce) = self.last_heartbeat_nonce {
                    if ev.nonce == nonce {
                        trace!("Heartbeat ACK received.");
                    } else {
                        warn!(
                            "Heartbeat nonce mismatch! Expected {}, saw {}.",
                            nonce, ev.nonce
                        );
                    }
                }
            },
            GatewayEvent::Speaking(ev) => {
                trace!("Peer speaking-state update: {:?}.", ev);
            },
            GatewayEvent::ClientDisconnect(ev) => {
                debug!("Client disconnected: {:?}.", ev.user_id);
            },
            GatewayEvent::Resumed => {
                debug!("Voice session resumed.");
            },
            other => {
                trace!("Received other websocket data: {:?}", other);
            },
        }
    }
}

#[instrument(skip(interconnect, aux))]
pub(crate) async fn runner(mut interconnect: Interconnect, mut aux: AuxNetwork) {
    trace!("WS thread started.");
    aux.run(&mut interconnect).await;
    trace!("WS thread finished.");
}

/// Whether a framed-channel failure leaves the session eligible for a resume.
///
/// Recognized voice close codes are terminal and belong to the caller;
/// anything else reads as a transport fault worth one resume attempt.
fn ws_error_is_resumable(err: &WsError) -> bool {
    match err {
        WsError::WsClosed(Some(frame)) => match frame.code {
            CloseCode::Library(l) => VoiceCloseCode::from_u16(l).is_none(),
            _ => true,
        },
        e => {
            debug!("Error sending/receiving ws {:?}.", e);
            true
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    fn closed_with(code: CloseCode) -> WsError {
        WsError::WsClosed(Some(CloseFrame {
            code,
            reason: "".into(),
        }))
    }

    #[test]
    fn recognized_close_codes_are_terminal() {
        assert!(!ws_error_is_resumable(&closed_with(CloseCode::Library(4015))));
        assert!(!ws_error_is_resumable(&closed_with(CloseCode::Library(4006))));
    }

    #[test]
    fn transport_faults_are_resumable() {
        assert!(ws_error_is_resumable(&closed_with(CloseCode::Library(4999))));
        assert!(ws_error_is_resumable(&closed_with(CloseCode::Away)));
        assert!(ws_error_is_resumable(&WsError::WsClosed(None)));
    }
}
