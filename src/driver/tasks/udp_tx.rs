use super::message::*;
use crate::{
    constants::*,
    driver::{
        crypto::{self, TAG_SIZE},
        AudioFrame,
    },
};
use discortp::{
    discord::MutableKeepalivePacket,
    rtp::{MutableRtpPacket, RtpPacket},
};
use flume::{Receiver, RecvError};
use tokio::time::{timeout_at, Instant};
use tracing::{error, instrument, trace, warn};

pub(crate) struct UdpTx {
    rx: Receiver<UdpTxMessage>,
    conn: Option<TxConnection>,
    packet: [u8; VOICE_PACKET_MAX],
    keepalive_packet: [u8; MutableKeepalivePacket::minimum_packet_size()],
    keepalive_deadline: Instant,
    speaking: bool,
}

impl UdpTx {
    fn new(rx: Receiver<UdpTxMessage>) -> Self {
        let mut packet = [0u8; VOICE_PACKET_MAX];

        let mut rtp = MutableRtpPacket::new(&mut packet[..]).expect(
            "FATAL: Too few bytes in self.packet for RTP header.\
                (Blame: VOICE_PACKET_MAX?)",
        );
        rtp.set_version(RTP_VERSION);
        rtp.set_payload_type(RTP_PROFILE_TYPE);

        Self {
            rx,
            conn: None,
            packet,
            keepalive_packet: [0u8; MutableKeepalivePacket::minimum_packet_size()],
            keepalive_deadline: Instant::now() + UDP_KEEPALIVE_GAP,
            speaking: false,
        }
    }

    async fn run(&mut self) {
        loop {
            let msg = if self.conn.is_some() {
                match timeout_at(self.keepalive_deadline, self.rx.recv_async()).await {
                    Ok(msg) => msg,
                    Err(_) => {
                        self.send_keepalive().await;
                        continue;
                    },
                }
            } else {
                self.rx.recv_async().await
            };

            match msg {
                Ok(UdpTxMessage::SetConn(conn)) => self.set_conn(conn),
                Ok(UdpTxMessage::DropConn) => {
                    self.conn = None;
                    self.speaking = false;
                },
                Ok(UdpTxMessage::Frame(frame)) => self.play(frame).await,
                Ok(UdpTxMessage::Stop) => self.stop(),
                Ok(UdpTxMessage::Poison) | Err(RecvError::Disconnected) => break,
            }
        }
    }

    fn set_conn(&mut self, conn: TxConnection) {
        let mut rtp = MutableRtpPacket::new(&mut self.packet[..]).expect(
            "FATAL: Too few bytes in self.packet for RTP header.\
                (Blame: VOICE_PACKET_MAX?)",
        );
        rtp.set_ssrc(conn.ssrc);
        rtp.set_sequence(rand::random::<u16>().into());
        rtp.set_timestamp(rand::random::<u32>().into());

        let mut ka = MutableKeepalivePacket::new(&mut self.keepalive_packet[..])
            .expect("FATAL: Insufficient bytes given to keepalive packet.");
        ka.set_ssrc(conn.ssrc);

        self.keepalive_deadline = Instant::now() + UDP_KEEPALIVE_GAP;
        self.speaking = false;
        self.conn = Some(conn);
    }

    async fn play(&mut self, frame: AudioFrame) {
        let Some(conn) = self.conn.as_ref() else {
            trace!("Dropped audio frame: no live connection.");
            return;
        };

        if !self.speaking {
            // The speaking flag must reach the server before any audio does.
            if conn.ws.send(WsMessage::Speaking(true)).is_err() {
                warn!("Dropped audio frame: speaking notification failed.");
                return;
            }
            self.speaking = true;
        }

        self.send_audio(frame).await;
    }

    fn stop(&mut self) {
        self.speaking = false;
        if let Some(conn) = self.conn.as_ref() {
            drop(conn.ws.send(WsMessage::Speaking(false)));
        }
    }

    async fn send_audio(&mut self, frame: AudioFrame) {
        let conn = self
            .conn
            .as_ref()
            .expect("Shouldn't be sending audio without access to a cipher + UDP dest.");

        let header_len = RtpPacket::minimum_packet_size();
        let opus_len = frame.data.len();
        if header_len + opus_len + TAG_SIZE > VOICE_PACKET_MAX {
            error!("Dropped {opus_len} byte audio frame: exceeds the datagram budget.");
            return;
        }

        let total = {
            let (header, body) = self.packet.split_at_mut(header_len);
            body[..opus_len].copy_from_slice(&frame.data);

            let nonce = crypto::header_nonce(header);
            match crypto::encrypt_in_place(&conn.cipher, &nonce, body, opus_len) {
                Ok(payload_len) => header_len + payload_len,
                Err(e) => {
                    // Counters hold still so the dropped frame leaves no gap.
                    error!("Failed to encrypt audio packet: {e:?}.");
                    return;
                },
            }
        };

        if let Err(e) = conn.udp_tx.send(&self.packet[..total]).await {
            error!("Audio packet send error: {e:?}.");
        }

        let mut rtp = MutableRtpPacket::new(&mut self.packet[..]).expect(
            "FATAL: Too few bytes in self.packet for RTP header.\
                (Blame: VOICE_PACKET_MAX?)",
        );
        rtp.set_sequence(rtp.get_sequence() + 1);
        rtp.set_timestamp(rtp.get_timestamp() + frame.samples);
    }

    async fn send_keepalive(&mut self) {
        if let Some(conn) = self.conn.as_ref() {
            trace!("Sending UDP keepalive.");
            if let Err(e) = conn.udp_tx.send(&self.keepalive_packet[..]).await {
                error!("UDP keepalive send error: {e:?}.");
            }
        }

        self.keepalive_deadline += UDP_KEEPALIVE_GAP;
    }
}

#[instrument(skip(rx))]
pub(crate) async fn runner(rx: Receiver<UdpTxMessage>) {
    trace!("UDP transmit handle started.");

    let mut txer = UdpTx::new(rx);
    txer.run().await;

    trace!("UDP transmit handle stopped.");
}
