pub mod error;

use super::{
    crypto::ENCRYPTION_MODE,
    tasks::{
        message::*,
        ws::{self as ws_task, AuxNetwork},
    },
};
use crate::{
    constants::*,
    endpoint,
    info::SessionEntry,
    model::{
        payload::{Identify, ProtocolData, Resume, SelectProtocol, SessionDescription},
        Event as GatewayEvent,
    },
    ws::WsStream,
    Config,
};
use crypto_secretbox::{KeyInit, XSalsa20Poly1305 as Cipher};
use error::{Error, Result};
use flume::Sender;
use socket2::Socket;
use std::{net::IpAddr, str::FromStr, time::Duration};
use tokio::{
    net::UdpSocket,
    spawn,
    time::timeout,
};
use tracing::{debug, info, instrument};
use url::Url;

/// Progress of the session relative to its voice server.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Resuming,
    Closed,
}

pub(crate) struct Connection {
    pub(crate) entry: SessionEntry,
    pub(crate) ssrc: u32,
    pub(crate) ws: Sender<WsMessage>,
}

impl Connection {
    pub(crate) async fn new(
        entry: SessionEntry,
        interconnect: &Interconnect,
        config: &Config,
        idx: usize,
    ) -> Result<Connection> {
        if let Some(t) = config.driver_timeout {
            timeout(t, Connection::new_inner(entry, interconnect, idx)).await?
        } else {
            Connection::new_inner(entry, interconnect, idx).await
        }
    }

    async fn new_inner(
        entry: SessionEntry,
        interconnect: &Interconnect,
        idx: usize,
    ) -> Result<Connection> {
        let host = endpoint::host(&entry.endpoint)?;
        let url = generate_url(host)?;

        let mut client = WsStream::connect(url).await?;

        client
            .send_json(&GatewayEvent::from(Identify {
                server_id: entry.guild_id,
                session_id: entry.session_id.clone(),
                token: entry.token.clone(),
                user_id: entry.user_id,
            }))
            .await?;

        let mut hello = None;
        let mut ready = None;

        loop {
            let Some(value) = client.recv_json().await? else {
                continue;
            };

            match value {
                GatewayEvent::Ready(r) => {
                    ready = Some(r);
                    if hello.is_some() {
                        break;
                    }
                },
                GatewayEvent::Hello(h) => {
                    hello = Some(h);
                    if ready.is_some() {
                        break;
                    }
                },
                other => {
                    debug!("Expected ready/hello; got: {:?}", other);
                },
            }
        }

        let hello =
            hello.expect("Hello packet expected in connection initialisation, but not found.");
        let ready =
            ready.expect("Ready packet expected in connection initialisation, but not found.");

        let udp = UdpSocket::bind("0.0.0.0:0").await?;

        // The media path is send-only once discovery completes: shrink the
        // receive buffer to what the OS floor allows.
        let udp = {
            let socket = Socket::from(udp.into_std()?);

            #[cfg(not(target_os = "macos"))]
            socket.set_recv_buffer_size(0)?;

            UdpSocket::from_std(socket.into())?
        };

        udp.connect((host, ready.port)).await?;

        // Learn this socket's externally observed address, in case NAT
        // tunnelling is needed.
        let (ext_ip, ext_port) = ip_discovery(&udp, ready.ssrc).await?;

        client
            .send_json(&GatewayEvent::from(SelectProtocol {
                protocol: "udp".into(),
                data: ProtocolData {
                    address: ext_ip,
                    mode: ENCRYPTION_MODE.into(),
                    port: ext_port,
                },
            }))
            .await?;

        let cipher = init_cipher(&mut client).await?;

        info!("Connected to: {}", entry.endpoint);
        info!("WS heartbeat duration {}ms.", hello.heartbeat_interval);

        let (ws_msg_tx, ws_msg_rx) = flume::unbounded();
        let ssrc = ready.ssrc;

        interconnect.udp_tx.send(UdpTxMessage::SetConn(TxConnection {
            cipher,
            ssrc,
            udp_tx: udp,
            ws: ws_msg_tx.clone(),
        }))?;

        let ws_state = AuxNetwork::new(
            ws_msg_rx,
            client,
            adjusted_heartbeat_interval(hello.heartbeat_interval),
            idx,
        );

        spawn(ws_task::runner(interconnect.clone(), ws_state));

        Ok(Connection {
            entry,
            ssrc,
            ws: ws_msg_tx,
        })
    }

    #[instrument(skip(self))]
    pub(crate) async fn resume(&mut self, config: &Config) -> Result<()> {
        if let Some(t) = config.driver_timeout {
            timeout(t, self.resume_inner()).await?
        } else {
            self.resume_inner().await
        }
    }

    async fn resume_inner(&mut self) -> Result<()> {
        let host = endpoint::host(&self.entry.endpoint)?;
        let url = generate_url(host)?;

        let mut client = WsStream::connect(url).await?;

        client
            .send_json(&GatewayEvent::from(Resume {
                server_id: self.entry.guild_id,
                session_id: self.entry.session_id.clone(),
                token: self.entry.token.clone(),
            }))
            .await?;

        let mut hello = None;
        let mut resumed = None;

        loop {
            let Some(value) = client.recv_json().await? else {
                continue;
            };

            match value {
                GatewayEvent::Resumed => {
                    resumed = Some(());
                    if hello.is_some() {
                        break;
                    }
                },
                GatewayEvent::Hello(h) => {
                    hello = Some(h);
                    if resumed.is_some() {
                        break;
                    }
                },
                other => {
                    debug!("Expected resumed/hello; got: {:?}", other);
                },
            }
        }

        let hello =
            hello.expect("Hello packet expected in connection resumption, but not found.");

        self.ws.send(WsMessage::SetKeepalive(adjusted_heartbeat_interval(
            hello.heartbeat_interval,
        )))?;
        self.ws.send(WsMessage::Ws(Box::new(client)))?;

        info!("Resumed session with: {}", self.entry.endpoint);
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        info!("Disconnected");
    }
}

fn generate_url(host: &str) -> Result<Url> {
    Url::parse(&format!("wss://{host}/?v={VOICE_GATEWAY_VERSION}"))
        .or(Err(Error::MalformedEndpoint))
}

/// The advertised interval overruns the server's ack window in practice;
/// beat at three quarters of it.
fn adjusted_heartbeat_interval(interval_ms: u32) -> Duration {
    Duration::from_millis(u64::from(interval_ms / 4) * 3)
}

/// Learns the socket's externally observed address and port from the media
/// server.
///
/// Each request is a 70-byte datagram carrying the SSRC big-endian in its
/// first four bytes; the reply echoes the SSRC, then the external IP as a
/// NUL-terminated ASCII string from byte 4, then the external port
/// little-endian in bytes 68..70.
async fn ip_discovery(udp: &UdpSocket, ssrc: u32) -> Result<(IpAddr, u16)> {
    let mut request = [0u8; DISCOVERY_PACKET_SIZE];
    request[..4].copy_from_slice(&ssrc.to_be_bytes());

    for attempt in 0..=DISCOVERY_RETRY_LIMIT {
        udp.send(&request).await?;

        match timeout(DISCOVERY_TIMEOUT, recv_discovery_reply(udp, ssrc)).await {
            Ok(reply) => return reply,
            Err(_) => debug!("IP discovery request {} went unanswered.", attempt + 1),
        }
    }

    Err(Error::IpDiscoveryFailed)
}

async fn recv_discovery_reply(udp: &UdpSocket, ssrc: u32) -> Result<(IpAddr, u16)> {
    let mut reply = [0u8; DISCOVERY_PACKET_SIZE];

    loop {
        let len = udp.recv(&mut reply).await?;
        if len < DISCOVERY_PACKET_SIZE {
            continue;
        }

        // Anything not echoing our SSRC is stray traffic on the socket.
        if reply[..4] != ssrc.to_be_bytes() {
            continue;
        }

        let address_raw = &reply[4..DISCOVERY_PACKET_SIZE - 2];
        let nul_byte_index = address_raw
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::IpDiscoveryFailed)?;

        let address_str = std::str::from_utf8(&address_raw[..nul_byte_index])
            .map_err(|_| Error::IpDiscoveryFailed)?;
        let address = IpAddr::from_str(address_str).map_err(|_| Error::IpDiscoveryFailed)?;

        let port = u16::from_le_bytes([
            reply[DISCOVERY_PACKET_SIZE - 2],
            reply[DISCOVERY_PACKET_SIZE - 1],
        ]);

        return Ok((address, port));
    }
}

async fn init_cipher(client: &mut WsStream) -> Result<Cipher> {
    loop {
        let Some(value) = client.recv_json().await? else {
            continue;
        };

        match value {
            GatewayEvent::SessionDescription(desc) => {
                return cipher_from_description(&desc);
            },
            other => {
                debug!(
                    "Expected session description for key; got: op{}/v{:?}",
                    other.kind() as u8,
                    other
                );
            },
        }
    }
}

fn cipher_from_description(desc: &SessionDescription) -> Result<Cipher> {
    if desc.mode != ENCRYPTION_MODE {
        return Err(Error::UnsupportedMode(desc.mode.clone()));
    }

    Cipher::new_from_slice(&desc.secret_key).map_err(|_| Error::BadSecretKeyLength)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::crypto::KEY_SIZE;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[test]
    fn url_targets_the_versioned_gateway_path() {
        let url = generate_url("eu-west42.voice.example.gg").unwrap();

        assert_eq!(url.as_str(), "wss://eu-west42.voice.example.gg/?v=3");
    }

    #[test]
    fn heartbeat_interval_is_three_quarters_floored() {
        assert_eq!(adjusted_heartbeat_interval(41_250), Duration::from_millis(30_936));
        assert_eq!(adjusted_heartbeat_interval(40_000), Duration::from_millis(30_000));
        assert_eq!(adjusted_heartbeat_interval(3), Duration::ZERO);
    }

    #[test]
    fn key_install_accepts_only_the_offered_mode() {
        let desc = SessionDescription {
            mode: "aead_aes256_gcm".into(),
            secret_key: vec![1; KEY_SIZE],
        };

        assert!(matches!(
            cipher_from_description(&desc),
            Err(Error::UnsupportedMode(_))
        ));
    }

    #[test]
    fn key_install_requires_32_bytes() {
        let desc = SessionDescription {
            mode: ENCRYPTION_MODE.into(),
            secret_key: vec![1; KEY_SIZE - 1],
        };

        assert!(matches!(
            cipher_from_description(&desc),
            Err(Error::BadSecretKeyLength)
        ));

        let desc = SessionDescription {
            mode: ENCRYPTION_MODE.into(),
            secret_key: vec![1; KEY_SIZE],
        };

        assert!(cipher_from_description(&desc).is_ok());
    }

    async fn discovery_pair() -> (UdpSocket, UdpSocket) {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.connect(server.local_addr().unwrap()).await.unwrap();

        (server, client)
    }

    fn reflection_of(request: &[u8], address: &[u8], port: u16) -> [u8; DISCOVERY_PACKET_SIZE] {
        let mut reply = [0u8; DISCOVERY_PACKET_SIZE];
        reply[..4].copy_from_slice(&request[..4]);
        reply[4..4 + address.len()].copy_from_slice(address);
        reply[68..].copy_from_slice(&port.to_le_bytes());

        reply
    }

    #[tokio::test]
    async fn discovery_parses_the_reflected_address() {
        let (server, client) = discovery_pair().await;
        let ssrc = 0x1122_3344;

        let peer = tokio::spawn(async move {
            let mut buf = [0u8; DISCOVERY_PACKET_SIZE];
            let (len, addr) = server.recv_from(&mut buf).await.unwrap();

            assert_eq!(len, DISCOVERY_PACKET_SIZE);
            assert_eq!(buf[..4], 0x1122_3344u32.to_be_bytes());
            assert!(buf[4..].iter().all(|&b| b == 0));

            let reply = reflection_of(&buf, b"1.2.3.4\0", 2000);
            server.send_to(&reply, addr).await.unwrap();
        });

        let (ip, port) = ip_discovery(&client, ssrc).await.unwrap();

        assert_eq!(ip, IpAddr::from_str("1.2.3.4").unwrap());
        assert_eq!(port, 2000);
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn discovery_retries_until_answered() {
        let (server, client) = discovery_pair().await;

        let peer = tokio::spawn(async move {
            let mut buf = [0u8; DISCOVERY_PACKET_SIZE];

            // Let four requests rot before answering the fifth.
            for _ in 0..4 {
                server.recv_from(&mut buf).await.unwrap();
            }
            let (_, addr) = server.recv_from(&mut buf).await.unwrap();

            let reply = reflection_of(&buf, b"203.0.113.9\0", 50_123);
            server.send_to(&reply, addr).await.unwrap();
        });

        let (ip, port) = ip_discovery(&client, 7).await.unwrap();

        assert_eq!(ip, IpAddr::from_str("203.0.113.9").unwrap());
        assert_eq!(port, 50_123);
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn discovery_gives_up_after_six_requests() {
        let (server, client) = discovery_pair().await;
        let seen = Arc::new(AtomicUsize::new(0));

        let peer_seen = seen.clone();
        let peer = tokio::spawn(async move {
            let mut buf = [0u8; DISCOVERY_PACKET_SIZE];
            loop {
                server.recv_from(&mut buf).await.unwrap();
                peer_seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert!(matches!(
            ip_discovery(&client, 7).await,
            Err(Error::IpDiscoveryFailed)
        ));
        assert_eq!(seen.load(Ordering::SeqCst), 1 + DISCOVERY_RETRY_LIMIT);
        peer.abort();
    }

    #[tokio::test]
    async fn discovery_ignores_replies_for_foreign_ssrcs() {
        let (server, client) = discovery_pair().await;
        let ssrc = 99;

        let peer = tokio::spawn(async move {
            let mut buf = [0u8; DISCOVERY_PACKET_SIZE];
            let (_, addr) = server.recv_from(&mut buf).await.unwrap();

            let mut stray = reflection_of(&buf, b"9.9.9.9\0", 9999);
            stray[..4].copy_from_slice(&1234u32.to_be_bytes());
            server.send_to(&stray, addr).await.unwrap();

            let reply = reflection_of(&buf, b"1.2.3.4\0", 2000);
            server.send_to(&reply, addr).await.unwrap();
        });

        let (ip, port) = ip_discovery(&client, ssrc).await.unwrap();

        assert_eq!(ip, IpAddr::from_str("1.2.3.4").unwrap());
        assert_eq!(port, 2000);
        peer.await.unwrap();
    }

    #[tokio::test]
    async fn discovery_rejects_unterminated_addresses() {
        let (server, client) = discovery_pair().await;

        let peer = tokio::spawn(async move {
            let mut buf = [0u8; DISCOVERY_PACKET_SIZE];
            let (_, addr) = server.recv_from(&mut buf).await.unwrap();

            let mut reply = [0x41u8; DISCOVERY_PACKET_SIZE];
            reply[..4].copy_from_slice(&buf[..4]);
            server.send_to(&reply, addr).await.unwrap();
        });

        assert!(matches!(
            ip_discovery(&client, 7).await,
            Err(Error::IpDiscoveryFailed)
        ));
        peer.await.unwrap();
    }
}
