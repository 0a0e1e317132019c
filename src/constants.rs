//! Constants affecting driver function and API handling.

use discortp::rtp::RtpType;
use std::time::Duration;

/// The voice gateway version requested during the WebSocket upgrade.
pub const VOICE_GATEWAY_VERSION: u8 = 3;

/// Sample rate of audio to be sent to the voice server.
pub const SAMPLE_RATE_RAW: usize = 48_000;

/// Number of audio frames/packets to be sent per second.
pub const AUDIO_FRAME_RATE: usize = 50;

/// Number of samples in one complete frame of audio per channel.
pub const MONO_FRAME_SIZE: usize = SAMPLE_RATE_RAW / AUDIO_FRAME_RATE;

/// Maximum packet size for a voice packet.
///
/// Set a safe amount below the Ethernet MTU to avoid fragmentation/rejection.
pub const VOICE_PACKET_MAX: usize = 1460;

/// Delay between sends of UDP keepalive frames.
///
/// These fire on a fixed schedule irrespective of outgoing RTP traffic,
/// keeping NAT mappings alive through quiet spells.
pub const UDP_KEEPALIVE_GAP_MS: u64 = 5_000;

/// Type-converted delay between sends of UDP keepalive frames.
pub const UDP_KEEPALIVE_GAP: Duration = Duration::from_millis(UDP_KEEPALIVE_GAP_MS);

/// The one (and only) RTP version.
pub const RTP_VERSION: u8 = 2;

/// Profile type used by the voice server's Opus audio traffic.
pub const RTP_PROFILE_TYPE: RtpType = RtpType::Dynamic(120);

/// Size of both halves of the NAT-reflection exchange on the media socket.
pub const DISCOVERY_PACKET_SIZE: usize = 70;

/// Receive window granted to each IP discovery request before it is re-sent.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_millis(200);

/// Number of additional IP discovery requests sent after the first goes unanswered.
pub const DISCOVERY_RETRY_LIMIT: usize = 5;
