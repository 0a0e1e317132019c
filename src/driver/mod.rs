//! Runner for a voice connection.
//!
//! The driver splits one session across three cooperating tasks: a core task
//! owning connection lifecycle, an auxiliary network task speaking the
//! control protocol and its keep-alive, and a transmit task packetizing and
//! encrypting audio onto the media socket.

pub(crate) mod connection;
mod crypto;
pub(crate) mod tasks;

pub use crypto::{ENCRYPTION_MODE, KEY_SIZE, NONCE_SIZE, TAG_SIZE};

use crate::{
    error::{ConnectionError as Error, ConnectionResult as Result},
    events::DriverEvent,
    info::SessionEntry,
    Config,
};
use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use flume::{r#async::RecvFut, Receiver, SendError, Sender};
use tasks::message::CoreMessage;
use tracing::instrument;

/// The control object for a voice connection, handling negotiation,
/// keep-alive, packet encryption, and RTP transmission.
#[derive(Clone, Debug)]
pub struct Driver {
    config: Config,
    events: Receiver<DriverEvent>,
    sender: Sender<CoreMessage>,
}

impl Driver {
    /// Creates a new voice driver.
    ///
    /// This will create the core voice tasks in the background.
    #[inline]
    pub fn new(config: Config) -> Self {
        let (sender, events) = Self::start_inner(config.clone());

        Driver {
            config,
            events,
            sender,
        }
    }

    fn start_inner(config: Config) -> (Sender<CoreMessage>, Receiver<DriverEvent>) {
        let (tx, rx) = flume::unbounded();
        let (evt_tx, evt_rx) = flume::unbounded();

        tasks::start(config, rx, tx.clone(), evt_tx);

        (tx, evt_rx)
    }

    fn restart_inner(&mut self) {
        let (sender, events) = Self::start_inner(self.config.clone());
        self.sender = sender;
        self.events = events;
    }

    /// Connects to the voice server described by `entry`.
    ///
    /// This method instantly contacts the driver tasks, and does not need to
    /// be `await`ed to start the actual negotiation. The returned future
    /// resolves exactly once: with `Ok(())` after the session key is
    /// installed and audio may flow, or with the failure that ended the
    /// attempt.
    #[instrument(skip(self))]
    pub fn connect(&mut self, entry: SessionEntry) -> Connect {
        let (tx, rx) = flume::bounded(1);

        self.raw_connect(entry, tx);

        Connect {
            inner: rx.into_recv_async(),
        }
    }

    #[instrument(skip(self))]
    pub(crate) fn raw_connect(&mut self, entry: SessionEntry, tx: Sender<Result<()>>) {
        self.send(CoreMessage::ConnectWithResult(entry, tx));
    }

    /// Submits one Opus-encoded audio frame for transmission.
    ///
    /// Frames are sequenced, encrypted, and emitted in submission order.
    /// Must only be called once a [`connect`] has resolved successfully;
    /// frames submitted outside a live session are discarded.
    ///
    /// [`connect`]: Driver::connect
    #[instrument(skip(self, frame))]
    pub fn play(&mut self, frame: AudioFrame) {
        self.send(CoreMessage::Play(frame));
    }

    /// Asserts that this client has stopped speaking.
    ///
    /// The next [`play`] will raise the speaking flag again before any
    /// audio is emitted.
    ///
    /// [`play`]: Driver::play
    #[instrument(skip(self))]
    pub fn stop(&mut self) {
        self.send(CoreMessage::Stop);
    }

    /// Leaves the current voice call, tearing down the session.
    #[instrument(skip(self))]
    pub fn leave(&mut self) {
        self.send(CoreMessage::Disconnect);
    }

    /// Returns a stream of lifecycle notifications for this driver's
    /// sessions.
    ///
    /// Mid-session failures (e.g., the voice server closing the control
    /// channel) surface here after [`connect`] has already resolved.
    ///
    /// [`connect`]: Driver::connect
    pub fn events(&self) -> Receiver<DriverEvent> {
        self.events.clone()
    }

    /// Sends a message to the inner tasks, restarting them if necessary.
    fn send(&mut self, status: CoreMessage) {
        // Restart thread if it errored.
        if let Err(SendError(status)) = self.sender.send(status) {
            self.restart_inner();

            self.sender.send(status).unwrap();
        }
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl Drop for Driver {
    /// Leaves the current call, if connected to one, and winds down the
    /// background tasks.
    fn drop(&mut self) {
        self.leave();
        let _ = self.sender.send(CoreMessage::Poison);
    }
}

/// One Opus-encoded audio frame, ready for packetization.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AudioFrame {
    /// The encoded audio bytes, treated as opaque.
    pub data: Vec<u8>,
    /// Number of PCM samples this frame represents per channel
    /// (960 for a 20 ms frame at 48 kHz).
    pub samples: u32,
}

/// Future for a call to [`Driver::connect`].
///
/// This future awaits the *result* of a connection; the driver
/// is messaged at the time of the call.
///
/// [`Driver::connect`]: Driver::connect
pub struct Connect {
    inner: RecvFut<'static, Result<()>>,
}

impl Future for Connect {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(r) => Poll::Ready(r.map_err(|_| Error::AttemptDiscarded).and_then(|x| x)),
            Poll::Pending => Poll::Pending,
        }
    }
}
