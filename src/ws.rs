use crate::{error::JsonError, model::Event};

use futures::{SinkExt, StreamExt, TryStreamExt};
use tokio::{
    net::TcpStream,
    time::{timeout, Duration},
};
use tokio_tungstenite::{
    tungstenite::{
        error::Error as TungsteniteError,
        protocol::{CloseFrame, WebSocketConfig as Config},
        Message,
    },
    MaybeTlsStream,
    WebSocketStream,
};
use tracing::{debug, instrument};
use url::Url;

/// The framed JSON message channel to the voice gateway, layered over TLS.
pub struct WsStream(WebSocketStream<MaybeTlsStream<TcpStream>>);

impl WsStream {
    #[instrument]
    pub(crate) async fn connect(url: Url) -> Result<Self> {
        let mut config = Config::default();
        config.max_message_size = None;
        config.max_frame_size = None;

        let (stream, _) =
            tokio_tungstenite::connect_async_with_config(url.as_str(), Some(config), true).await?;

        Ok(Self(stream))
    }

    pub(crate) async fn recv_json(&mut self) -> Result<Option<Event>> {
        const TIMEOUT: Duration = Duration::from_millis(500);

        let ws_message = match timeout(TIMEOUT, self.0.next()).await {
            Ok(Some(Ok(v))) => Some(v),
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(None) | Err(_) => None,
        };

        convert_ws_message(ws_message)
    }

    pub(crate) async fn recv_json_no_timeout(&mut self) -> Result<Option<Event>> {
        convert_ws_message(self.0.try_next().await?)
    }

    pub(crate) async fn send_json(&mut self, value: &Event) -> Result<()> {
        Ok(serde_json::to_string(value)
            .map(Message::Text)
            .map_err(Error::from)
            .map(|m| self.0.send(m))?
            .await?)
    }
}

/// Convenience type for framed-channel error handling.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure modes of the framed channel.
#[derive(Debug)]
pub enum Error {
    /// A message failed to (de)serialize.
    Json(JsonError),

    /// The voice gateway does not support or offer compression; only text
    /// messages are expected.
    UnexpectedBinaryMessage(Vec<u8>),

    /// Transport-level WebSocket failure.
    Ws(TungsteniteError),

    /// The peer closed the channel, with the close frame it supplied.
    WsClosed(Option<CloseFrame<'static>>),
}

impl From<JsonError> for Error {
    fn from(e: JsonError) -> Error {
        Error::Json(e)
    }
}

impl From<TungsteniteError> for Error {
    fn from(e: TungsteniteError) -> Error {
        Error::Ws(e)
    }
}

pub(crate) fn convert_ws_message(message: Option<Message>) -> Result<Option<Event>> {
    Ok(match message {
        Some(Message::Text(payload)) => serde_json::from_str(&payload)
            .map_err(|e| {
                debug!("Unexpected JSON: {e}. Payload: {payload}");
                e
            })
            .ok(),
        Some(Message::Binary(bytes)) => {
            return Err(Error::UnexpectedBinaryMessage(bytes));
        },
        Some(Message::Close(Some(frame))) => {
            return Err(Error::WsClosed(Some(frame)));
        },
        // Ping/Pong message behaviour is internally handled by tungstenite.
        _ => None,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;

    #[test]
    fn close_frames_surface_their_code() {
        let frame = CloseFrame {
            code: WsCloseCode::Library(4015),
            reason: "".into(),
        };

        match convert_ws_message(Some(Message::Close(Some(frame)))) {
            Err(Error::WsClosed(Some(f))) => assert_eq!(f.code, WsCloseCode::Library(4015)),
            other => panic!("expected closed error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_swallowed() {
        let msg = Message::Text("{\"op\": \"not a number\"}".into());

        assert!(matches!(convert_ws_message(Some(msg)), Ok(None)));
    }

    #[test]
    fn binary_messages_are_rejected() {
        let msg = Message::Binary(vec![1, 2, 3]);

        assert!(matches!(
            convert_ws_message(Some(msg)),
            Err(Error::UnexpectedBinaryMessage(_))
        ));
    }
}
