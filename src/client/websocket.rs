//! WebSocket binding for [`StreamTransport`] over `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::stream::{StreamConnection, StreamTransport};
use crate::error::{RunAgentError, RunAgentResult};
use crate::utils::url::redact_token;

/// Opens `ws://` / `wss://` connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamTransport for WebSocketTransport {
    async fn connect(&self, url: &str) -> RunAgentResult<Box<dyn StreamConnection>> {
        debug!(url = %redact_token(url), "opening websocket");
        let (socket, _response) = tokio_tungstenite::connect_async(url).await?;
        Ok(Box::new(WebSocketConnection { socket }))
    }
}

/// Binary frames carry the same JSON text as text frames; bytes that are not
/// UTF-8 are rejected rather than rewritten.
fn binary_frame_text(bytes: &[u8]) -> RunAgentResult<String> {
    std::str::from_utf8(bytes).map(str::to_string).map_err(|e| {
        RunAgentError::stream("binary stream frame is not valid UTF-8")
            .with_details(serde_json::json!({ "valid_up_to": e.valid_up_to() }))
            .with_cause(e)
    })
}

/// An open WebSocket. Dropping it drops the TCP connection.
pub struct WebSocketConnection {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl StreamConnection for WebSocketConnection {
    async fn send_text(&mut self, text: String) -> RunAgentResult<()> {
        self.socket.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn next_text(&mut self) -> Option<RunAgentResult<String>> {
        loop {
            match self.socket.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Binary(bytes)) => return Some(binary_frame_text(&bytes)),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "websocket closed by peer");
                    return None;
                }
                // ping/pong are answered by tungstenite
                Ok(_) => continue,
                Err(e) => return Some(Err(RunAgentError::from(e))),
            }
        }
    }

    async fn close(&mut self) -> RunAgentResult<()> {
        match self.socket.close(None).await {
            Ok(()) => Ok(()),
            Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
            | Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn binary_frames_keep_their_bytes() {
        let frame = br#"{"type":"data","payload":"caf\u00e9"}"#;
        assert_eq!(binary_frame_text(frame).unwrap(), r#"{"type":"data","payload":"caf\u00e9"}"#);
        assert_eq!(binary_frame_text("café".as_bytes()).unwrap(), "café");
    }

    #[test]
    fn invalid_utf8_binary_frame_is_a_stream_error() {
        let err = binary_frame_text(&[b'o', b'k', 0xff, 0xfe]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Stream);
        assert_eq!(err.details.unwrap()["valid_up_to"], 2);
    }
}
