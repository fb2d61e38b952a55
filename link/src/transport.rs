//! Transport seam between the reconnect state machine and the socket.
//!
//! [`ReconnectingChannel`](crate::ReconnectingChannel) only talks to the
//! network through [`Transport`] and [`TransportConnection`]. The default
//! implementation, [`WsTransport`], speaks WebSocket via `tokio-tungstenite`;
//! tests plug in scripted transports through the same traits.

use crate::{
    error::{Result, TwinLinkError},
    event_handlers::CloseReason,
};
use bytes::Bytes;
use futures_util::{future::BoxFuture, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        error::Error as WsError,
        protocol::{frame::coding::CloseCode, CloseFrame, Message},
    },
    MaybeTlsStream,
};
use url::Url;

type WebSocketStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Maximum text frame size accepted from the server (16 MiB).
pub(crate) const MAX_TEXT_FRAME_BYTES: usize = 16 << 20;

/// A single frame on the wire, independent of the socket library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// Peer-initiated close, with the close frame details when present.
    Close(Option<CloseReason>),
}

/// Opens transport connections to an endpoint.
pub trait Transport: Send + Sync + 'static {
    /// Open a new connection. The returned future resolves once the
    /// connection is usable, or fails if it could not be established.
    fn open(&self, endpoint: &str) -> BoxFuture<'static, Result<Box<dyn TransportConnection>>>;
}

/// An open, exclusively owned transport connection.
pub trait TransportConnection: Send {
    /// Write one frame.
    fn send(&mut self, frame: Frame) -> BoxFuture<'_, Result<()>>;

    /// Read the next frame. `None` means the stream ended.
    fn recv(&mut self) -> BoxFuture<'_, Option<Result<Frame>>>;

    /// Close the connection with a normal close frame.
    fn close(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// Normalise an endpoint URI into a `ws://` / `wss://` URL.
///
/// `http`/`https` are rewritten to `ws`/`wss`; any other scheme, a missing
/// host, or embedded credentials are rejected.
pub fn normalize_endpoint(endpoint: &str) -> Result<String> {
    let mut url = Url::parse(endpoint.trim()).map_err(|e| {
        TwinLinkError::ConfigurationError(format!("Invalid endpoint '{}': {}", endpoint, e))
    })?;

    let ws_scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TwinLinkError::ConfigurationError(format!(
                "Unsupported endpoint scheme '{}'; expected ws(s) or http(s)",
                other
            )));
        },
    };

    if url.host_str().is_none() {
        return Err(TwinLinkError::ConfigurationError(
            "Endpoint must include a host".to_string(),
        ));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(TwinLinkError::ConfigurationError(
            "Endpoint must not embed credentials".to_string(),
        ));
    }

    url.set_scheme(ws_scheme).map_err(|_| {
        TwinLinkError::ConfigurationError("Failed to set WebSocket URL scheme".to_string())
    })?;
    url.set_fragment(None);

    Ok(url.to_string())
}

/// WebSocket transport backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl Transport for WsTransport {
    fn open(&self, endpoint: &str) -> BoxFuture<'static, Result<Box<dyn TransportConnection>>> {
        let endpoint = endpoint.to_string();
        Box::pin(async move {
            log::debug!("[twin-link] Opening WebSocket connection to {}", endpoint);
            let request = endpoint.as_str().into_client_request().map_err(|e| {
                TwinLinkError::WebSocketError(format!("Failed to build WebSocket request: {}", e))
            })?;

            let (stream, _response) = connect_async(request).await.map_err(map_connect_error)?;
            Ok(Box::new(WsConnection { stream }) as Box<dyn TransportConnection>)
        })
    }
}

fn map_connect_error(err: WsError) -> TwinLinkError {
    match err {
        WsError::Http(response) => {
            let message = match response.status().as_u16() {
                401 => "Unauthorized: WebSocket requires valid credentials".to_string(),
                403 => "Forbidden: Access to WebSocket denied".to_string(),
                code => format!("WebSocket HTTP error: {}", code),
            };
            TwinLinkError::WebSocketError(message)
        },
        other => TwinLinkError::WebSocketError(format!("Connection failed: {}", other)),
    }
}

struct WsConnection {
    stream: WebSocketStream,
}

impl TransportConnection for WsConnection {
    fn send(&mut self, frame: Frame) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.stream
                .send(frame_to_message(frame))
                .await
                .map_err(|e| TwinLinkError::WebSocketError(format!("Failed to send frame: {}", e)))
        })
    }

    fn recv(&mut self) -> BoxFuture<'_, Option<Result<Frame>>> {
        Box::pin(async move {
            loop {
                match self.stream.next().await? {
                    Ok(Message::Frame(_)) => continue,
                    Ok(message) => return Some(Ok(message_to_frame(message))),
                    Err(e) => return Some(Err(TwinLinkError::WebSocketError(e.to_string()))),
                }
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: "client closed".into(),
            };
            match self.stream.close(Some(frame)).await {
                Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
                Err(e) => Err(TwinLinkError::WebSocketError(format!(
                    "Failed to close WebSocket: {}",
                    e
                ))),
            }
        })
    }
}

fn frame_to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(data) => Message::Binary(Bytes::from(data)),
        Frame::Ping(data) => Message::Ping(Bytes::from(data)),
        Frame::Pong(data) => Message::Pong(Bytes::from(data)),
        Frame::Close(reason) => Message::Close(reason.map(|r| CloseFrame {
            code: r.code.map(CloseCode::from).unwrap_or(CloseCode::Normal),
            reason: r.message.into(),
        })),
    }
}

fn message_to_frame(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Text(text.as_str().to_owned()),
        Message::Binary(data) => Frame::Binary(data.to_vec()),
        Message::Ping(data) => Frame::Ping(data.to_vec()),
        Message::Pong(data) => Frame::Pong(data.to_vec()),
        Message::Close(frame) => Frame::Close(
            frame.map(|f| CloseReason::with_code(f.reason.as_str(), f.code.into())),
        ),
        // Raw frames are filtered out by `recv`.
        Message::Frame(_) => Frame::Binary(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint_rewrites_http_schemes() {
        assert_eq!(
            normalize_endpoint("http://localhost:8000/ws/sensors/").unwrap(),
            "ws://localhost:8000/ws/sensors/"
        );
        assert_eq!(
            normalize_endpoint(" https://twin.example.com/ws/plant/4/#top ").unwrap(),
            "wss://twin.example.com/ws/plant/4/"
        );
        assert_eq!(
            normalize_endpoint("wss://twin.example.com/ws/sensors/").unwrap(),
            "wss://twin.example.com/ws/sensors/"
        );
    }

    #[test]
    fn test_normalize_endpoint_rejects_bad_input() {
        assert!(matches!(
            normalize_endpoint("ftp://example.com"),
            Err(TwinLinkError::ConfigurationError(_))
        ));
        assert!(matches!(
            normalize_endpoint("not a url"),
            Err(TwinLinkError::ConfigurationError(_))
        ));
        assert!(matches!(
            normalize_endpoint("ws://user:secret@example.com/ws"),
            Err(TwinLinkError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_close_frame_conversion_keeps_code() {
        let message = Message::Close(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "server restart".into(),
        }));
        assert_eq!(
            message_to_frame(message),
            Frame::Close(Some(CloseReason::with_code("server restart", 1001)))
        );
    }

    #[test]
    fn test_text_frame_conversion() {
        let message = frame_to_message(Frame::Text("{\"type\":\"ping\"}".into()));
        assert_eq!(message_to_frame(message), Frame::Text("{\"type\":\"ping\"}".into()));
    }
}
