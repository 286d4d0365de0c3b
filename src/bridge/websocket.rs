//! WebSocket implementation of the duplex channel traits
//!
//! The HTTP layer performs the upgrade and hands the stream in; the core
//! treats it opaquely beyond send/receive. Remote output travels as binary
//! frames, diagnostics as text frames.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::debug;

use super::error::BridgeError;
use super::protocol::{DuplexSink, DuplexSource};

/// Split an upgraded WebSocket into the two trait halves the bridge pumps
/// operate on.
pub fn split_duplex<S>(ws: WebSocketStream<S>) -> (WsSink<S>, WsSource<S>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (sink, stream) = ws.split();
    (WsSink { sink }, WsSource { stream })
}

pub struct WsSink<S> {
    sink: SplitSink<WebSocketStream<S>, Message>,
}

pub struct WsSource<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

#[async_trait]
impl<S> DuplexSink for WsSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_output(&mut self, data: Bytes) -> Result<(), BridgeError> {
        self.sink
            .send(Message::Binary(data.to_vec()))
            .await
            .map_err(|e| BridgeError::Channel(e.to_string()))
    }

    async fn send_diagnostic(&mut self, line: &str) -> Result<(), BridgeError> {
        self.sink
            .send(Message::Text(line.to_string()))
            .await
            .map_err(|e| BridgeError::Channel(e.to_string()))
    }

    async fn close(&mut self) {
        // The peer may already be gone; nothing to do about a failed close
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

#[async_trait]
impl<S> DuplexSource for WsSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn next_message(&mut self) -> Option<String> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(text),
                Some(Ok(Message::Binary(data))) => {
                    return Some(String::from_utf8_lossy(&data).into_owned())
                }
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Ok(_)) => continue, // ping/pong handled by tungstenite
                Some(Err(e)) => {
                    debug!("WebSocket receive error: {}", e);
                    return None;
                }
            }
        }
    }
}
