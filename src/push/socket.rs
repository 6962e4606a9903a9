use std::pin::Pin;

use futures::future;
use futures::stream::LocalBoxStream;
use futures::{Sink, SinkExt, StreamExt};

use crate::error::AcquireError;

/// Outgoing text frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = AcquireError>>>;
/// Incoming text frames; ends when the socket closes.
pub type FrameStream = LocalBoxStream<'static, Result<String, AcquireError>>;

fn utf8(bytes: Vec<u8>) -> Result<String, AcquireError> {
    String::from_utf8(bytes).map_err(|e| AcquireError::Parse(format!("binary frame: {e}")))
}

/// Opens a WebSocket. Dropping both halves closes it.
#[cfg(feature = "web")]
pub async fn open(url: &str) -> Result<(FrameSink, FrameStream), AcquireError> {
    use gloo_net::websocket::{futures::WebSocket, Message};

    let socket = WebSocket::open(url)
        .map_err(|e| AcquireError::Connection(format!("opening {url}: {e}")))?;
    let (write, read) = socket.split();

    let sink = write
        .sink_map_err(|e| AcquireError::Connection(e.to_string()))
        .with(|text: String| future::ready(Ok::<_, AcquireError>(Message::Text(text))));
    let stream = read.filter_map(|msg| {
        future::ready(match msg {
            Ok(Message::Text(text)) => Some(Ok(text)),
            Ok(Message::Bytes(bytes)) => Some(utf8(bytes)),
            Err(e) => Some(Err(AcquireError::Connection(e.to_string()))),
        })
    });
    Ok((Box::pin(sink), stream.boxed_local()))
}

#[cfg(not(feature = "web"))]
pub async fn open(url: &str) -> Result<(FrameSink, FrameStream), AcquireError> {
    use tokio_tungstenite::tungstenite::Message;

    let (socket, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| AcquireError::Connection(format!("opening {url}: {e}")))?;
    let (write, read) = socket.split();

    let sink = write
        .sink_map_err(|e| AcquireError::Connection(e.to_string()))
        .with(|text: String| future::ready(Ok::<_, AcquireError>(Message::Text(text))));
    let stream = read.filter_map(|msg| {
        future::ready(match msg {
            Ok(Message::Text(text)) => Some(Ok(text)),
            Ok(Message::Binary(bytes)) => Some(utf8(bytes)),
            // ping/pong are answered by tungstenite; close ends the stream
            Ok(_) => None,
            Err(e) => Some(Err(AcquireError::Connection(e.to_string()))),
        })
    });
    Ok((Box::pin(sink), stream.boxed_local()))
}
