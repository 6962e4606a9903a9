use crate::config::TransportKind;
use crate::error::AcquireError;
use crate::push::event_socket::EventSocketProtocol;
use crate::push::stomp::StompProtocol;
use crate::push::subscriptions::Inbound;

/// What one inbound text frame meant.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// The channel is live; subscriptions may be sent.
    Ready,
    Message(Inbound),
    /// Keep-alives, receipts and other frames with nothing to deliver.
    Ignored,
}

/// A push binding: the text protocol spoken over one WebSocket session.
/// A fresh instance is created for every connection attempt.
pub trait Protocol {
    /// Frames to send as soon as the socket is open.
    fn handshake(&mut self) -> Vec<String>;

    /// Whether the channel counts as live without waiting for a `Ready`.
    fn ready_on_open(&self) -> bool;

    /// Frame that subscribes `topic`, or `None` when nothing has to go on
    /// the wire (already subscribed, or the binding has no subscriptions).
    fn subscribe(&mut self, topic: &str) -> Option<String>;

    /// `Parse` errors are recoverable; any other error ends the session.
    fn decode(&mut self, frame: &str) -> Result<Decoded, AcquireError>;
}

pub fn protocol_for(kind: TransportKind, url: &str) -> Box<dyn Protocol> {
    match kind {
        TransportKind::EventSocket => Box::new(EventSocketProtocol::default()),
        TransportKind::Stomp => Box::new(StompProtocol::new(host_of(url))),
    }
}

/// Host (with port) of a `ws://` / `wss://` URL.
pub fn host_of(url: &str) -> String {
    let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    rest.split(['/', '?', '#']).next().unwrap_or(rest).to_string()
}
