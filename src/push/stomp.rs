//! STOMP 1.2 over WebSocket, the broker binding.
//!
//! Only the client side of a subscribe-only session is covered: `CONNECT`,
//! `SUBSCRIBE`, and the server's `CONNECTED`, `MESSAGE`, `RECEIPT` and
//! `ERROR` frames. Every WebSocket text message carries exactly one frame,
//! or a bare EOL heart-beat.

use std::collections::HashSet;

use crate::error::AcquireError;
use crate::push::protocol::{Decoded, Protocol};
use crate::push::subscriptions::Inbound;

#[derive(Debug, Clone, PartialEq)]
pub struct StompFrame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First occurrence wins when a header repeats.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn encode(&self) -> String {
        let escaped = escapes_headers(&self.command);
        let mut out = String::with_capacity(self.command.len() + self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            if escaped {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// `Ok(None)` for heart-beats.
    pub fn parse(text: &str) -> Result<Option<StompFrame>, AcquireError> {
        let text = text.trim_start_matches(['\r', '\n']);
        if text.is_empty() || text == "\0" {
            return Ok(None);
        }
        let (head, rest) = split_head(text)
            .ok_or_else(|| AcquireError::Parse("STOMP frame without header terminator".into()))?;

        let mut lines = head.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
        let command = lines.next().unwrap_or_default().to_string();
        if command.is_empty() {
            return Err(AcquireError::Parse("STOMP frame without command".into()));
        }
        let escaped = escapes_headers(&command);

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| AcquireError::Parse(format!("bad STOMP header line: {line:?}")))?;
            if escaped {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let mut frame = StompFrame {
            command,
            headers,
            body: String::new(),
        };
        frame.body = match frame.get("content-length") {
            Some(len) => {
                let len: usize = len
                    .trim()
                    .parse()
                    .map_err(|_| AcquireError::Parse(format!("bad content-length: {len:?}")))?;
                rest.get(..len)
                    .ok_or_else(|| AcquireError::Parse("STOMP body shorter than content-length".into()))?
                    .to_string()
            }
            None => rest.split('\0').next().unwrap_or_default().to_string(),
        };
        Ok(Some(frame))
    }
}

fn escapes_headers(command: &str) -> bool {
    !matches!(command, "CONNECT" | "CONNECTED")
}

fn split_head(text: &str) -> Option<(&str, &str)> {
    let lf = text.find("\n\n").map(|i| (i, 2));
    let crlf = text.find("\r\n\r\n").map(|i| (i, 4));
    let (at, len) = match (lf, crlf) {
        (Some(a), Some(b)) => {
            if a.0 < b.0 {
                a
            } else {
                b
            }
        }
        (a, b) => a.or(b)?,
    };
    Some((&text[..at], &text[at + len..]))
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> Result<String, AcquireError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                return Err(AcquireError::Parse(format!(
                    "undefined STOMP escape: \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}

/// Client half of a STOMP session. Subscription ids restart at `sub-0` on
/// every connection.
#[derive(Debug)]
pub struct StompProtocol {
    host: String,
    next_id: u32,
    subscribed: HashSet<String>,
}

impl StompProtocol {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            next_id: 0,
            subscribed: HashSet::new(),
        }
    }
}

impl Protocol for StompProtocol {
    fn handshake(&mut self) -> Vec<String> {
        vec![StompFrame::new("CONNECT")
            .header("accept-version", "1.2")
            .header("host", self.host.clone())
            .header("heart-beat", "0,0")
            .encode()]
    }

    fn ready_on_open(&self) -> bool {
        false
    }

    fn subscribe(&mut self, topic: &str) -> Option<String> {
        if !self.subscribed.insert(topic.to_string()) {
            return None;
        }
        let id = format!("sub-{}", self.next_id);
        self.next_id += 1;
        Some(
            StompFrame::new("SUBSCRIBE")
                .header("id", id)
                .header("destination", topic)
                .header("ack", "auto")
                .encode(),
        )
    }

    fn decode(&mut self, text: &str) -> Result<Decoded, AcquireError> {
        let Some(frame) = StompFrame::parse(text)? else {
            return Ok(Decoded::Ignored);
        };
        match frame.command.as_str() {
            "CONNECTED" => Ok(Decoded::Ready),
            "MESSAGE" => {
                let topic = frame
                    .get("destination")
                    .ok_or_else(|| AcquireError::Parse("MESSAGE without destination".into()))?
                    .to_string();
                let payload = serde_json::from_str(&frame.body)
                    .map_err(|e| AcquireError::Parse(format!("{topic}: {e}")))?;
                Ok(Decoded::Message(Inbound { topic, payload }))
            }
            "RECEIPT" => Ok(Decoded::Ignored),
            "ERROR" => {
                let reason = frame
                    .get("message")
                    .map(str::to_string)
                    .unwrap_or_else(|| frame.body.trim().to_string());
                Err(AcquireError::Connection(format!("broker error: {reason}")))
            }
            other => Err(AcquireError::Parse(format!("unexpected STOMP command {other}"))),
        }
    }
}
