use std::future::Future;

use dioxus::logger::tracing::{debug, info, warn};

use futures::channel::mpsc::UnboundedReceiver;
use futures::future::FusedFuture;
use futures::{pin_mut, select_biased, FutureExt, Sink, SinkExt, Stream, StreamExt};

use crate::config::DashboardConfig;
use crate::error::AcquireError;
use crate::push::protocol::{protocol_for, Decoded, Protocol};
use crate::push::subscriptions::Inbound;
use crate::shared::types::ConnectionState;
use crate::utils::timer::sleep;

/// Requests from the channel handle to its connection task.
#[derive(Debug, Clone, PartialEq)]
pub enum PushCommand {
    /// A handler was registered for this topic.
    Watch(String),
}

/// Where a session reports what happens on the wire.
pub trait SessionObserver {
    fn on_state(&mut self, state: ConnectionState);
    fn on_error(&mut self, error: Option<String>);
    fn on_message(&mut self, message: Inbound);
    /// Topics to subscribe as soon as the channel is live.
    fn topics(&self) -> Vec<String>;
}

/// How a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The owning handle went away; stop for good.
    Released,
}

#[derive(Debug, Default)]
pub struct SessionReport {
    /// Whether the channel became live at some point during the session.
    pub was_ready: bool,
}

/// Drives one open socket until it closes, fails, or the command channel is
/// dropped. The session fails if `ready_deadline` fires before the channel
/// is live. `report.was_ready` tells the caller whether to reset its
/// reconnect budget.
pub async fn run_session<P, S, I, D, O>(
    protocol: &mut P,
    mut outgoing: S,
    incoming: I,
    mut ready_deadline: D,
    commands: &mut UnboundedReceiver<PushCommand>,
    observer: &mut O,
    report: &mut SessionReport,
) -> Result<SessionEnd, AcquireError>
where
    P: Protocol + ?Sized,
    S: Sink<String, Error = AcquireError> + Unpin,
    I: Stream<Item = Result<String, AcquireError>> + Unpin,
    D: FusedFuture<Output = ()> + Unpin,
    O: SessionObserver,
{
    let mut incoming = incoming.fuse();
    for frame in protocol.handshake() {
        outgoing.send(frame).await?;
    }
    if protocol.ready_on_open() {
        go_live(protocol, &mut outgoing, observer, report).await?;
    }

    loop {
        select_biased! {
            frame = incoming.next() => {
                let frame = match frame {
                    Some(frame) => frame?,
                    None => return Err(AcquireError::Connection("socket closed".into())),
                };
                match protocol.decode(&frame) {
                    Ok(Decoded::Ready) => {
                        if !report.was_ready {
                            go_live(protocol, &mut outgoing, observer, report).await?;
                        }
                    }
                    Ok(Decoded::Message(message)) => {
                        if report.was_ready {
                            debug!("[push] message on {}", message.topic);
                            observer.on_message(message);
                        } else {
                            debug!("[push] dropping message on {} before ready", message.topic);
                        }
                    }
                    Ok(Decoded::Ignored) => {}
                    Err(AcquireError::Parse(e)) => warn!("[push] ignoring frame: {e}"),
                    Err(e) => return Err(e),
                }
            }
            command = commands.next() => match command {
                Some(PushCommand::Watch(topic)) => {
                    if report.was_ready {
                        if let Some(frame) = protocol.subscribe(&topic) {
                            outgoing.send(frame).await?;
                        }
                    }
                }
                None => return Ok(SessionEnd::Released),
            },
            () = ready_deadline => {
                if !report.was_ready {
                    return Err(AcquireError::Connection("no handshake reply before the connect timeout".into()));
                }
            }
        }
    }
}

async fn go_live<P, S, O>(
    protocol: &mut P,
    outgoing: &mut S,
    observer: &mut O,
    report: &mut SessionReport,
) -> Result<(), AcquireError>
where
    P: Protocol + ?Sized,
    S: Sink<String, Error = AcquireError> + Unpin,
    O: SessionObserver,
{
    for topic in observer.topics() {
        if let Some(frame) = protocol.subscribe(&topic) {
            outgoing.send(frame).await?;
        }
    }
    report.was_ready = true;
    observer.on_error(None);
    observer.on_state(ConnectionState::Connected);
    Ok(())
}

/// Connects, runs sessions, and reconnects with a fixed delay until the
/// policy gives up or the command channel is dropped. `open` yields the two
/// halves of a fresh socket for the URL it is given.
pub async fn maintain_connection<O, F, Fut, S, I>(
    config: DashboardConfig,
    mut commands: UnboundedReceiver<PushCommand>,
    mut observer: O,
    mut open: F,
) where
    O: SessionObserver,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(S, I), AcquireError>>,
    S: Sink<String, Error = AcquireError> + Unpin,
    I: Stream<Item = Result<String, AcquireError>> + Unpin,
{
    let url = config.push_url.clone();
    let transport = config.transport;
    let mut failures: u32 = 0;
    loop {
        observer.on_state(ConnectionState::Connecting);
        info!("[push] connecting to {url} ({transport:?})");

        // One budget covers opening the socket and the handshake.
        let deadline = sleep(config.connect_timeout).fuse();
        pin_mut!(deadline);
        let opening = open(url.clone()).fuse();
        pin_mut!(opening);
        let opened = select_biased! {
            opened = opening => opened,
            () = deadline => Err(AcquireError::Connection(format!("timed out opening {url}"))),
        };

        let mut report = SessionReport::default();
        let outcome = match opened {
            Ok((sink, stream)) => {
                let mut protocol = protocol_for(transport, &url);
                run_session(
                    protocol.as_mut(),
                    sink,
                    stream,
                    deadline.as_mut(),
                    &mut commands,
                    &mut observer,
                    &mut report,
                )
                .await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(SessionEnd::Released) => {
                info!("[push] channel released");
                return;
            }
            Err(e) => {
                warn!("[push] {e}");
                observer.on_error(Some(e.to_string()));
            }
        }
        observer.on_state(ConnectionState::Disconnected);

        failures = if report.was_ready { 1 } else { failures + 1 };
        match config.reconnect.next_delay(failures) {
            Some(delay) => {
                info!("[push] reconnecting in {} ms (attempt {failures})", delay.as_millis());
                sleep(delay).await;
            }
            None => {
                warn!("[push] giving up after {} attempts; staying on polling", failures - 1);
                // Stay parked until the handle goes away.
                while commands.next().await.is_some() {}
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::event_socket::EventSocketProtocol;
    use crate::push::stomp::StompProtocol;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    use crate::config::{ReconnectPolicy, TransportKind};
    use futures::channel::mpsc;
    use futures::executor::block_on;
    use futures::future::{self, Fuse, Pending};
    use futures::stream;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        states: Vec<ConnectionState>,
        errors: Vec<Option<String>>,
        messages: Vec<Inbound>,
        topics: Vec<String>,
    }

    impl SessionObserver for Recorder {
        fn on_state(&mut self, state: ConnectionState) {
            self.states.push(state);
        }
        fn on_error(&mut self, error: Option<String>) {
            self.errors.push(error);
        }
        fn on_message(&mut self, message: Inbound) {
            self.messages.push(message);
        }
        fn topics(&self) -> Vec<String> {
            self.topics.clone()
        }
    }

    fn recording(sent: &mut Vec<String>) -> impl Sink<String, Error = AcquireError> + Unpin + '_ {
        sent.sink_map_err(|never| match never {})
    }

    fn frames(items: Vec<&str>) -> impl Stream<Item = Result<String, AcquireError>> + Unpin {
        stream::iter(items.into_iter().map(|s| Ok(s.to_string())).collect::<Vec<_>>())
    }

    fn no_deadline() -> Fuse<Pending<()>> {
        future::pending().fuse()
    }

    fn discard() -> impl Sink<String, Error = AcquireError> + Unpin {
        futures::sink::drain().sink_map_err(|never| match never {})
    }

    /// Lets a test read what the reconnect loop reported after it returns.
    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Recorder>>);

    impl SessionObserver for Shared {
        fn on_state(&mut self, state: ConnectionState) {
            self.0.borrow_mut().on_state(state);
        }
        fn on_error(&mut self, error: Option<String>) {
            self.0.borrow_mut().on_error(error);
        }
        fn on_message(&mut self, message: Inbound) {
            self.0.borrow_mut().on_message(message);
        }
        fn topics(&self) -> Vec<String> {
            self.0.borrow().topics()
        }
    }

    fn config(transport: TransportKind, max_attempts: Option<u32>) -> DashboardConfig {
        let mut config = DashboardConfig::with_endpoints("http://h:8083", "ws://h:8083/ws/metrics");
        config.transport = transport;
        config.reconnect = ReconnectPolicy {
            delay: Duration::ZERO,
            max_attempts,
        };
        config.connect_timeout = Duration::from_millis(20);
        config
    }

    fn local_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
    }

    /// Opens a socket with no frames when the script says so, otherwise refuses.
    fn open_next(
        script: &mut std::vec::IntoIter<bool>,
        opens: &Cell<u32>,
    ) -> future::Ready<
        Result<
            (
                impl Sink<String, Error = AcquireError> + Unpin,
                impl Stream<Item = Result<String, AcquireError>> + Unpin,
            ),
            AcquireError,
        >,
    > {
        opens.set(opens.get() + 1);
        future::ready(if script.next().unwrap_or(false) {
            Ok((discard(), frames(vec![])))
        } else {
            Err(AcquireError::Connection("refused".into()))
        })
    }

    #[test]
    fn failed_opens_cycle_until_the_budget_is_spent_then_park() {
        use ConnectionState::*;
        let recorder = Shared::default();
        let opens = Cell::new(0);
        let mut script = Vec::new().into_iter();
        let (_tx, rx) = mpsc::unbounded();

        let parked = local_runtime().block_on(async { tokio::time::timeout(
            Duration::from_millis(200),
            maintain_connection(
                config(TransportKind::EventSocket, Some(2)),
                rx,
                recorder.clone(),
                |_url| open_next(&mut script, &opens),
            ),
        ).await });

        assert!(parked.is_err(), "the loop should still be parked");
        assert_eq!(opens.get(), 3);
        let seen = recorder.0.borrow();
        assert_eq!(
            seen.states,
            vec![Connecting, Disconnected, Connecting, Disconnected, Connecting, Disconnected]
        );
        assert_eq!(seen.errors, vec![Some("connection error: refused".to_string()); 3]);
    }

    #[test]
    fn a_live_session_resets_the_failure_count() {
        use ConnectionState::*;
        let recorder = Shared::default();
        let opens = Cell::new(0);
        let mut script = vec![false, false, true].into_iter();
        // With the handle gone the loop returns once it would park.
        let (tx, rx) = mpsc::unbounded();
        drop(tx);

        local_runtime().block_on(maintain_connection(
            config(TransportKind::EventSocket, Some(2)),
            rx,
            recorder.clone(),
            |_url| open_next(&mut script, &opens),
        ));

        // Two refusals, one live session, then a fresh budget of two retries.
        assert_eq!(opens.get(), 5);
        let seen = recorder.0.borrow();
        assert_eq!(
            seen.states,
            vec![
                Connecting, Disconnected, Connecting, Disconnected, Connecting, Connected,
                Disconnected, Connecting, Disconnected, Connecting, Disconnected,
            ]
        );
    }

    #[test]
    fn broker_that_never_answers_times_out() {
        use ConnectionState::*;
        let recorder = Shared::default();
        let mut config = config(TransportKind::Stomp, Some(0));
        config.connect_timeout = Duration::from_millis(10);
        let (_tx, rx) = mpsc::unbounded();
        let open = |_url: String| {
            future::ready(Ok::<_, AcquireError>((
                discard(),
                stream::pending::<Result<String, AcquireError>>(),
            )))
        };

        let parked = local_runtime().block_on(async { tokio::time::timeout(
            Duration::from_millis(500),
            maintain_connection(config, rx, recorder.clone(), open),
        ).await });

        assert!(parked.is_err());
        let seen = recorder.0.borrow();
        assert_eq!(seen.states, vec![Connecting, Disconnected]);
        assert_eq!(
            seen.errors,
            vec![Some(
                "connection error: no handshake reply before the connect timeout".to_string()
            )]
        );
    }

    #[test]
    fn elapsed_deadline_fails_a_session_that_is_not_live() {
        let mut protocol = StompProtocol::new("h");
        let mut sent: Vec<String> = Vec::new();
        let (_tx, mut rx) = mpsc::unbounded();
        let mut observer = Recorder::default();
        let mut report = SessionReport::default();

        let result = block_on(run_session(
            &mut protocol,
            recording(&mut sent),
            stream::pending::<Result<String, AcquireError>>(),
            future::ready(()).fuse(),
            &mut rx,
            &mut observer,
            &mut report,
        ));

        assert!(matches!(result, Err(AcquireError::Connection(ref m)) if m.contains("connect timeout")));
        assert!(sent[0].starts_with("CONNECT\n"));
        assert!(observer.states.is_empty());
    }

    #[test]
    fn stomp_session_subscribes_after_connected_and_routes_messages() {
        let mut protocol = StompProtocol::new("localhost:8083");
        let mut sent: Vec<String> = Vec::new();
        let (_tx, mut rx) = mpsc::unbounded();
        let mut observer = Recorder {
            topics: vec!["/topic/metrics".into()],
            ..Default::default()
        };
        let mut report = SessionReport::default();

        let incoming = frames(vec![
            "MESSAGE\ndestination:/topic/metrics\n\n{\"activeRides\":1}\0",
            "CONNECTED\nversion:1.2\n\n\0",
            "\n",
            "MESSAGE\ndestination:/topic/metrics\n\n{\"activeRides\":2}\0",
            "MESSAGE\ndestination:/topic/metrics\n\n{broken\0",
            "MESSAGE\ndestination:/topic/metrics\n\n{\"activeRides\":3}\0",
        ]);
        let result = block_on(run_session(
            &mut protocol,
            recording(&mut sent),
            incoming,
            no_deadline(),
            &mut rx,
            &mut observer,
            &mut report,
        ));

        assert_eq!(result, Err(AcquireError::Connection("socket closed".into())));
        assert!(report.was_ready);
        assert_eq!(sent.len(), 2);
        assert!(sent[0].starts_with("CONNECT\n"));
        assert!(sent[1].starts_with("SUBSCRIBE\n"));
        assert!(sent[1].contains("destination:/topic/metrics\n"));
        assert_eq!(observer.states, vec![ConnectionState::Connected]);
        assert_eq!(observer.errors, vec![None]);
        let payloads: Vec<_> = observer.messages.iter().map(|m| m.payload.clone()).collect();
        assert_eq!(payloads, vec![json!({"activeRides": 2}), json!({"activeRides": 3})]);
    }

    #[test]
    fn broker_error_frame_ends_the_session() {
        let mut protocol = StompProtocol::new("h");
        let mut sent: Vec<String> = Vec::new();
        let (_tx, mut rx) = mpsc::unbounded();
        let mut observer = Recorder::default();
        let mut report = SessionReport::default();

        let incoming = frames(vec![
            "CONNECTED\nversion:1.2\n\n\0",
            "ERROR\nmessage:session expired\n\n\0",
            "MESSAGE\ndestination:/topic/metrics\n\n{}\0",
        ]);
        let result = block_on(run_session(
            &mut protocol,
            recording(&mut sent),
            incoming,
            no_deadline(),
            &mut rx,
            &mut observer,
            &mut report,
        ));

        assert_eq!(
            result,
            Err(AcquireError::Connection("broker error: session expired".into()))
        );
        assert!(observer.messages.is_empty());
    }

    #[test]
    fn event_socket_is_live_on_open() {
        let mut protocol = EventSocketProtocol;
        let mut sent: Vec<String> = Vec::new();
        let (_tx, mut rx) = mpsc::unbounded();
        let mut observer = Recorder {
            topics: vec!["message".into()],
            ..Default::default()
        };
        let mut report = SessionReport::default();

        let incoming = frames(vec![
            r#"{"type":"message","data":{"activeRides":5}}"#,
            "garbage",
            r#"{"type":"anomaly","data":{}}"#,
        ]);
        let _ = block_on(run_session(
            &mut protocol,
            recording(&mut sent),
            incoming,
            no_deadline(),
            &mut rx,
            &mut observer,
            &mut report,
        ));

        assert!(sent.is_empty());
        assert_eq!(observer.states, vec![ConnectionState::Connected]);
        assert_eq!(observer.messages.len(), 2);
        assert_eq!(observer.messages[0].topic, "message");
        assert_eq!(observer.messages[1].topic, "anomaly");
    }

    #[test]
    fn watch_after_ready_sends_a_subscribe() {
        let mut protocol = StompProtocol::new("h");
        let mut sent: Vec<String> = Vec::new();
        let (tx, mut rx) = mpsc::unbounded();
        let mut observer = Recorder::default();
        let mut report = SessionReport {
            was_ready: true,
        };

        tx.unbounded_send(PushCommand::Watch("/topic/metrics".into())).unwrap();
        tx.unbounded_send(PushCommand::Watch("/topic/metrics".into())).unwrap();
        drop(tx);

        // A pending stream keeps the socket side quiet so the commands drive the session.
        let result = block_on(run_session(
            &mut NoHandshake(&mut protocol),
            recording(&mut sent),
            stream::pending::<Result<String, AcquireError>>(),
            no_deadline(),
            &mut rx,
            &mut observer,
            &mut report,
        ));

        assert_eq!(result, Ok(SessionEnd::Released));
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("destination:/topic/metrics\n"));
    }

    /// Skips the handshake so a test can start mid-session.
    struct NoHandshake<'a, P: Protocol>(&'a mut P);

    impl<P: Protocol> Protocol for NoHandshake<'_, P> {
        fn handshake(&mut self) -> Vec<String> {
            Vec::new()
        }
        fn ready_on_open(&self) -> bool {
            false
        }
        fn subscribe(&mut self, topic: &str) -> Option<String> {
            self.0.subscribe(topic)
        }
        fn decode(&mut self, frame: &str) -> Result<Decoded, AcquireError> {
            self.0.decode(frame)
        }
    }
}
