//! Push acquirer: a persistent WebSocket to the metrics service, exposed to
//! the UI as connection status, an error string, and topic subscriptions.

pub mod event_socket;
pub mod protocol;
pub mod session;
pub mod socket;
pub mod stomp;
pub mod subscriptions;

use dioxus::prelude::*;
use futures::channel::mpsc::UnboundedReceiver;
use serde::de::DeserializeOwned;

use crate::config::DashboardConfig;
use crate::shared::types::ConnectionState;
use session::{maintain_connection, PushCommand, SessionObserver};
use subscriptions::{deliver, typed, Inbound, RawHandler, SubscriptionId, Subscriptions};

/// What the dashboard needs from a push channel, whichever binding backs it.
pub trait PushSource {
    fn status(&self) -> ConnectionState;

    fn error(&self) -> Option<String>;

    fn subscribe_raw(&self, topic: &str, handler: RawHandler) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);

    fn is_connected(&self) -> bool {
        self.status() == ConnectionState::Connected
    }

    /// `handler` runs once per message on `topic`, in arrival order.
    /// Payloads that do not decode as `T` are logged and dropped.
    fn subscribe<T, F>(&self, topic: &str, handler: F) -> SubscriptionId
    where
        T: DeserializeOwned + 'static,
        F: FnMut(T) + 'static,
        Self: Sized,
    {
        self.subscribe_raw(topic, typed(handler))
    }
}

/// Handle returned by [`use_push_channel`]. Cheap to copy; all copies refer
/// to the same connection.
#[derive(Clone, Copy)]
pub struct PushChannel {
    status: Signal<ConnectionState>,
    error: Signal<Option<String>>,
    subscriptions: Signal<Subscriptions>,
    commands: Coroutine<PushCommand>,
}

impl PushSource for PushChannel {
    fn status(&self) -> ConnectionState {
        *self.status.read()
    }

    fn error(&self) -> Option<String> {
        self.error.read().clone()
    }

    fn subscribe_raw(&self, topic: &str, handler: RawHandler) -> SubscriptionId {
        let mut subscriptions = self.subscriptions;
        let id = subscriptions.write().add(topic, handler);
        self.commands.send(PushCommand::Watch(topic.to_string()));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscriptions = self.subscriptions;
        // The registry is already gone when this runs during unmount.
        let Ok(mut registry) = subscriptions.try_write() else {
            return;
        };
        registry.remove(id);
    }
}

/// Feeds session events into the channel's signals.
struct SignalObserver {
    status: Signal<ConnectionState>,
    error: Signal<Option<String>>,
    subscriptions: Signal<Subscriptions>,
}

impl SessionObserver for SignalObserver {
    fn on_state(&mut self, state: ConnectionState) {
        if *self.status.peek() != state {
            dioxus::logger::tracing::info!("[push] {:?}", state);
            self.status.set(state);
        }
    }

    fn on_error(&mut self, error: Option<String>) {
        if *self.error.peek() != error {
            self.error.set(error);
        }
    }

    fn on_message(&mut self, message: Inbound) {
        let handlers = self.subscriptions.peek().handlers(&message.topic);
        deliver(&handlers, &message);
    }

    fn topics(&self) -> Vec<String> {
        self.subscriptions.peek().topics()
    }
}

/// Opens the configured push channel for the lifetime of the calling
/// component. The connection task is cancelled, and its socket dropped,
/// when the component unmounts.
pub fn use_push_channel(config: &DashboardConfig) -> PushChannel {
    let status = use_signal(ConnectionState::default);
    let error = use_signal(|| Option::<String>::None);
    let subscriptions = use_signal(Subscriptions::default);

    let config = config.clone();
    let commands = use_coroutine(move |rx: UnboundedReceiver<PushCommand>| {
        let observer = SignalObserver {
            status,
            error,
            subscriptions,
        };
        let open = |url: String| async move { socket::open(&url).await };
        maintain_connection(config.clone(), rx, observer, open)
    });

    use_drop(move || commands.task().cancel());

    PushChannel {
        status,
        error,
        subscriptions,
        commands,
    }
}
