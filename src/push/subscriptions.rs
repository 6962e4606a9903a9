use dioxus::logger::tracing::{debug, warn};
use std::cell::RefCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AcquireError;

/// A handler as the registry stores it: payload in, decode failure out.
pub type RawHandler = Box<dyn FnMut(&Value) -> Result<(), AcquireError>>;

/// Handlers are shared so they can run after the registry borrow is released;
/// a handler may then subscribe or unsubscribe without re-entering it.
pub type SharedHandler = Rc<RefCell<RawHandler>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// An inbound push message, already routed to a topic by the transport
/// binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub topic: String,
    pub payload: Value,
}

struct Entry {
    id: SubscriptionId,
    topic: String,
    handler: SharedHandler,
}

/// Topic → handler table. Handlers run in registration order, once per
/// matching message.
#[derive(Default)]
pub struct Subscriptions {
    next_id: u64,
    entries: Vec<Entry>,
}

impl Subscriptions {
    pub fn add(&mut self, topic: &str, handler: RawHandler) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push(Entry {
            id,
            topic: topic.to_string(),
            handler: Rc::new(RefCell::new(handler)),
        });
        id
    }

    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Distinct topics, in first-registration order.
    pub fn topics(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for e in &self.entries {
            if !out.contains(&e.topic) {
                out.push(e.topic.clone());
            }
        }
        out
    }

    /// Handlers registered for `topic` right now, in registration order.
    pub fn handlers(&self, topic: &str) -> Vec<SharedHandler> {
        self.entries
            .iter()
            .filter(|e| e.topic == topic)
            .map(|e| e.handler.clone())
            .collect()
    }

    pub fn dispatch(&self, message: &Inbound) -> usize {
        deliver(&self.handlers(&message.topic), message)
    }
}

/// Runs `handlers` on one message. Payloads a handler cannot decode are
/// logged and skipped. Returns how many handlers accepted the message.
pub fn deliver(handlers: &[SharedHandler], message: &Inbound) -> usize {
    let mut delivered = 0;
    for handler in handlers {
        // A handler already running further up the stack is skipped.
        let Ok(mut handler) = handler.try_borrow_mut() else {
            continue;
        };
        match (*handler)(&message.payload) {
            Ok(()) => delivered += 1,
            Err(e) => warn!("[push] dropping message on {}: {e}", message.topic),
        }
    }
    if delivered == 0 {
        debug!("[push] no handler took message on {}", message.topic);
    }
    delivered
}

/// Wraps a typed handler so that it decodes the payload first.
pub fn typed<T, F>(mut handler: F) -> RawHandler
where
    T: DeserializeOwned + 'static,
    F: FnMut(T) + 'static,
{
    Box::new(move |payload: &Value| {
        let value = serde_json::from_value::<T>(payload.clone())
            .map_err(|e| AcquireError::Parse(e.to_string()))?;
        handler(value);
        Ok(())
    })
}
