//! Typed publish/subscribe bus for authentication events.
//!
//! Delivery is synchronous on the publishing task, in registration order.
//! A handler may publish from inside its callback; that event is delivered
//! to every subscriber before the outer publish moves on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::auth::Credentials;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoginRequested(Credentials),
    LoginConfirmed,
    AuthenticationRequired,
    LogoutRequested,
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::LoginRequested(_) => "login-requested",
            AuthEvent::LoginConfirmed => "login-confirmed",
            AuthEvent::AuthenticationRequired => "authentication-required",
            AuthEvent::LogoutRequested => "logout-requested",
        }
    }
}

type Handler = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

struct BusInner {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(u64, Handler)>>,
}

/// Cheap to clone; clones share subscribers.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicU64::new(0),
                handlers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a handler. It stays registered until the returned
    /// `Subscription` is dropped or disposed.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.handlers.lock().push((id, Arc::new(handler)));
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    pub fn publish(&self, event: AuthEvent) {
        // Snapshot so handlers can subscribe, dispose or publish re-entrantly.
        let handlers: Vec<Handler> = self
            .inner
            .handlers
            .lock()
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();

        trace!(event = event.name(), subscribers = handlers.len(), "Publishing");
        for handler in handlers {
            handler(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.lock().len()
    }
}

/// Disposer for a bus registration.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.handlers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &EventBus, tag: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Subscription {
        let log = Arc::clone(log);
        bus.subscribe(move |event| log.lock().push(format!("{}:{}", tag, event.name())))
    }

    #[test]
    fn test_delivers_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _a = recorder(&bus, "a", &log);
        let _b = recorder(&bus, "b", &log);

        bus.publish(AuthEvent::LoginConfirmed);
        bus.publish(AuthEvent::LogoutRequested);

        assert_eq!(
            *log.lock(),
            vec![
                "a:login-confirmed",
                "b:login-confirmed",
                "a:logout-requested",
                "b:logout-requested"
            ]
        );
    }

    #[test]
    fn test_dispose_unsubscribes() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder(&bus, "a", &log);
        let _b = recorder(&bus, "b", &log);
        assert_eq!(bus.subscriber_count(), 2);

        a.dispose();
        assert_eq!(bus.subscriber_count(), 1);
        bus.publish(AuthEvent::LoginConfirmed);
        assert_eq!(*log.lock(), vec!["b:login-confirmed"]);
    }

    #[test]
    fn test_nested_publish_is_delivered_depth_first() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_bus = bus.clone();
        let _relay = bus.subscribe(move |event| {
            if let AuthEvent::LoginRequested(_) = event {
                inner_bus.publish(AuthEvent::LoginConfirmed);
            }
        });
        let _rec = recorder(&bus, "r", &log);

        bus.publish(AuthEvent::LoginRequested(Credentials::new("alice", "secret")));
        assert_eq!(*log.lock(), vec!["r:login-confirmed", "r:login-requested"]);
    }

    #[test]
    fn test_subscription_outliving_bus() {
        let bus = EventBus::new();
        let sub = bus.subscribe(|_| {});
        drop(bus);
        drop(sub);
    }
}
