//! Lifecycle event bus.
//!
//! Subscribers register an async handler against an [`EventKind`]. Publishing
//! an event delivers it to every matching subscriber concurrently; each
//! delivery is isolated so one failing handler neither stops the others nor
//! reaches the publisher.
//!
//! # Once subscriptions
//!
//! A subscription created with `once = true` is removed in the same critical
//! section that selects it for delivery. It therefore sees exactly one
//! delivery attempt, however many publishes race for it, and is gone whether
//! that attempt succeeds or fails.
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! bus.subscribe(EventKind::Ready, false, |event: LifecycleEvent| async move {
//!     tracing::info!("ready: {:?}", event.payload::<String>());
//! });
//! bus.publish(LifecycleEvent::new(EventKind::Ready, "bot#0001".to_string())).await;
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, join_all};
use parking_lot::RwLock;
use tracing::{Instrument, Level, debug, error, span};

use crate::command::IntoHandlerResult;
use crate::error::HandlerResult;
use crate::guard::isolate;

// ============================================================================
// Event kinds and payloads
// ============================================================================

/// Platform lifecycle event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    InteractionCreate,
    MessageCreate,
    MessageDelete,
    GuildCreate,
    GuildDelete,
    GuildMemberAdd,
    GuildMemberRemove,
    /// Transport-level error notifications.
    Error,
    /// Anything the enumeration above does not name.
    Custom(&'static str),
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::InteractionCreate => "interaction_create",
            Self::MessageCreate => "message_create",
            Self::MessageDelete => "message_delete",
            Self::GuildCreate => "guild_create",
            Self::GuildDelete => "guild_delete",
            Self::GuildMemberAdd => "guild_member_add",
            Self::GuildMemberRemove => "guild_member_remove",
            Self::Error => "error",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event as seen by subscribers: a kind plus a type-erased payload.
#[derive(Clone)]
pub struct LifecycleEvent {
    kind: EventKind,
    payload: Arc<dyn Any + Send + Sync>,
}

impl LifecycleEvent {
    pub fn new<T: Any + Send + Sync>(kind: EventKind, payload: T) -> Self {
        Self {
            kind,
            payload: Arc::new(payload),
        }
    }

    /// An event with no payload.
    pub fn bare(kind: EventKind) -> Self {
        Self::new(kind, ())
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Downcasts the payload.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleEvent")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// A type-erased event handler.
pub type EventHandlerFn =
    Arc<dyn Fn(LifecycleEvent) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    once: bool,
    handler: EventHandlerFn,
}

/// Outcome of one [`EventBus::publish`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Handlers that completed without error.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

impl PublishReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Fan-out of lifecycle events to subscribed handlers.
#[derive(Default)]
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a handler to an event kind. Duplicates are allowed.
    pub fn subscribe<F, Fut, R>(&self, kind: EventKind, once: bool, handler: F) -> SubscriptionId
    where
        F: Fn(LifecycleEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoHandlerResult<()> + 'static,
    {
        self.subscribe_boxed(
            kind,
            once,
            Arc::new(move |event| -> BoxFuture<'static, HandlerResult> {
                let fut = handler(event);
                Box::pin(async move { fut.await.into_handler_result() })
            }),
        )
    }

    /// Subscribes a pre-erased handler.
    pub fn subscribe_boxed(
        &self,
        kind: EventKind,
        once: bool,
        handler: EventHandlerFn,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().push(Subscription {
            id,
            kind,
            once,
            handler,
        });
        debug!(event = %kind, once, "Subscribed event handler");
        id
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    /// Number of live subscriptions for a kind.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscriptions
            .read()
            .iter()
            .filter(|s| s.kind == kind)
            .count()
    }

    /// Delivers an event to every subscriber of its kind.
    ///
    /// Handlers run concurrently. Failures are logged and counted, never
    /// propagated.
    pub async fn publish(&self, event: LifecycleEvent) -> PublishReport {
        let kind = event.kind();
        let handlers: Vec<EventHandlerFn> = {
            let mut subs = self.subscriptions.write();
            let selected = subs
                .iter()
                .filter(|s| s.kind == kind)
                .map(|s| Arc::clone(&s.handler))
                .collect();
            subs.retain(|s| !(s.once && s.kind == kind));
            selected
        };

        if handlers.is_empty() {
            return PublishReport::default();
        }

        let span = span!(Level::DEBUG, "publish", event = %kind, handlers = handlers.len());
        let deliveries = handlers.into_iter().map(|handler| {
            let event = event.clone();
            async move { isolate(move || handler(event)).await }
        });

        let mut report = PublishReport::default();
        for outcome in join_all(deliveries).instrument(span).await {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(failure) => {
                    error!(event = %kind, error = %failure, "Event handler failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::error::BoxError;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn counting(
        hits: &Arc<AtomicUsize>,
    ) -> impl Fn(LifecycleEvent) -> BoxFuture<'static, ()> + Send + Sync + 'static {
        let hits = Arc::clone(hits);
        move |_event| -> BoxFuture<'static, ()> {
            let hits = Arc::clone(&hits);
            Box::pin(async move {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    #[tokio::test]
    async fn delivers_to_every_subscriber_of_kind() {
        let bus = EventBus::new();
        let ready = counter();
        let other = counter();
        bus.subscribe(EventKind::Ready, false, counting(&ready));
        bus.subscribe(EventKind::Ready, false, counting(&ready));
        bus.subscribe(EventKind::GuildCreate, false, counting(&other));

        let report = bus.publish(LifecycleEvent::bare(EventKind::Ready)).await;

        assert_eq!(report, PublishReport { delivered: 2, failed: 0 });
        assert_eq!(ready.load(Ordering::SeqCst), 2);
        assert_eq!(other.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_handler_does_not_block_others() {
        let bus = EventBus::new();
        let hits = counter();
        bus.subscribe(EventKind::MessageCreate, false, |_e: LifecycleEvent| async {
            Err::<(), BoxError>("bad message".into())
        });
        bus.subscribe(EventKind::MessageCreate, false, |_e: LifecycleEvent| async {
            if true {
                panic!("handler bug");
            }
        });
        bus.subscribe(EventKind::MessageCreate, false, counting(&hits));

        let report = bus.publish(LifecycleEvent::bare(EventKind::MessageCreate)).await;

        assert_eq!(report, PublishReport { delivered: 1, failed: 2 });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn once_subscription_fires_once_even_on_failure() {
        let bus = EventBus::new();
        let hits = counter();
        let seen = Arc::clone(&hits);
        bus.subscribe(EventKind::Ready, true, move |_e: LifecycleEvent| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Err::<(), BoxError>("first boot only".into())
            }
        });

        let first = bus.publish(LifecycleEvent::bare(EventKind::Ready)).await;
        let second = bus.publish(LifecycleEvent::bare(EventKind::Ready)).await;

        assert_eq!(first.failed, 1);
        assert_eq!(second.attempted(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(EventKind::Ready), 0);
    }

    #[tokio::test]
    async fn payload_downcasts_and_unsubscribe() {
        let bus = EventBus::new();
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let sink = Arc::clone(&seen);
        let id = bus.subscribe(EventKind::Custom("ping"), false, move |e: LifecycleEvent| {
            *sink.lock() = e.payload::<u32>().copied();
            async {}
        });

        bus.publish(LifecycleEvent::new(EventKind::Custom("ping"), 7_u32)).await;
        assert_eq!(*seen.lock(), Some(7));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(EventKind::Custom("ping")), 0);
    }
}
