//! The event pump — deferred operation queue, batch scheduler, public API
//!
//! `publish` and `subscribe` never touch subscribers directly; they append
//! to a FIFO queue and ask the [`Scheduler`] to run a drain later. The
//! drain slices the queue into maximal runs of publishes ("batches")
//! separated by subscribe entries: each batch passes through the mediator
//! and fans out against the registry as it existed *before* the subscribe
//! entry that ended the batch. This is what separates pending subscribers
//! (queued, invisible to matching) from established ones (in the
//! registry).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Value};

use crate::delivery;
use crate::error::{ErrorKind, Result};
use crate::hooks::{Hooks, PumpConfig};
use crate::path::{event_path, pattern_path};
use crate::registry::SubscriptionTree;
use crate::scheduler::Scheduler;
use crate::types::{same_subscriber, BatchEntry, CompletionFn, SubscriberFn};

enum QueueItem {
    Publish(BatchEntry),
    Subscribe {
        pattern: String,
        path: Vec<String>,
        callback: SubscriberFn,
    },
}

struct PumpInner {
    registry: SubscriptionTree,
    queue: VecDeque<QueueItem>,
    /// A drain job sits in the scheduler and has not started yet
    drain_scheduled: bool,
    /// A drain is running; it consumes everything appended until the
    /// queue is empty, so no second drain is scheduled meanwhile
    draining: bool,
}

impl PumpInner {
    fn has_pending_subscription(&self, pattern: &str, callback: &SubscriberFn) -> bool {
        self.queue.iter().any(|item| match item {
            QueueItem::Subscribe {
                pattern: p,
                callback: c,
                ..
            } => p == pattern && same_subscriber(c, callback),
            QueueItem::Publish(_) => false,
        })
    }

    fn pending_subscription_count(&self) -> usize {
        self.queue
            .iter()
            .filter(|item| matches!(item, QueueItem::Subscribe { .. }))
            .count()
    }
}

/// In-process hierarchical publish/subscribe event router
///
/// Publishers emit dot-separated hierarchical names; subscribers register
/// exact names or wildcard patterns (empty components match any value,
/// missing tails match any depth). Delivery is deferred and batched;
/// publishers may pass a completion callback to learn when every matched
/// subscriber (including asynchronous ones) has finished.
///
/// Clones share the same registry and queue, so a clone can be handed to
/// subscriber callbacks that need to publish reentrantly.
///
/// ```
/// use event_pump::{subscriber, EventPump, ManualScheduler};
///
/// let scheduler = ManualScheduler::new();
/// let pump = EventPump::new(scheduler.clone());
///
/// let on_order = subscriber(|name, event, _extensions| {
///     println!("{name}: {event}");
///     Ok(())
/// });
/// pump.subscribe("order.created", on_order.clone())?;
/// scheduler.run_pending(); // establish the subscription
///
/// pump.publish("order.created", serde_json::json!({"id": 1}))?;
/// scheduler.run_pending(); // deliver
///
/// pump.unsubscribe(&on_order);
/// # Ok::<(), event_pump::PumpError>(())
/// ```
#[derive(Clone)]
pub struct EventPump {
    inner: Arc<Mutex<PumpInner>>,
    hooks: Arc<Hooks>,
    scheduler: Arc<dyn Scheduler>,
}

impl EventPump {
    /// Create a pump with default hooks
    pub fn new(scheduler: impl Scheduler + 'static) -> Self {
        Self::with_config(scheduler, PumpConfig::default())
    }

    /// Create a pump with configured hooks
    pub fn with_config(scheduler: impl Scheduler + 'static, config: PumpConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PumpInner {
                registry: SubscriptionTree::default(),
                queue: VecDeque::new(),
                drain_scheduled: false,
                draining: false,
            })),
            hooks: Arc::new(Hooks::from_config(config)),
            scheduler: Arc::new(scheduler),
        }
    }

    /// Publish an event
    ///
    /// Fails with `BadEventName` if `name` has an empty component, or
    /// with [`PumpError::Rejected`](crate::PumpError::Rejected) if the
    /// augmenter rejects the event. Delivery happens on a later drain
    /// cycle, never inside this call.
    pub fn publish(&self, name: &str, event: Value) -> Result<()> {
        self.publish_inner(name, event, None)
    }

    /// Publish an event and learn when every matched subscriber finished
    ///
    /// The completion callback receives the number of subscribers that
    /// were synchronously invoked for this event; it fires once all of
    /// them, including ones that called
    /// [`make_asynchronous`](crate::DeliveryExtensions::make_asynchronous),
    /// are done.
    pub fn publish_with_completion(
        &self,
        name: &str,
        event: Value,
        completion: CompletionFn,
    ) -> Result<()> {
        self.publish_inner(name, event, Some(completion))
    }

    fn publish_inner(
        &self,
        name: &str,
        event: Value,
        completion: Option<CompletionFn>,
    ) -> Result<()> {
        event_path(name)
            .map_err(|message| self.hooks.create_error(ErrorKind::BadEventName, message))?;
        let event = self.hooks.augment(name, event)?;
        self.enqueue(QueueItem::Publish(BatchEntry {
            name: name.to_string(),
            event,
            completion,
        }));
        Ok(())
    }

    /// Register `callback` for events matching `pattern`
    ///
    /// The subscription is pending until the next drain cycle; events
    /// already queued when `subscribe` is called are delivered to the
    /// subscriber set as it existed before. Re-subscribing the same
    /// callback under the same pattern is a silent no-op; the same
    /// callback may be registered under different patterns.
    pub fn subscribe(&self, pattern: &str, callback: SubscriberFn) -> Result<()> {
        let path = pattern_path(pattern);
        let enqueued = {
            let mut inner = lock(&self.inner);
            if inner.has_pending_subscription(pattern, &callback)
                || inner.registry.contains(&path, &callback)
            {
                false
            } else {
                inner.queue.push_back(QueueItem::Subscribe {
                    pattern: pattern.to_string(),
                    path,
                    callback,
                });
                true
            }
        };
        if enqueued {
            tracing::debug!(pattern = %pattern, "Subscription pending");
            self.schedule_drain();
        }
        Ok(())
    }

    /// Remove `callback` from every pattern it is registered under
    ///
    /// Applied immediately: pending subscriptions are dropped from the
    /// queue and established ones removed from the registry. Idempotent —
    /// an unknown callback is a no-op, never an error. A fan-out already
    /// in progress for this callback is not preempted.
    pub fn unsubscribe(&self, callback: &SubscriberFn) {
        let mut inner = lock(&self.inner);
        let queued_before = inner.queue.len();
        inner.queue.retain(|item| match item {
            QueueItem::Subscribe { callback: c, .. } => !same_subscriber(c, callback),
            QueueItem::Publish(_) => true,
        });
        let removed = queued_before - inner.queue.len() + inner.registry.remove(callback);
        if removed > 0 {
            tracing::debug!(removed, "Subscriber removed");
        }
    }

    /// Number of subscriptions: established plus still-pending
    pub fn subscriber_count(&self) -> usize {
        let inner = lock(&self.inner);
        inner.registry.count() + inner.pending_subscription_count()
    }

    fn enqueue(&self, item: QueueItem) {
        {
            let mut inner = lock(&self.inner);
            inner.queue.push_back(item);
        }
        self.schedule_drain();
    }

    /// Schedule a drain unless one is already scheduled or running
    ///
    /// A running drain consumes everything appended before it observes
    /// an empty queue, so exactly one drain handles the backlog and
    /// later appends schedule fresh drains.
    fn schedule_drain(&self) {
        let schedule = {
            let mut inner = lock(&self.inner);
            if inner.drain_scheduled || inner.draining {
                false
            } else {
                inner.drain_scheduled = true;
                true
            }
        };
        if schedule {
            let inner = Arc::clone(&self.inner);
            let hooks = Arc::clone(&self.hooks);
            self.scheduler.schedule(Box::new(move || drain(&inner, &hooks)));
        }
    }
}

fn lock<'a>(inner: &'a Arc<Mutex<PumpInner>>) -> MutexGuard<'a, PumpInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drain the queue: deliver batches, establishing subscriptions between
/// them
///
/// Never reentrant — two drains on the same pump must not interleave.
/// The lock is released around every batch delivery so callbacks may
/// reenter `publish`/`subscribe`/`unsubscribe`; reentrant publishes are
/// consumed by this same drain.
fn drain(inner: &Arc<Mutex<PumpInner>>, hooks: &Arc<Hooks>) {
    {
        let mut guard = lock(inner);
        if guard.draining {
            return;
        }
        guard.draining = true;
        guard.drain_scheduled = false;
        tracing::debug!(queued = guard.queue.len(), "Drain cycle starting");
    }

    loop {
        // Slice off the next contiguous run of publishes, plus the
        // subscribe entry that ended it (if any).
        let (batch, establish) = {
            let mut guard = lock(inner);
            let mut batch = Vec::new();
            let mut establish = None;
            while let Some(item) = guard.queue.pop_front() {
                match item {
                    QueueItem::Publish(entry) => batch.push(entry),
                    QueueItem::Subscribe {
                        pattern,
                        path,
                        callback,
                    } => {
                        establish = Some((pattern, path, callback));
                        break;
                    }
                }
            }
            (batch, establish)
        };

        deliver_batch(batch, inner, hooks);

        match establish {
            Some((pattern, path, callback)) => {
                lock(inner).registry.insert(&path, callback);
                tracing::debug!(pattern = %pattern, "Subscription established");
            }
            None => {
                let mut guard = lock(inner);
                if guard.queue.is_empty() {
                    guard.draining = false;
                    return;
                }
                // Reentrant appends arrived while delivering; keep going.
            }
        }
    }
}

/// Mediate and deliver one batch
fn deliver_batch(batch: Vec<BatchEntry>, inner: &Arc<Mutex<PumpInner>>, hooks: &Arc<Hooks>) {
    if batch.is_empty() {
        return;
    }
    let batch = hooks.mediate(batch);
    for entry in batch {
        // Paths are recomputed after mediation; only a mediator-written
        // name can fail here, and it must not abort the rest of the
        // batch.
        let path = match event_path(&entry.name) {
            Ok(path) => path,
            Err(message) => {
                hooks.report_mediator(
                    json!([{ "name": entry.name }, { "event": entry.event }]),
                    Box::new(hooks.create_error(ErrorKind::BadEventName, message)),
                );
                continue;
            }
        };
        let matched = lock(inner).registry.matches(&path);
        delivery::deliver(matched, &entry.name, &entry.event, entry.completion, hooks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use crate::types::subscriber;

    #[test]
    fn test_multiple_appends_schedule_one_drain() {
        let scheduler = ManualScheduler::new();
        let pump = EventPump::new(scheduler.clone());

        pump.publish("order.created", json!({"id": 1})).unwrap();
        pump.publish("order.created", json!({"id": 2})).unwrap();
        pump.publish("order.created", json!({"id": 3})).unwrap();

        assert_eq!(scheduler.pending(), 1);
        scheduler.run_pending();
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_next_append_schedules_a_fresh_drain() {
        let scheduler = ManualScheduler::new();
        let pump = EventPump::new(scheduler.clone());

        pump.publish("order.created", json!({})).unwrap();
        scheduler.run_pending();

        pump.publish("order.created", json!({})).unwrap();
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn test_reentrant_publish_is_consumed_by_the_same_drain() {
        let scheduler = ManualScheduler::new();
        let pump = EventPump::new(scheduler.clone());

        let received: Arc<Mutex<Vec<String>>> = Arc::default();
        let log = Arc::clone(&received);
        let chained = subscriber(move |name, _, _| {
            log.lock().unwrap().push(name.to_string());
            Ok(())
        });
        pump.subscribe("order", chained).unwrap();

        let reentrant_pump = pump.clone();
        let trigger = subscriber(move |_, _, _| {
            reentrant_pump.publish("order.settled", json!({}))?;
            Ok(())
        });
        pump.subscribe("invoice.paid", trigger).unwrap();
        scheduler.run_pending();

        pump.publish("invoice.paid", json!({})).unwrap();
        scheduler.run_pending();

        assert_eq!(*received.lock().unwrap(), vec!["order.settled"]);
    }

    #[test]
    fn test_subscriber_count_covers_pending_and_established() {
        let scheduler = ManualScheduler::new();
        let pump = EventPump::new(scheduler.clone());

        pump.subscribe("order.created", subscriber(|_, _, _| Ok(()))).unwrap();
        pump.subscribe("invoice.paid", subscriber(|_, _, _| Ok(()))).unwrap();
        assert_eq!(pump.subscriber_count(), 2);

        scheduler.run_pending();
        assert_eq!(pump.subscriber_count(), 2);
    }

    #[test]
    fn test_resubscribe_same_pattern_and_callback_is_a_no_op() {
        let scheduler = ManualScheduler::new();
        let pump = EventPump::new(scheduler.clone());
        let sub = subscriber(|_, _, _| Ok(()));

        // Pending duplicate
        pump.subscribe("order.created", sub.clone()).unwrap();
        pump.subscribe("order.created", sub.clone()).unwrap();
        assert_eq!(pump.subscriber_count(), 1);

        // Established duplicate
        scheduler.run_pending();
        pump.subscribe("order.created", sub.clone()).unwrap();
        assert_eq!(pump.subscriber_count(), 1);

        // Different pattern is independent
        pump.subscribe("invoice.paid", sub).unwrap();
        assert_eq!(pump.subscriber_count(), 2);
    }

    #[test]
    fn test_publish_rejects_bad_names() {
        let pump = EventPump::new(ManualScheduler::new());
        assert!(pump.publish("", json!({})).is_err());
        assert!(pump.publish("order.", json!({})).is_err());
        assert!(pump.publish("order..created", json!({})).is_err());
        assert!(pump.publish("order.created", json!({})).is_ok());
    }
}
