//! Core callback and batch types for the event pump
//!
//! Event payloads are arbitrary JSON (`serde_json::Value`). Callbacks are
//! shared closures (`Arc<dyn Fn ...>`); the `Arc` data pointer is the
//! callback's identity for idempotent re-subscribe and for `unsubscribe`.
//! All callbacks are fallible — returning `Err` is the isolated-failure
//! channel that the exception reporter receives.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::delivery::DeliveryExtensions;
use crate::error::{ErrorKind, PumpError};

/// Boxed error carried by fallible callbacks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Subscriber callback: `(name, event, extensions)`
///
/// `extensions` exposes [`DeliveryExtensions::make_asynchronous`] for
/// subscribers that finish handling the event later.
pub type SubscriberFn =
    Arc<dyn Fn(&str, &Value, &DeliveryExtensions) -> Result<(), BoxError> + Send + Sync>;

/// Completion callback: receives the number of subscribers that were
/// synchronously invoked for the published event
pub type CompletionFn = Arc<dyn Fn(usize) -> Result<(), BoxError> + Send + Sync>;

/// Augmenter hook: validates/transforms an event at publish time
pub type AugmenterFn = Arc<dyn Fn(&str, Value) -> Result<Value, BoxError> + Send + Sync>;

/// Mediator hook: transforms a batch before delivery
pub type MediatorFn =
    Arc<dyn Fn(Vec<BatchEntry>) -> Result<Vec<BatchEntry>, BoxError> + Send + Sync>;

/// Exception reporter hook: best-effort sink for isolated failures
pub type ReporterFn = Arc<dyn Fn(&FailureReport) -> Result<(), BoxError> + Send + Sync>;

/// Exception creator hook: factory for validation errors
pub type CreatorFn = Arc<dyn Fn(ErrorKind, String) -> PumpError + Send + Sync>;

/// Wrap a closure as a [`SubscriberFn`]
///
/// Keep the returned `Arc` if you intend to unsubscribe later — the
/// pointer is the subscriber's identity.
pub fn subscriber<F>(f: F) -> SubscriberFn
where
    F: Fn(&str, &Value, &DeliveryExtensions) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`CompletionFn`]
pub fn completion<F>(f: F) -> CompletionFn
where
    F: Fn(usize) -> Result<(), BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Callback identity: same allocation, same callback
fn same_callback<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Callback identity: same allocation, same subscriber
pub(crate) fn same_subscriber(a: &SubscriberFn, b: &SubscriberFn) -> bool {
    same_callback(a, b)
}

/// One publish entry inside a batch
///
/// This is what the mediator sees: name, payload, and an optional
/// completion callback. Entries appended by the mediator need no
/// completion callback. The trie path is never stored here — it is
/// recomputed after mediation, since the mediator may rewrite names.
#[derive(Clone)]
pub struct BatchEntry {
    /// Dot-separated hierarchical event name
    pub name: String,

    /// Event payload
    pub event: Value,

    /// Publisher's completion callback, if any
    pub completion: Option<CompletionFn>,
}

impl BatchEntry {
    /// Create a batch entry without a completion callback
    pub fn new(name: impl Into<String>, event: Value) -> Self {
        Self {
            name: name.into(),
            event,
            completion: None,
        }
    }
}

impl fmt::Debug for BatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchEntry")
            .field("name", &self.name)
            .field("event", &self.event)
            .field("completion", &self.completion.is_some())
            .finish()
    }
}

/// Action tag identifying which invocation an isolated failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureAction {
    /// A subscriber callback failed
    CallSubscriber,
    /// A publisher's completion callback failed
    CallCompletionCallback,
    /// The mediator failed (or produced an undeliverable entry)
    CallMediator,
}

/// The callback whose invocation failed, by shared handle
///
/// Carries a clone of the failing callback's `Arc`, so embedders can
/// identify it against their own handle (and, say, unsubscribe a
/// subscriber that keeps failing). The `is_*` methods compare
/// allocations, like `unsubscribe` does.
#[derive(Clone)]
pub enum FailureCallback {
    /// A subscriber callback
    Subscriber(SubscriberFn),
    /// A publisher's completion callback
    Completion(CompletionFn),
    /// The configured mediator
    Mediator(MediatorFn),
}

impl FailureCallback {
    /// Whether this is the given subscriber callback
    pub fn is_subscriber(&self, callback: &SubscriberFn) -> bool {
        matches!(self, FailureCallback::Subscriber(c) if same_callback(c, callback))
    }

    /// Whether this is the given completion callback
    pub fn is_completion(&self, callback: &CompletionFn) -> bool {
        matches!(self, FailureCallback::Completion(c) if same_callback(c, callback))
    }

    /// Whether this is the given mediator
    pub fn is_mediator(&self, callback: &MediatorFn) -> bool {
        matches!(self, FailureCallback::Mediator(c) if same_callback(c, callback))
    }
}

impl fmt::Debug for FailureCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (variant, ptr) = match self {
            FailureCallback::Subscriber(c) => ("Subscriber", Arc::as_ptr(c) as *const ()),
            FailureCallback::Completion(c) => ("Completion", Arc::as_ptr(c) as *const ()),
            FailureCallback::Mediator(c) => ("Mediator", Arc::as_ptr(c) as *const ()),
        };
        f.debug_tuple(variant).field(&ptr).finish()
    }
}

/// Structured detail forwarded to the exception reporter
///
/// `args` mirrors the arguments of the failed invocation as JSON — for a
/// subscriber failure `[{"name": ...}, {"event": ...}]`, for a completion
/// callback `[{"numberOfSubscribers": ...}]`, for the mediator
/// `[{"batch": [...]}]`.
#[derive(Debug)]
pub struct FailureReport {
    /// Which invocation failed
    pub action: FailureAction,

    /// The callback that failed
    pub callback: FailureCallback,

    /// Arguments of the failed invocation
    pub args: Value,

    /// The error the invocation returned
    pub error: BoxError,
}
