//! Delivery engine — per-event fan-out and completion tracking
//!
//! One delivery fans a single event out to every matched subscriber,
//! isolating their failures, and tells the publisher when all of them
//! (including subscribers that defer their own completion) are done.
//!
//! Completion is reference-counted: the pending counter starts at 1 (a
//! placeholder held by the fan-out itself, so the count cannot hit zero
//! while subscribers are still being invoked). Every
//! [`make_asynchronous`](DeliveryExtensions::make_asynchronous) call adds
//! one; every consumed [`CompletionToken`] and the placeholder release
//! each remove one. Zero fires the completion signal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::hooks::Hooks;
use crate::types::{CompletionFn, FailureAction, FailureCallback, SubscriberFn};

struct CompletionState {
    pending: AtomicUsize,
    /// Subscribers synchronously invoked, fixed at fan-out time, so the
    /// publisher sees the same count no matter when completion fires.
    invoked: usize,
    completion: Option<CompletionFn>,
    hooks: Arc<Hooks>,
}

impl CompletionState {
    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.signal();
        }
    }

    fn signal(&self) {
        if let Some(completion) = &self.completion {
            if let Err(error) = completion(self.invoked) {
                self.hooks.report(
                    FailureAction::CallCompletionCallback,
                    FailureCallback::Completion(Arc::clone(completion)),
                    json!([{ "numberOfSubscribers": self.invoked }]),
                    error,
                );
            }
        }
    }
}

/// Per-invocation capabilities handed to each subscriber
pub struct DeliveryExtensions {
    state: Arc<CompletionState>,
}

impl DeliveryExtensions {
    /// Defer this event's completion signal until the returned token is
    /// consumed
    ///
    /// May be called more than once; every token must be consumed before
    /// the publisher's completion callback fires.
    pub fn make_asynchronous(&self) -> CompletionToken {
        self.state.pending.fetch_add(1, Ordering::AcqRel);
        CompletionToken {
            state: Arc::clone(&self.state),
        }
    }
}

/// One-shot handle deferring an event's completion signal
///
/// Single use is enforced by move semantics: [`complete`](Self::complete)
/// consumes the token. A token that is dropped without being completed
/// stalls the completion signal for its event.
pub struct CompletionToken {
    state: Arc<CompletionState>,
}

impl CompletionToken {
    /// Mark this asynchronous subscriber as finished
    pub fn complete(self) {
        self.state.finish_one();
    }
}

/// Fan one event out to the matched subscribers
///
/// `matched` is a snapshot — registry mutations made by reentrant calls
/// from inside a callback do not affect this fan-out. Subscriber errors
/// are reported (action `callSubscriber`) and swallowed; the completion
/// callback receives the number of subscribers invoked here.
pub(crate) fn deliver(
    matched: Vec<SubscriberFn>,
    name: &str,
    event: &Value,
    completion: Option<CompletionFn>,
    hooks: &Arc<Hooks>,
) {
    let state = Arc::new(CompletionState {
        pending: AtomicUsize::new(1),
        invoked: matched.len(),
        completion,
        hooks: Arc::clone(hooks),
    });

    for callback in &matched {
        let extensions = DeliveryExtensions {
            state: Arc::clone(&state),
        };
        if let Err(error) = callback(name, event, &extensions) {
            hooks.report(
                FailureAction::CallSubscriber,
                FailureCallback::Subscriber(Arc::clone(callback)),
                json!([{ "name": name }, { "event": event }]),
                error,
            );
        }
    }

    // Release the placeholder; fires immediately when no subscriber
    // went asynchronous.
    state.finish_one();
}
