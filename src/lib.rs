//! # event-pump
//!
//! In-process hierarchical publish/subscribe event router.
//!
//! ## Overview
//!
//! `event-pump` routes named events (dot-separated hierarchical names)
//! to subscribers registered against exact names or wildcard patterns.
//! Delivery is deferred and batched: publishes queue up, a pluggable
//! scheduler runs a drain cycle later, and each batch passes through an
//! optional mediator before fanning out. Subscriber failures are
//! isolated and forwarded to an exception reporter; publishers can track
//! completion across subscribers that finish asynchronously.
//!
//! ## Quick Start
//!
//! ```rust
//! use event_pump::{subscriber, EventPump, ManualScheduler};
//!
//! let scheduler = ManualScheduler::new();
//! let pump = EventPump::new(scheduler.clone());
//!
//! pump.subscribe(
//!     "market.",  // trailing wildcard: any component at that position
//!     subscriber(|name, event, _extensions| {
//!         println!("{name}: {event}");
//!         Ok(())
//!     }),
//! )?;
//! scheduler.run_pending(); // establish the subscription
//!
//! pump.publish("market.forex", serde_json::json!({"rate": 7.35}))?;
//! scheduler.run_pending(); // deliver
//! # Ok::<(), event_pump::PumpError>(())
//! ```
//!
//! ## Patterns
//!
//! - `market.forex` — exact match
//! - `.forex` — empty component matches any value at that position
//! - `market` — missing tail matches any remaining depth
//! - `` (empty pattern) — matches every event
//!
//! ## Architecture
//!
//! - **EventPump** — public API: publish, subscribe, unsubscribe
//! - **Subscription registry** — component-path trie with wildcard matching
//! - **Scheduler** trait — pluggable "run later" primitive
//!   ([`TokioScheduler`], [`ManualScheduler`])
//! - **Hook chain** — augmenter, mediator, exception reporter,
//!   exception creator ([`PumpConfig`])
//! - **Delivery engine** — isolated per-subscriber fan-out with
//!   reference-counted completion tracking

pub mod delivery;
pub mod error;
pub mod hooks;
pub mod pump;
pub mod scheduler;
pub mod types;

mod path;
mod registry;

// Re-export core types
pub use delivery::{CompletionToken, DeliveryExtensions};
pub use error::{ErrorKind, PumpError, Result};
pub use hooks::PumpConfig;
pub use pump::EventPump;
pub use scheduler::{ManualScheduler, Scheduler, TokioScheduler};
pub use types::{
    completion, subscriber, AugmenterFn, BatchEntry, BoxError, CompletionFn, CreatorFn,
    FailureAction, FailureCallback, FailureReport, MediatorFn, ReporterFn, SubscriberFn,
};
