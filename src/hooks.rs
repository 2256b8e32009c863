//! Hook chain — augmenter, mediator, exception reporter, exception creator
//!
//! All four hooks are optional and configured at construction time via
//! [`PumpConfig`]. Defaults: identity augmenter, identity mediator, a
//! reporter that logs at `debug` level, and the stock [`PumpError`]
//! constructor.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::{ErrorKind, PumpError, Result};
use crate::types::{
    AugmenterFn, BatchEntry, BoxError, CreatorFn, FailureAction, FailureCallback, FailureReport,
    MediatorFn, ReporterFn,
};

/// Construction-time configuration for an event pump
///
/// ```
/// use event_pump::PumpConfig;
///
/// let config = PumpConfig::default()
///     .with_augmenter(|_name, event| Ok(event))
///     .with_exception_reporter(|report| {
///         eprintln!("delivery failure: {:?}", report.action);
///         Ok(())
///     });
/// ```
#[derive(Default)]
pub struct PumpConfig {
    augmenter: Option<AugmenterFn>,
    mediator: Option<MediatorFn>,
    exception_reporter: Option<ReporterFn>,
    exception_creator: Option<CreatorFn>,
}

impl PumpConfig {
    /// Validate/transform events at publish time
    ///
    /// Runs before enqueueing, outside failure isolation: an `Err` from
    /// the augmenter is returned to the `publish` caller.
    pub fn with_augmenter<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Value) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.augmenter = Some(Arc::new(f));
        self
    }

    /// Transform each batch before delivery
    ///
    /// The mediator may reorder, delete, or append entries. If it fails,
    /// the failure is reported and the original batch is delivered.
    pub fn with_mediator<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<BatchEntry>) -> std::result::Result<Vec<BatchEntry>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.mediator = Some(Arc::new(f));
        self
    }

    /// Receive isolated delivery-time failures
    pub fn with_exception_reporter<F>(mut self, f: F) -> Self
    where
        F: Fn(&FailureReport) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.exception_reporter = Some(Arc::new(f));
        self
    }

    /// Build validation errors matching the embedder's conventions
    pub fn with_exception_creator<F>(mut self, f: F) -> Self
    where
        F: Fn(ErrorKind, String) -> PumpError + Send + Sync + 'static,
    {
        self.exception_creator = Some(Arc::new(f));
        self
    }
}

/// Resolved hook set shared by the pump and its delivery machinery
pub(crate) struct Hooks {
    augmenter: Option<AugmenterFn>,
    mediator: Option<MediatorFn>,
    exception_reporter: Option<ReporterFn>,
    exception_creator: Option<CreatorFn>,
}

impl Hooks {
    pub(crate) fn from_config(config: PumpConfig) -> Self {
        Self {
            augmenter: config.augmenter,
            mediator: config.mediator,
            exception_reporter: config.exception_reporter,
            exception_creator: config.exception_creator,
        }
    }

    /// Apply the augmenter; `Err` propagates to the publish caller
    pub(crate) fn augment(&self, name: &str, event: Value) -> Result<Value> {
        match &self.augmenter {
            Some(augmenter) => augmenter(name, event).map_err(PumpError::Rejected),
            None => Ok(event),
        }
    }

    /// Apply the mediator to a batch
    ///
    /// A mediator failure is reported with action `callMediator` and the
    /// original batch is returned unchanged — mediator failure must not
    /// drop events.
    pub(crate) fn mediate(&self, batch: Vec<BatchEntry>) -> Vec<BatchEntry> {
        let Some(mediator) = &self.mediator else {
            return batch;
        };
        match mediator(batch.clone()) {
            Ok(mediated) => mediated,
            Err(error) => {
                let entries: Vec<Value> = batch
                    .iter()
                    .map(|entry| json!({ "name": entry.name, "event": entry.event }))
                    .collect();
                self.report(
                    FailureAction::CallMediator,
                    FailureCallback::Mediator(Arc::clone(mediator)),
                    json!([{ "batch": entries }]),
                    error,
                );
                batch
            }
        }
    }

    /// Report a failure attributable to the configured mediator
    ///
    /// Only reachable for batch entries the mediator wrote, so a
    /// missing mediator means there is nothing to report.
    pub(crate) fn report_mediator(&self, args: Value, error: BoxError) {
        if let Some(mediator) = &self.mediator {
            self.report(
                FailureAction::CallMediator,
                FailureCallback::Mediator(Arc::clone(mediator)),
                args,
                error,
            );
        }
    }

    /// Forward an isolated failure to the reporter
    ///
    /// A failing reporter is logged on the diagnostic fallback channel
    /// and never re-reported.
    pub(crate) fn report(
        &self,
        action: FailureAction,
        callback: FailureCallback,
        args: Value,
        error: BoxError,
    ) {
        let report = FailureReport {
            action,
            callback,
            args,
            error,
        };
        match &self.exception_reporter {
            Some(reporter) => {
                if let Err(secondary) = reporter(&report) {
                    tracing::error!(
                        action = ?report.action,
                        error = %secondary,
                        "Exception reporter failed"
                    );
                }
            }
            None => {
                tracing::debug!(
                    action = ?report.action,
                    error = %report.error,
                    "Delivery-time failure (no reporter configured)"
                );
            }
        }
    }

    /// Build a validation error through the creator hook
    pub(crate) fn create_error(&self, kind: ErrorKind, message: String) -> PumpError {
        match &self.exception_creator {
            Some(creator) => creator(kind, message),
            None => PumpError::new(kind, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn hooks(config: PumpConfig) -> Hooks {
        Hooks::from_config(config)
    }

    #[test]
    fn test_default_augmenter_is_identity() {
        let h = hooks(PumpConfig::default());
        let event = h.augment("order.created", json!({"id": 1})).unwrap();
        assert_eq!(event, json!({"id": 1}));
    }

    #[test]
    fn test_augmenter_error_becomes_rejected() {
        let h = hooks(PumpConfig::default().with_augmenter(|_, _| Err("no source".into())));
        let err = h.augment("order.created", json!({})).unwrap_err();
        assert!(matches!(err, PumpError::Rejected(_)));
    }

    #[test]
    fn test_mediator_failure_keeps_original_batch() {
        let reports: Arc<Mutex<Vec<FailureAction>>> = Arc::default();
        let seen = Arc::clone(&reports);
        let h = hooks(
            PumpConfig::default()
                .with_mediator(|_| Err("mediator broke".into()))
                .with_exception_reporter(move |report| {
                    assert!(matches!(report.callback, FailureCallback::Mediator(_)));
                    seen.lock().unwrap().push(report.action);
                    Ok(())
                }),
        );

        let batch = vec![
            BatchEntry::new("order.created", json!({"id": "first"})),
            BatchEntry::new("order.created", json!({"id": "second"})),
        ];
        let delivered = h.mediate(batch);

        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].event, json!({"id": "first"}));
        assert_eq!(*reports.lock().unwrap(), vec![FailureAction::CallMediator]);
    }

    #[test]
    fn test_mediator_can_reorder() {
        let h = hooks(PumpConfig::default().with_mediator(|mut batch| {
            batch.reverse();
            Ok(batch)
        }));
        let delivered = h.mediate(vec![
            BatchEntry::new("a", json!(1)),
            BatchEntry::new("b", json!(2)),
        ]);
        assert_eq!(delivered[0].name, "b");
        assert_eq!(delivered[1].name, "a");
    }

    #[test]
    fn test_custom_creator_receives_kind_and_message() {
        let h = hooks(
            PumpConfig::default()
                .with_exception_creator(|kind, message| PumpError::new(kind, format!("[app] {message}"))),
        );
        let err = h.create_error(ErrorKind::BadEventName, "oops".to_string());
        assert_eq!(err.to_string(), "Bad event name: [app] oops");
    }

    #[test]
    fn test_failing_reporter_does_not_propagate() {
        let h = hooks(
            PumpConfig::default().with_exception_reporter(|_| Err("reporter broke".into())),
        );
        // Only the fallback log channel sees this.
        let failed = crate::types::subscriber(|_, _, _| Ok(()));
        h.report(
            FailureAction::CallSubscriber,
            FailureCallback::Subscriber(failed),
            json!([]),
            "boom".into(),
        );
    }
}
