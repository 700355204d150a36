//! Rule-driven field transformation engine
//!
//! Walks a record in canonical depth-first order, resolves a rule per leaf,
//! executes the bound action, and buffers one audit event per touched
//! field. Events are flushed to the recorder once per record. The caller's
//! record is never mutated; the engine either returns a fully protected
//! copy or no record at all.

use fieldveil_actions::{ActionRegistry, Capability};
use fieldveil_core::{Error, FieldPath, FieldValue, Record, Result};
use fieldveil_policy::{resolve, FailurePolicy, Policy, Rule};
use fieldveil_telemetry::{AuditEvent, AuditRecorder, MetricsCollector, Notifier};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Marker substituted for a field whose `fail_open_redact` action failed
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Result of a whole-record transformation
#[derive(Debug, Clone)]
pub struct Transformed {
    /// The fully protected copy of the input record
    pub record: Record,

    /// Audit events in field traversal order, already flushed to the
    /// recorder
    pub events: Vec<AuditEvent>,
}

/// Builder for [`TransformEngine`]
pub struct TransformEngineBuilder {
    registry: ActionRegistry,
    recorder: Arc<dyn AuditRecorder>,
    notifier: Option<Arc<dyn Notifier>>,
    metrics: MetricsCollector,
    default_failure: FailurePolicy,
}

impl TransformEngineBuilder {
    /// Attach a best-effort notifier for failure events
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Share a metrics collector with the embedding application
    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = metrics;
        self
    }

    /// Failure policy applied to rules that do not set their own.
    /// Defaults to [`FailurePolicy::FailClosed`].
    pub fn with_default_failure(mut self, policy: FailurePolicy) -> Self {
        self.default_failure = policy;
        self
    }

    pub fn build(self) -> TransformEngine {
        TransformEngine {
            registry: self.registry,
            recorder: self.recorder,
            notifier: self.notifier,
            metrics: self.metrics,
            default_failure: self.default_failure,
        }
    }
}

/// The transformation engine. All collaborators are injected; the engine
/// holds no ambient state and is safe to share across threads.
pub struct TransformEngine {
    registry: ActionRegistry,
    recorder: Arc<dyn AuditRecorder>,
    notifier: Option<Arc<dyn Notifier>>,
    metrics: MetricsCollector,
    default_failure: FailurePolicy,
}

impl TransformEngine {
    /// Start building an engine from its two mandatory collaborators
    pub fn builder(
        registry: ActionRegistry,
        recorder: Arc<dyn AuditRecorder>,
    ) -> TransformEngineBuilder {
        TransformEngineBuilder {
            registry,
            recorder,
            notifier: None,
            metrics: MetricsCollector::new(),
            default_failure: FailurePolicy::default(),
        }
    }

    /// Apply a policy to a record, producing a protected copy plus its
    /// audit trail. See [`Self::apply_cancellable`] for semantics.
    pub fn apply(&self, policy: &Policy, record: &Record) -> Result<Transformed> {
        self.apply_inner(policy, record, None)
    }

    /// Like [`Self::apply`], stopping before each action invocation when
    /// `cancel` fires. A cancelled call fails as a whole; partial records
    /// are never returned.
    pub fn apply_cancellable(
        &self,
        policy: &Policy,
        record: &Record,
        cancel: &CancellationToken,
    ) -> Result<Transformed> {
        self.apply_inner(policy, record, Some(cancel))
    }

    /// Recover the original value behind a reversible action's output.
    ///
    /// Privileged operation; callers own the authorization check.
    pub fn reveal(&self, action_name: &str, token: &str) -> Result<FieldValue> {
        let action = self.registry.resolve(action_name)?;
        if action.capability() != Capability::Reversible {
            return Err(Error::NotReversible(action_name.to_string()));
        }
        action.reveal(token)
    }

    /// Snapshot of this engine's metrics
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    fn apply_inner(
        &self,
        policy: &Policy,
        record: &Record,
        cancel: Option<&CancellationToken>,
    ) -> Result<Transformed> {
        let started = Instant::now();
        let mut ctx = ApplyContext {
            policy,
            record_id: &record.id,
            cancel,
            events: Vec::new(),
            leaves_visited: 0,
            fail_closed_involved: false,
        };

        let root = match self.transform_value(&mut ctx, &FieldPath::root(), &record.root) {
            Ok(root) => root,
            Err(e) => {
                // The attempt is still auditable even though no record is
                // returned; losing these events must not mask the original
                // error.
                if let Err(flush_err) = self.recorder.record_batch(&ctx.events) {
                    warn!(record = %record.id, "audit flush after abort failed: {}", flush_err);
                }
                self.notify_failures(&ctx.events);
                return Err(e);
            }
        };

        match self.recorder.record_batch(&ctx.events) {
            Ok(_) => {}
            Err(e) if ctx.fail_closed_involved => {
                return Err(Error::audit(format!(
                    "audit write for fail-closed rule could not be confirmed: {e}"
                )));
            }
            Err(e) => {
                // The store retries internally; without a fail-closed rule
                // in play this is not the caller's failure.
                warn!(record = %record.id, "audit flush failed: {}", e);
            }
        }
        self.notify_failures(&ctx.events);

        for event in &ctx.events {
            self.metrics.record_action(&event.action, event.outcome.label());
        }
        self.metrics
            .record_transformation(ctx.leaves_visited, started.elapsed());

        debug!(
            record = %record.id,
            policy = %policy.id(),
            fields = ctx.leaves_visited,
            events = ctx.events.len(),
            "record transformed"
        );

        Ok(Transformed {
            record: Record {
                id: record.id.clone(),
                root,
            },
            events: ctx.events,
        })
    }

    fn transform_value(
        &self,
        ctx: &mut ApplyContext<'_>,
        path: &FieldPath,
        value: &FieldValue,
    ) -> Result<FieldValue> {
        match value {
            FieldValue::Map(entries) => {
                let mut transformed = Vec::with_capacity(entries.len());
                for (key, child) in entries {
                    let child_path = path.child(key.clone());
                    transformed.push((key.clone(), self.transform_value(ctx, &child_path, child)?));
                }
                Ok(FieldValue::Map(transformed))
            }
            FieldValue::Seq(items) => {
                let mut transformed = Vec::with_capacity(items.len());
                for (index, child) in items.iter().enumerate() {
                    let child_path = path.child(index.to_string());
                    transformed.push(self.transform_value(ctx, &child_path, child)?);
                }
                Ok(FieldValue::Seq(transformed))
            }
            leaf => self.transform_leaf(ctx, path, leaf),
        }
    }

    fn transform_leaf(
        &self,
        ctx: &mut ApplyContext<'_>,
        path: &FieldPath,
        leaf: &FieldValue,
    ) -> Result<FieldValue> {
        ctx.leaves_visited += 1;

        if let Some(cancel) = ctx.cancel {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
        }

        let Some(rule) = resolve(ctx.policy, path, leaf) else {
            return Ok(leaf.clone());
        };

        // Post-validation this cannot fail: load rejected unknown actions.
        let action = self.registry.resolve(&rule.action)?;
        let failure_policy = rule.on_failure.unwrap_or(self.default_failure);
        if failure_policy == FailurePolicy::FailClosed {
            ctx.fail_closed_involved = true;
        }
        let sequence = ctx.events.len() as u64;

        match action.transform(leaf, &rule.params) {
            Ok(output) => {
                ctx.events.push(AuditEvent::success(
                    ctx.record_id,
                    path.clone(),
                    &rule.action,
                    sequence,
                    output.summary,
                ));
                Ok(output.value)
            }
            Err(e) => {
                ctx.events.push(AuditEvent::failure(
                    ctx.record_id,
                    path.clone(),
                    &rule.action,
                    sequence,
                    e.to_string(),
                ));
                self.handle_failure(path, rule, failure_policy, e)
            }
        }
    }

    fn handle_failure(
        &self,
        path: &FieldPath,
        rule: &Rule,
        failure_policy: FailurePolicy,
        cause: Error,
    ) -> Result<FieldValue> {
        match failure_policy {
            FailurePolicy::FailClosed => Err(Error::action_failed(
                path.to_string(),
                &rule.action,
                cause.to_string(),
            )),
            FailurePolicy::FailOpenRedact => {
                warn!(
                    field = %path,
                    action = %rule.action,
                    "action failed, redacting field and continuing: {}", cause
                );
                Ok(FieldValue::String(REDACTION_MARKER.to_string()))
            }
        }
    }

    fn notify_failures(&self, events: &[AuditEvent]) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        for event in events.iter().filter(|event| event.outcome.is_failure()) {
            notifier.deliver(event);
        }
    }
}

struct ApplyContext<'a> {
    policy: &'a Policy,
    record_id: &'a str,
    cancel: Option<&'a CancellationToken>,
    events: Vec<AuditEvent>,
    leaves_visited: u64,
    fail_closed_involved: bool,
}
