// ABOUTME: Crisis escalation workflow dispatching alerts and flagging sessions for review
// ABOUTME: Side effects are independent, best-effort, concurrent, and idempotent per request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # Crisis Escalation
//!
//! When a request resolves as a crisis, [`CrisisEscalationHandler`] runs the
//! safety-critical side-effect path: dispatch a [`CrisisAlertContext`] to
//! the notification collaborator and flag the session for human review.
//!
//! Failure semantics: neither side effect is ever fatal to the calling
//! analysis request. Each failure is recorded as an
//! [`AnalysisFailure`] so operators can detect missed escalations
//! out-of-band, and a failure in one side effect never cancels the other.
//!
//! The handler tolerates duplicate invocation: a key derived from the text
//! sample and caller identifiers suppresses re-dispatch when the caller
//! retries a whole request.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::EngineResult;
use crate::models::{
    AnalysisFailure, CrisisAlertContext, FailureKind, RoutingContext, RoutingDecision,
    SessionFlagParams, Severity,
};

/// Maximum characters of user text carried in an alert sample
pub const TEXT_SAMPLE_MAX_CHARS: usize = 500;

/// Tracked idempotency keys before a time-based sweep runs
const SEEN_SWEEP_THRESHOLD: usize = 1024;

/// Default deadline for each escalation side effect
const DEFAULT_SIDE_EFFECT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// External collaborator that dispatches crisis alerts to human responders
#[async_trait]
pub trait CrisisNotificationHandler: Send + Sync {
    /// Dispatch a crisis alert
    ///
    /// # Errors
    ///
    /// Returns an error when dispatch fails; the handler records it and
    /// continues with the remaining escalation steps.
    async fn send_crisis_alert(&self, alert: &CrisisAlertContext) -> EngineResult<()>;
}

/// External collaborator that flags sessions for human review
#[async_trait]
pub trait SessionFlaggingService: Send + Sync {
    /// Flag a session for review
    ///
    /// # Errors
    ///
    /// Returns an error when flagging fails; the handler records it without
    /// retrying.
    async fn flag_session_for_review(&self, params: &SessionFlagParams) -> EngineResult<()>;
}

/// Truncate text to an alert-safe sample
///
/// At most [`TEXT_SAMPLE_MAX_CHARS`] characters, with a trailing ellipsis
/// when truncation occurred; shorter text passes through unchanged.
#[must_use]
pub fn text_sample(text: &str) -> String {
    if text.chars().count() <= TEXT_SAMPLE_MAX_CHARS {
        return text.to_owned();
    }
    let mut sample: String = text.chars().take(TEXT_SAMPLE_MAX_CHARS).collect();
    sample.push_str("...");
    sample
}

/// Dispatches crisis alerts and flags sessions for human review
pub struct CrisisEscalationHandler {
    notifier: Option<Arc<dyn CrisisNotificationHandler>>,
    flagger: Option<Arc<dyn SessionFlaggingService>>,
    side_effect_timeout: StdDuration,
    seen: DashMap<String, chrono::DateTime<Utc>>,
}

impl CrisisEscalationHandler {
    /// Create a handler over the configured collaborators
    ///
    /// Either collaborator may be absent; the handler runs whichever side
    /// effects are available.
    #[must_use]
    pub fn new(
        notifier: Option<Arc<dyn CrisisNotificationHandler>>,
        flagger: Option<Arc<dyn SessionFlaggingService>>,
    ) -> Self {
        Self {
            notifier,
            flagger,
            side_effect_timeout: DEFAULT_SIDE_EFFECT_TIMEOUT,
            seen: DashMap::new(),
        }
    }

    /// Override the per-side-effect deadline
    #[must_use]
    pub fn with_side_effect_timeout(mut self, timeout: StdDuration) -> Self {
        self.side_effect_timeout = timeout;
        self
    }

    /// Run the escalation workflow for a crisis decision
    ///
    /// Both side effects fan out concurrently and are best-effort: failures
    /// are returned as [`AnalysisFailure`] records for the caller to attach
    /// to the analysis result. Duplicate invocations for the same text and
    /// caller identity are suppressed.
    pub async fn handle_crisis(
        &self,
        text: &str,
        decision: &RoutingDecision,
        confidence: f64,
        context: Option<&RoutingContext>,
    ) -> Vec<AnalysisFailure> {
        let key = idempotency_key(text, context);
        if self.seen.insert(key.clone(), Utc::now()).is_some() {
            debug!(idempotency_key = %key, "duplicate crisis escalation suppressed");
            return Vec::new();
        }
        self.sweep_seen();

        let sample = text_sample(text);
        let crisis_id = Uuid::new_v4().to_string();
        info!(
            crisis_id = %crisis_id,
            target_analyzer = %decision.target,
            confidence,
            "escalating crisis"
        );

        let alert = CrisisAlertContext {
            user_id: context.and_then(|c| c.user_id.clone()),
            session_id: context.and_then(|c| c.session_id.clone()),
            session_type: context.and_then(|c| c.session_type.clone()),
            timestamp: Utc::now(),
            text_sample: sample.clone(),
            decision_details: serde_json::to_value(decision)
                .unwrap_or(serde_json::Value::Null),
        };

        let notify = self.dispatch_alert(&alert);
        let flag = self.flag_session(&crisis_id, &sample, decision, confidence, context);
        let (notify_failure, flag_failure) = tokio::join!(notify, flag);

        notify_failure.into_iter().chain(flag_failure).collect()
    }

    async fn dispatch_alert(&self, alert: &CrisisAlertContext) -> Option<AnalysisFailure> {
        let notifier = self.notifier.as_ref()?;
        let dispatch =
            tokio::time::timeout(self.side_effect_timeout, notifier.send_crisis_alert(alert));
        match dispatch.await {
            Ok(Ok(())) => None,
            Ok(Err(error)) => {
                warn!(%error, "crisis alert dispatch failed");
                Some(
                    AnalysisFailure::new(
                        FailureKind::CrisisNotification,
                        "crisis alert dispatch failed",
                    )
                    .with_error(&error),
                )
            }
            Err(_elapsed) => {
                warn!("crisis alert dispatch timed out");
                Some(AnalysisFailure::new(
                    FailureKind::CrisisNotification,
                    "crisis alert dispatch timed out",
                ))
            }
        }
    }

    async fn flag_session(
        &self,
        crisis_id: &str,
        sample: &str,
        decision: &RoutingDecision,
        confidence: f64,
        context: Option<&RoutingContext>,
    ) -> Option<AnalysisFailure> {
        let flagger = self.flagger.as_ref()?;
        // Flagging requires a user to attach the review to
        let user_id = context.and_then(|c| c.user_id.clone())?;

        let params = SessionFlagParams {
            user_id,
            session_id: context.and_then(|c| c.session_id.clone()),
            crisis_id: crisis_id.to_owned(),
            timestamp: Utc::now(),
            reason: "crisis_language_detected".to_owned(),
            severity: Severity::High,
            detected_risks: detected_risks(decision),
            confidence,
            text_sample: sample.to_owned(),
            routing_decision: Some(decision.clone()),
        };

        let flag =
            tokio::time::timeout(self.side_effect_timeout, flagger.flag_session_for_review(&params));
        match flag.await {
            Ok(Ok(())) => None,
            Ok(Err(error)) => {
                warn!(%error, crisis_id, "session flagging failed");
                Some(
                    AnalysisFailure::new(FailureKind::SessionFlagging, "session flagging failed")
                        .with_error(&error)
                        .with_context(crisis_id.to_owned()),
                )
            }
            Err(_elapsed) => {
                warn!(crisis_id, "session flagging timed out");
                Some(
                    AnalysisFailure::new(FailureKind::SessionFlagging, "session flagging timed out")
                        .with_context(crisis_id.to_owned()),
                )
            }
        }
    }

    fn sweep_seen(&self) {
        if self.seen.len() > SEEN_SWEEP_THRESHOLD {
            let cutoff = Utc::now() - Duration::hours(1);
            self.seen.retain(|_, seen_at| *seen_at > cutoff);
        }
    }
}

/// Risk indicators for the review flag, from routing insights or the default
fn detected_risks(decision: &RoutingDecision) -> Vec<String> {
    decision.matched_term().map_or_else(
        || vec!["crisis_detected".to_owned()],
        |term| vec![format!("keyword:{term}")],
    )
}

/// Derive a stable idempotency key from the text sample and caller identity
fn idempotency_key(text: &str, context: Option<&RoutingContext>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text_sample(text).as_bytes());
    if let Some(context) = context {
        if let Some(user_id) = &context.user_id {
            hasher.update(user_id.as_bytes());
        }
        if let Some(session_id) = &context.session_id {
            hasher.update(session_id.as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}
