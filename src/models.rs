// ABOUTME: Shared data model for routing decisions, analysis results, and failure records
// ABOUTME: All types are serde-serializable so results round-trip through JSON losslessly
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # Data Model
//!
//! Core entities flowing through the triage pipeline:
//!
//! - [`RoutingDecision`]: outcome of classifying text into a target analyzer
//! - [`AnalysisResult`]: final verdict returned to the caller, always present
//!   even when internal steps degraded
//! - [`AnalysisFailure`]: record of a degraded step, accumulated per request
//! - [`CrisisAlertContext`]: payload dispatched to the crisis notifier
//! - [`SessionFlagParams`]: payload for the session-flagging collaborator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// Analyzer Targets and Routing Provenance
// ============================================================================

/// Specialized analysis path a piece of text can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerTarget {
    /// Acute risk content requiring escalation
    Crisis,
    /// Depressive symptom analysis
    Depression,
    /// Anxiety and panic analysis
    Anxiety,
    /// Stress and burnout analysis
    Stress,
    /// Positive wellbeing and self-care content
    Wellness,
    /// Broad mental-health analysis when no narrow path applies
    GeneralMentalHealth,
    /// Classification could not determine a target
    Unknown,
}

impl AnalyzerTarget {
    /// String label used in prompts and serialized output
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Crisis => "crisis",
            Self::Depression => "depression",
            Self::Anxiety => "anxiety",
            Self::Stress => "stress",
            Self::Wellness => "wellness",
            Self::GeneralMentalHealth => "general_mental_health",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this target represents acute crisis content
    #[must_use]
    pub const fn is_crisis(&self) -> bool {
        matches!(self, Self::Crisis)
    }

    /// Parse a caller-supplied label (explicit hints, category lists)
    ///
    /// Returns `None` for labels that name no known analyzer.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "crisis" => Some(Self::Crisis),
            "depression" => Some(Self::Depression),
            "anxiety" => Some(Self::Anxiety),
            "stress" => Some(Self::Stress),
            "wellness" => Some(Self::Wellness),
            "general_mental_health" | "general" | "mental_health" => {
                Some(Self::GeneralMentalHealth)
            }
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Map a raw model-produced category label through the immutable lookup
    /// table used by the classification path
    ///
    /// Known synonyms resolve to their analyzer; unmapped non-empty labels
    /// resolve to [`Self::GeneralMentalHealth`] (the model asserted some
    /// mental-health signal); empty labels resolve to [`Self::Unknown`].
    #[must_use]
    pub fn from_model_label(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "" => Self::Unknown,
            "crisis" | "suicidal" | "suicidal_ideation" | "self_harm" => Self::Crisis,
            "depression" | "depressive" | "depressed" => Self::Depression,
            "anxiety" | "anxious" | "panic" => Self::Anxiety,
            "stress" | "stressed" | "burnout" => Self::Stress,
            "wellness" | "wellbeing" | "well_being" | "positive" => Self::Wellness,
            "general_mental_health" | "general" | "mental_health" => Self::GeneralMentalHealth,
            "unknown" | "none" => Self::Unknown,
            _ => Self::GeneralMentalHealth,
        }
    }
}

impl fmt::Display for AnalyzerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a routing decision was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMethod {
    /// Caller supplied an explicit task hint
    ExplicitHint,
    /// Deterministic keyword rule match
    Keyword,
    /// Model-backed classification
    LlmClassification,
    /// Session-type contextual rule override
    ContextualRule,
    /// Fusion of agreeing keyword and model signals
    Combined,
}

// ============================================================================
// Routing Decision
// ============================================================================

/// Outcome of classifying text into a target analysis category
///
/// Invariants enforced by construction: `confidence` is clamped to `[0, 1]`
/// and `is_critical` is `true` whenever the target is [`AnalyzerTarget::Crisis`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Analyzer the text should be routed to
    pub target: AnalyzerTarget,
    /// Confidence in the decision (0.0 - 1.0)
    pub confidence: f64,
    /// Provenance of the decision
    pub method: RoutingMethod,
    /// Whether the decision demands the crisis escalation path
    pub is_critical: bool,
    /// Open key/value map for audit (matched terms, raw labels, failure markers)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub insights: Map<String, Value>,
}

impl RoutingDecision {
    /// Create a decision, clamping confidence and deriving criticality
    #[must_use]
    pub fn new(target: AnalyzerTarget, confidence: f64, method: RoutingMethod) -> Self {
        Self {
            target,
            confidence: clamp_confidence(confidence),
            method,
            is_critical: target.is_crisis(),
            insights: Map::new(),
        }
    }

    /// Fallback decision when no classification signal is available
    #[must_use]
    pub fn fallback(confidence: f64) -> Self {
        Self::new(
            AnalyzerTarget::Unknown,
            confidence,
            RoutingMethod::LlmClassification,
        )
    }

    /// Attach an audit insight
    #[must_use]
    pub fn with_insight(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insights.insert(key.into(), value.into());
        self
    }

    /// Matched keyword term recorded by the keyword classifier, if any
    #[must_use]
    pub fn matched_term(&self) -> Option<&str> {
        self.insights.get("matched_term").and_then(Value::as_str)
    }
}

/// Clamp a confidence score into the valid `[0, 1]` range
#[must_use]
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Routing Context
// ============================================================================

/// Caller-supplied situational data, immutable per request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingContext {
    /// Identifier of the user whose text is being analyzed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Session the text originated from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Kind of session (e.g. `stress_management_session`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_type: Option<String>,
    /// Explicit analyzer hint supplied by the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit_task_hint: Option<String>,
}

impl RoutingContext {
    /// Empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user id
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the session id
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the session type
    #[must_use]
    pub fn with_session_type(mut self, session_type: impl Into<String>) -> Self {
        self.session_type = Some(session_type.into());
        self
    }

    /// Set an explicit analyzer hint
    #[must_use]
    pub fn with_explicit_hint(mut self, hint: impl Into<String>) -> Self {
        self.explicit_task_hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Failure Records
// ============================================================================

/// Kind of degraded step recorded during one analysis request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Model backend invocation failed
    LlmInvocation,
    /// Model response could not be parsed into a verdict
    LlmResponseParsing,
    /// Model returned empty content
    LlmResponseEmpty,
    /// Evidence extraction collaborator failed
    EvidenceExtraction,
    /// Crisis alert dispatch failed
    CrisisNotification,
    /// Session flagging for review failed
    SessionFlagging,
    /// Required configuration was missing
    Configuration,
    /// Unexpected failure in a higher-level flow
    Orchestration,
}

/// Record of a degraded step; accumulated within one request, never thrown
/// across the public boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisFailure {
    /// Failure taxonomy kind
    pub kind: FailureKind,
    /// Human-readable description of what degraded
    pub message: String,
    /// When the failure was recorded
    pub timestamp: DateTime<Utc>,
    /// Underlying error text, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Step context (e.g. the category being analyzed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl AnalysisFailure {
    /// Create a failure record stamped with the current time
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            error: None,
            context: None,
        }
    }

    /// Attach the underlying error text
    #[must_use]
    pub fn with_error(mut self, error: &impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Attach step context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

// ============================================================================
// Analysis Request / Options
// ============================================================================

/// Model quality tier used for detailed analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Low-latency tier for classification-grade calls
    Fast,
    /// Balanced default tier
    #[default]
    Standard,
    /// Highest-quality tier for nuanced analysis
    Premium,
}

impl ModelTier {
    /// String label for serialized output
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

/// Category selection mode for an analysis request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategorySelection {
    /// Let the task router decide
    #[default]
    AutoRoute,
    /// Caller-asserted category labels; routing is skipped
    Explicit(Vec<String>),
}

/// Per-request analysis options
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Model tier override; falls back to the configured default
    pub model_tier: Option<ModelTier>,
    /// Opaque provider-specific parameters, forwarded onto the
    /// detailed-analysis invocation (the routing-classification call is a
    /// fixed-shape internal call and excludes them)
    pub provider_params: Option<Value>,
}

/// Input to [`crate::analysis::AnalysisOrchestrator::analyze_mental_health`]
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    /// Free-form user text to analyze
    pub text: String,
    /// Category selection mode
    pub categories: CategorySelection,
    /// Caller-supplied situational context
    pub routing_context: Option<RoutingContext>,
    /// Per-request options
    pub options: AnalysisOptions,
}

impl AnalysisRequest {
    /// Auto-routed request for the given text
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Use explicit category labels instead of routing
    #[must_use]
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = CategorySelection::Explicit(categories);
        self
    }

    /// Attach routing context
    #[must_use]
    pub fn with_context(mut self, context: RoutingContext) -> Self {
        self.routing_context = Some(context);
        self
    }

    /// Override the model tier
    #[must_use]
    pub fn with_model_tier(mut self, tier: ModelTier) -> Self {
        self.options.model_tier = Some(tier);
        self
    }

    /// Forward provider-specific parameters to the detailed analysis call
    #[must_use]
    pub fn with_provider_params(mut self, params: Value) -> Self {
        self.options.provider_params = Some(params);
        self
    }
}

// ============================================================================
// Analysis Result
// ============================================================================

/// Final verdict returned to the caller
///
/// Always returned, even on internal failure: degraded steps appear in
/// `failures` and reduce `confidence` instead of aborting the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Whether the text indicates a mental-health concern
    pub has_mental_health_issue: bool,
    /// Resolved analysis category
    pub category: AnalyzerTarget,
    /// Confidence in the verdict (0.0 - 1.0)
    pub confidence: f64,
    /// Human-readable explanation of the verdict
    pub explanation: String,
    /// Ordered, deduplicated supporting snippets, capped by configuration
    pub supporting_evidence: Vec<String>,
    /// When the analysis completed
    pub timestamp: DateTime<Utc>,
    /// Model tier used for the detailed analysis
    pub model_tier: ModelTier,
    /// Whether the crisis escalation path was taken
    pub is_crisis: bool,
    /// Embedded copy of the routing decision, when routing ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_decision: Option<RoutingDecision>,
    /// Degraded steps recorded during this request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<AnalysisFailure>,
}

// ============================================================================
// Escalation Payloads
// ============================================================================

/// Severity attached to a flagged session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational flag
    Low,
    /// Needs review soon
    Medium,
    /// Needs immediate human review
    High,
}

/// Payload dispatched to the crisis notification collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisAlertContext {
    /// User the alert concerns, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Session the text originated from, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Kind of session, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_type: Option<String>,
    /// When the alert was raised
    pub timestamp: DateTime<Utc>,
    /// Truncated sample of the triggering text (at most 500 chars + ellipsis)
    pub text_sample: String,
    /// Serialized routing decision for reviewer context
    pub decision_details: Value,
}

/// Payload for the session-flagging collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFlagParams {
    /// User whose session is flagged
    pub user_id: String,
    /// Session to flag, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Correlation id for this escalation
    pub crisis_id: String,
    /// When the flag was raised
    pub timestamp: DateTime<Utc>,
    /// Why the session was flagged
    pub reason: String,
    /// Review severity
    pub severity: Severity,
    /// Detected risk indicators
    pub detected_risks: Vec<String>,
    /// Confidence of the triggering decision
    pub confidence: f64,
    /// Truncated sample of the triggering text
    pub text_sample: String,
    /// Routing decision that triggered the flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_decision: Option<RoutingDecision>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_clamps_confidence_and_derives_criticality() {
        let decision = RoutingDecision::new(AnalyzerTarget::Crisis, 1.7, RoutingMethod::Keyword);
        assert!((decision.confidence - 1.0).abs() < f64::EPSILON);
        assert!(decision.is_critical);

        let decision =
            RoutingDecision::new(AnalyzerTarget::Stress, -0.2, RoutingMethod::Keyword);
        assert!(decision.confidence.abs() < f64::EPSILON);
        assert!(!decision.is_critical);
    }

    #[test]
    fn nan_confidence_clamps_to_zero() {
        assert!(clamp_confidence(f64::NAN).abs() < f64::EPSILON);
    }

    #[test]
    fn model_label_mapping_resolves_synonyms() {
        assert_eq!(
            AnalyzerTarget::from_model_label("Suicidal Ideation"),
            AnalyzerTarget::Crisis
        );
        assert_eq!(
            AnalyzerTarget::from_model_label("burnout"),
            AnalyzerTarget::Stress
        );
        assert_eq!(
            AnalyzerTarget::from_model_label("something_else"),
            AnalyzerTarget::GeneralMentalHealth
        );
        assert_eq!(AnalyzerTarget::from_model_label("  "), AnalyzerTarget::Unknown);
    }

    #[test]
    fn routing_decision_round_trips_through_json() {
        let decision = RoutingDecision::new(AnalyzerTarget::Anxiety, 0.8, RoutingMethod::Combined)
            .with_insight("matched_term", "panic attack");
        let json = serde_json::to_string(&decision).unwrap();
        let back: RoutingDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(back.target, decision.target);
        assert_eq!(back.method, decision.method);
        assert_eq!(back.matched_term(), Some("panic attack"));
    }
}
