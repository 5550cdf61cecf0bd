// ABOUTME: Deterministic contextual rule pass keyed on the caller's session type
// ABOUTME: Rules either replace the routed decision or return it unchanged
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # Contextual Rules
//!
//! The final routing stage: a small deterministic rule table keyed on
//! `RoutingContext::session_type`. A stress-management session biases
//! toward the stress analyzer when stress terms are present; a crisis
//! intervention follow-up elevates to crisis when distress terms are
//! present. Rules never lower a critical decision.

use tracing::debug;

use crate::config::RoutingThresholds;
use crate::models::{AnalyzerTarget, RoutingContext, RoutingDecision, RoutingMethod};

/// Session type that biases routing toward the stress analyzer
pub const STRESS_MANAGEMENT_SESSION: &str = "stress_management_session";

/// Session type that elevates distressed text to the crisis analyzer
pub const CRISIS_FOLLOW_UP_SESSION: &str = "crisis_intervention_follow_up";

const STRESS_TERMS: &[&str] = &[
    "stress",
    "stressed",
    "pressure",
    "overwhelmed",
    "deadline",
    "workload",
    "too much",
];

const DISTRESS_TERMS: &[&str] = &[
    "can't cope",
    "cant cope",
    "falling apart",
    "hopeless",
    "give up",
    "giving up",
    "not safe",
    "unsafe",
    "getting worse",
];

/// Apply the contextual rule table to a routed decision
///
/// Returns the decision unchanged when no rule fires.
#[must_use]
pub fn apply(
    decision: RoutingDecision,
    text: &str,
    context: Option<&RoutingContext>,
    thresholds: &RoutingThresholds,
) -> RoutingDecision {
    let Some(session_type) = context.and_then(|c| c.session_type.as_deref()) else {
        return decision;
    };

    let lowered = text.to_lowercase();

    match session_type {
        STRESS_MANAGEMENT_SESSION => {
            // Never downgrade a critical decision to stress
            if decision.is_critical || decision.target == AnalyzerTarget::Stress {
                return decision;
            }
            if contains_any(&lowered, STRESS_TERMS) {
                debug!(session_type, "contextual rule biased routing to stress");
                return replace(
                    decision,
                    AnalyzerTarget::Stress,
                    thresholds.contextual_rule_confidence,
                    session_type,
                );
            }
            decision
        }
        CRISIS_FOLLOW_UP_SESSION => {
            if decision.is_critical {
                return decision;
            }
            if contains_any(&lowered, DISTRESS_TERMS) {
                debug!(session_type, "contextual rule elevated routing to crisis");
                let confidence = decision
                    .confidence
                    .max(thresholds.contextual_rule_confidence);
                return replace(decision, AnalyzerTarget::Crisis, confidence, session_type);
            }
            decision
        }
        _ => decision,
    }
}

fn contains_any(lowered: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| lowered.contains(term))
}

fn replace(
    previous: RoutingDecision,
    target: AnalyzerTarget,
    confidence: f64,
    session_type: &str,
) -> RoutingDecision {
    let mut decision = RoutingDecision::new(target, confidence, RoutingMethod::ContextualRule);
    // Carry forward the audit trail from the replaced decision
    decision.insights = previous.insights;
    decision
        .with_insight("contextual_rule", session_type.to_owned())
        .with_insight("replaced_target", previous.target.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriageConfig;
    use crate::models::RoutingMethod;

    fn thresholds() -> crate::config::RoutingThresholds {
        TriageConfig::default().routing
    }

    #[test]
    fn no_context_returns_decision_unchanged() {
        let decision =
            RoutingDecision::new(AnalyzerTarget::Anxiety, 0.7, RoutingMethod::Keyword);
        let out = apply(decision, "so much pressure", None, &thresholds());
        assert_eq!(out.target, AnalyzerTarget::Anxiety);
    }

    #[test]
    fn stress_session_biases_toward_stress() {
        let context = RoutingContext::new().with_session_type(STRESS_MANAGEMENT_SESSION);
        let decision = RoutingDecision::new(
            AnalyzerTarget::GeneralMentalHealth,
            0.6,
            RoutingMethod::LlmClassification,
        );
        let out = apply(
            decision,
            "The workload is crushing me",
            Some(&context),
            &thresholds(),
        );
        assert_eq!(out.target, AnalyzerTarget::Stress);
        assert_eq!(out.method, RoutingMethod::ContextualRule);
    }

    #[test]
    fn crisis_follow_up_elevates_distress() {
        let context = RoutingContext::new().with_session_type(CRISIS_FOLLOW_UP_SESSION);
        let decision = RoutingDecision::new(
            AnalyzerTarget::GeneralMentalHealth,
            0.5,
            RoutingMethod::LlmClassification,
        );
        let out = apply(
            decision,
            "Honestly I feel like giving up",
            Some(&context),
            &thresholds(),
        );
        assert_eq!(out.target, AnalyzerTarget::Crisis);
        assert!(out.is_critical);
        assert!(out.confidence >= 0.85);
    }

    #[test]
    fn stress_session_never_downgrades_critical_decision() {
        let context = RoutingContext::new().with_session_type(STRESS_MANAGEMENT_SESSION);
        let decision = RoutingDecision::new(AnalyzerTarget::Crisis, 0.9, RoutingMethod::Keyword);
        let out = apply(
            decision,
            "so stressed I want to end it all",
            Some(&context),
            &thresholds(),
        );
        assert_eq!(out.target, AnalyzerTarget::Crisis);
        assert!(out.is_critical);
    }
}
