// ABOUTME: Task router fusing keyword and model classification signals into one decision
// ABOUTME: Explicit hints short-circuit; keyword and model paths fan out concurrently
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # Task Routing
//!
//! [`TaskRouter`] decides which analysis path applies to a piece of text:
//!
//! 1. **Explicit hint**: a caller-supplied hint wins outright.
//! 2. **Keyword + model classification**: the deterministic keyword matcher
//!    and the model-backed classifier have no data dependency and run
//!    concurrently, joined before fusion.
//! 3. **Fusion**: tie-break rules combine the two signals — critical
//!    decisions always win, agreement earns a corroboration boost,
//!    disagreement resolves to the higher confidence.
//! 4. **Contextual rules**: a session-type keyed pass may replace the fused
//!    decision.
//!
//! `determine_route` is infallible: every path resolves to a decision.

pub mod context_rules;
pub mod keywords;
pub mod llm_classifier;

use std::sync::Arc;

use tracing::debug;

use crate::config::TriageConfig;
use crate::llm::ModelInvoker;
use crate::models::{
    clamp_confidence, AnalyzerTarget, RoutingContext, RoutingDecision, RoutingMethod,
};

pub use keywords::KeywordClassifier;
pub use llm_classifier::LlmClassifier;

/// Routes text to the analysis path that applies
pub struct TaskRouter {
    keywords: KeywordClassifier,
    classifier: LlmClassifier,
    config: Arc<TriageConfig>,
}

impl TaskRouter {
    /// Create a router over the given model backend
    #[must_use]
    pub fn new(invoker: Arc<dyn ModelInvoker>, config: Arc<TriageConfig>) -> Self {
        Self {
            keywords: KeywordClassifier::new(&config.routing),
            classifier: LlmClassifier::new(invoker, Arc::clone(&config)),
            config,
        }
    }

    /// Determine the routing decision for a piece of text
    ///
    /// Never fails: degraded classification collapses to an `unknown`
    /// decision with audit insights rather than an error.
    pub async fn determine_route(
        &self,
        text: &str,
        context: Option<&RoutingContext>,
        explicit_hint: Option<&str>,
    ) -> RoutingDecision {
        let hint = explicit_hint.or_else(|| {
            context.and_then(|c| c.explicit_task_hint.as_deref())
        });

        if let Some(hint) = hint {
            let decision = self.explicit_hint_decision(hint);
            return context_rules::apply(decision, text, context, &self.config.routing);
        }

        // Keyword and model classification have no data dependency; fan out
        // and join before fusion.
        let (keyword, llm) = tokio::join!(
            async { self.keywords.classify(text) },
            self.classifier.classify(text)
        );

        let fused = self.fuse(keyword, llm);
        debug!(
            target_analyzer = %fused.target,
            confidence = fused.confidence,
            method = ?fused.method,
            is_critical = fused.is_critical,
            "routing decision fused"
        );

        context_rules::apply(fused, text, context, &self.config.routing)
    }

    fn explicit_hint_decision(&self, hint: &str) -> RoutingDecision {
        let target =
            AnalyzerTarget::from_label(hint).unwrap_or(AnalyzerTarget::GeneralMentalHealth);
        RoutingDecision::new(
            target,
            self.config.routing.explicit_hint_confidence,
            RoutingMethod::ExplicitHint,
        )
        .with_insight("explicit_hint", hint.to_owned())
    }

    /// Fuse the keyword and model signals with ordered tie-break rules
    ///
    /// A model decision that degraded to `unknown` counts as absent, but its
    /// audit insights are preserved on the surviving decision.
    fn fuse(
        &self,
        keyword: Option<RoutingDecision>,
        llm: RoutingDecision,
    ) -> RoutingDecision {
        // A classifier decision degraded to unknown carries no signal, but
        // its audit insights (parse_error, invocation_error) must survive.
        let (llm, degraded) = if llm.target == AnalyzerTarget::Unknown {
            (None, Some(llm))
        } else {
            (Some(llm), None)
        };

        match (keyword, llm) {
            // Critical signals always win; two critical signals take the max
            (Some(k), Some(l)) if k.is_critical && l.is_critical => {
                let confidence = k.confidence.max(l.confidence);
                let mut fused =
                    RoutingDecision::new(k.target, confidence, RoutingMethod::Combined);
                fused.insights = merged_insights(k, l);
                fused
            }
            (Some(k), Some(l)) if k.is_critical => carry_insights(k, &l),
            (Some(k), Some(l)) if l.is_critical => carry_insights(l, &k),

            // Agreement earns a small corroboration boost
            (Some(k), Some(l)) if k.target == l.target => {
                let confidence = clamp_confidence(
                    k.confidence.max(l.confidence) + self.config.routing.agreement_boost,
                );
                let mut fused =
                    RoutingDecision::new(k.target, confidence, RoutingMethod::Combined);
                fused.insights = merged_insights(k, l);
                fused
            }

            // Disagreement, neither critical: higher confidence wins
            (Some(k), Some(l)) => {
                if k.confidence >= l.confidence {
                    carry_insights(k, &l)
                } else {
                    carry_insights(l, &k)
                }
            }

            (Some(only), None) => match degraded {
                Some(d) => carry_insights(only, &d),
                None => only,
            },
            (None, Some(only)) => only,

            (None, None) => {
                let fallback =
                    RoutingDecision::fallback(self.config.routing.no_signal_confidence)
                        .with_insight("no_signal", true);
                match degraded {
                    // Preserve the degraded classifier's confidence and markers
                    Some(d) => carry_insights(d, &fallback),
                    None => fallback,
                }
            }
        }
    }
}

fn merged_insights(
    a: RoutingDecision,
    b: RoutingDecision,
) -> serde_json::Map<String, serde_json::Value> {
    let mut insights = a.insights;
    for (key, value) in b.insights {
        insights.entry(key).or_insert(value);
    }
    insights
}

fn carry_insights(winner: RoutingDecision, loser: &RoutingDecision) -> RoutingDecision {
    let mut decision = winner;
    for (key, value) in &loser.insights {
        decision
            .insights
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    decision
}
