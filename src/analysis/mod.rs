// ABOUTME: Analysis orchestrator reconciling routing, model analysis, evidence, and escalation
// ABOUTME: Never fails outward; degraded steps accumulate as failure records on the result
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # Analysis Orchestration
//!
//! [`AnalysisOrchestrator`] is the public entry point of the engine. It
//! consumes a routing decision (or caller-asserted categories), optionally
//! performs a deeper model-backed analysis, reconciles the two signals,
//! merges supporting evidence, and triggers crisis escalation.
//!
//! Ordering guarantee: the crisis fast path is evaluated before any deeper
//! analysis is attempted. Unambiguous crisis language escalates immediately
//! without waiting on a second, slower model call.

pub mod evidence;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::config::TriageConfig;
use crate::errors::EngineError;
use crate::escalation::{
    CrisisEscalationHandler, CrisisNotificationHandler, SessionFlaggingService,
};
use crate::llm::{parser, prompts, ChatRequest, ModelInvoker};
use crate::models::{
    clamp_confidence, AnalysisFailure, AnalysisOptions, AnalysisRequest, AnalysisResult,
    AnalyzerTarget, CategorySelection, FailureKind, ModelTier, RoutingContext, RoutingDecision,
    RoutingMethod,
};
use crate::routing::TaskRouter;

pub use evidence::{merge_evidence, EvidenceBundle, EvidenceService};

/// Orchestrates the full analysis pipeline for one request
pub struct AnalysisOrchestrator {
    router: Option<Arc<TaskRouter>>,
    invoker: Arc<dyn ModelInvoker>,
    evidence: Option<Arc<dyn EvidenceService>>,
    escalation: Arc<CrisisEscalationHandler>,
    config: Arc<TriageConfig>,
}

/// Builder for [`AnalysisOrchestrator`]
pub struct OrchestratorBuilder {
    invoker: Arc<dyn ModelInvoker>,
    config: Option<Arc<TriageConfig>>,
    evidence: Option<Arc<dyn EvidenceService>>,
    notifier: Option<Arc<dyn CrisisNotificationHandler>>,
    flagger: Option<Arc<dyn SessionFlaggingService>>,
    router: Option<Arc<TaskRouter>>,
}

impl OrchestratorBuilder {
    /// Use a custom configuration instead of the defaults
    #[must_use]
    pub fn config(mut self, config: TriageConfig) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    /// Attach the evidence extraction collaborator
    #[must_use]
    pub fn evidence_service(mut self, evidence: Arc<dyn EvidenceService>) -> Self {
        self.evidence = Some(evidence);
        self
    }

    /// Attach the crisis notification collaborator
    #[must_use]
    pub fn notification_handler(mut self, notifier: Arc<dyn CrisisNotificationHandler>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Attach the session-flagging collaborator
    #[must_use]
    pub fn session_flagging(mut self, flagger: Arc<dyn SessionFlaggingService>) -> Self {
        self.flagger = Some(flagger);
        self
    }

    /// Supply a pre-built router (shares the invoker by default)
    #[must_use]
    pub fn router(mut self, router: Arc<TaskRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Build the orchestrator
    #[must_use]
    pub fn build(self) -> AnalysisOrchestrator {
        debug!(provider = self.invoker.name(), "building analysis orchestrator");
        let config = self.config.unwrap_or_else(|| Arc::new(TriageConfig::default()));
        let router = self.router.or_else(|| {
            Some(Arc::new(TaskRouter::new(
                Arc::clone(&self.invoker),
                Arc::clone(&config),
            )))
        });
        AnalysisOrchestrator {
            router,
            invoker: self.invoker,
            evidence: self.evidence,
            escalation: Arc::new(
                CrisisEscalationHandler::new(self.notifier, self.flagger)
                    .with_side_effect_timeout(config.timeouts.side_effect()),
            ),
            config,
        }
    }

    /// Build without a task router; auto-routed requests will degrade with a
    /// configuration failure
    #[must_use]
    pub fn build_without_router(self) -> AnalysisOrchestrator {
        debug!(provider = self.invoker.name(), "building analysis orchestrator");
        let config = self.config.unwrap_or_else(|| Arc::new(TriageConfig::default()));
        AnalysisOrchestrator {
            router: None,
            invoker: self.invoker,
            evidence: self.evidence,
            escalation: Arc::new(
                CrisisEscalationHandler::new(self.notifier, self.flagger)
                    .with_side_effect_timeout(config.timeouts.side_effect()),
            ),
            config,
        }
    }
}

impl AnalysisOrchestrator {
    /// Start building an orchestrator over the given model backend
    #[must_use]
    pub fn builder(invoker: Arc<dyn ModelInvoker>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            invoker,
            config: None,
            evidence: None,
            notifier: None,
            flagger: None,
            router: None,
        }
    }

    /// Analyze text for mental-health signals
    ///
    /// Never fails: every degraded step is recorded in the result's
    /// `failures` list and reduces confidence instead of aborting.
    #[instrument(skip_all, fields(text_len = request.text.len()))]
    pub async fn analyze_mental_health(&self, request: AnalysisRequest) -> AnalysisResult {
        let tier = request
            .options
            .model_tier
            .unwrap_or(self.config.default_model_tier);
        let mut failures: Vec<AnalysisFailure> = Vec::new();

        // Resolve routing (or caller-asserted categories)
        let (decision, analysis_target) = match &request.categories {
            CategorySelection::AutoRoute => {
                let Some(router) = &self.router else {
                    return Self::unrouted_result(tier);
                };
                let decision = router
                    .determine_route(
                        &request.text,
                        request.routing_context.as_ref(),
                        None,
                    )
                    .await;

                // Crisis fast path: unambiguous crisis language escalates
                // without waiting on a second, slower model call.
                if decision.is_critical
                    && decision.confidence > self.config.orchestrator.crisis_fast_path_confidence
                {
                    return self.fast_path_result(tier, &request, decision).await;
                }

                let target = if !decision.is_critical
                    && decision.confidence < self.config.orchestrator.low_confidence_floor
                {
                    // Low routing confidence: widen instead of over-committing
                    // to a narrow category.
                    debug!(
                        routed = %decision.target,
                        confidence = decision.confidence,
                        "widening low-confidence routing to general analysis"
                    );
                    AnalyzerTarget::GeneralMentalHealth
                } else {
                    decision.target
                };
                (decision, target)
            }
            CategorySelection::Explicit(labels) => {
                let (decision, failure) = self.explicit_decision(labels);
                if let Some(failure) = failure {
                    failures.push(failure);
                }
                let target = decision.target;
                (decision, target)
            }
        };

        // Detailed model-backed analysis with defensive verdict handling
        let outcome = self
            .detailed_analysis(
                &request.text,
                analysis_target,
                &decision,
                &request.options,
                &mut failures,
            )
            .await;

        let mut result = AnalysisResult {
            has_mental_health_issue: outcome.has_issue,
            category: outcome.category,
            confidence: clamp_confidence(outcome.confidence),
            explanation: outcome.explanation,
            supporting_evidence: outcome.evidence,
            timestamp: Utc::now(),
            model_tier: tier,
            is_crisis: false,
            routing_decision: Some(decision),
            failures: Vec::new(),
        };

        self.attach_evidence(
            &request.text,
            request.routing_context.as_ref(),
            &mut result,
            &mut failures,
        )
        .await;

        // Escalate when routing was critical or the final verdict is a
        // confident crisis; the fast path already returned above, so this
        // runs at most once per request.
        let routing_critical = result
            .routing_decision
            .as_ref()
            .is_some_and(|d| d.is_critical);
        result.is_crisis = routing_critical
            || (result.category == AnalyzerTarget::Crisis
                && result.confidence > self.config.orchestrator.crisis_result_confidence);

        if result.is_crisis {
            if let Some(decision) = &result.routing_decision {
                let escalation_failures = self
                    .escalation
                    .handle_crisis(
                        &request.text,
                        decision,
                        result.confidence,
                        request.routing_context.as_ref(),
                    )
                    .await;
                failures.extend(escalation_failures);
            }
        }

        result.failures = failures;
        result
    }

    /// Build the immediate result for the crisis fast path
    async fn fast_path_result(
        &self,
        tier: ModelTier,
        request: &AnalysisRequest,
        decision: RoutingDecision,
    ) -> AnalysisResult {
        info!(
            confidence = decision.confidence,
            "crisis fast path: skipping detailed analysis"
        );

        let failures = self
            .escalation
            .handle_crisis(
                &request.text,
                &decision,
                decision.confidence,
                request.routing_context.as_ref(),
            )
            .await;

        AnalysisResult {
            has_mental_health_issue: true,
            category: AnalyzerTarget::Crisis,
            confidence: decision.confidence,
            explanation: "High-confidence crisis indicators detected during routing; \
                          escalation was triggered immediately and detailed analysis skipped."
                .to_owned(),
            supporting_evidence: decision
                .matched_term()
                .map(|t| vec![t.to_owned()])
                .unwrap_or_default(),
            timestamp: Utc::now(),
            model_tier: tier,
            is_crisis: true,
            routing_decision: Some(decision),
            failures,
        }
    }

    /// Maximally degraded result when no router is configured
    fn unrouted_result(tier: ModelTier) -> AnalysisResult {
        warn!("auto-route requested but no task router is configured");
        AnalysisResult {
            has_mental_health_issue: false,
            category: AnalyzerTarget::Unknown,
            confidence: 0.0,
            explanation: "Analysis could not run: no task router is configured.".to_owned(),
            supporting_evidence: Vec::new(),
            timestamp: Utc::now(),
            model_tier: tier,
            is_crisis: false,
            routing_decision: None,
            failures: vec![AnalysisFailure::new(
                FailureKind::Configuration,
                "auto_route requested but no task router configured",
            )],
        }
    }

    /// Decision for caller-asserted category labels (routing skipped)
    fn explicit_decision(
        &self,
        labels: &[String],
    ) -> (RoutingDecision, Option<AnalysisFailure>) {
        let confidence = self.config.orchestrator.explicit_category_confidence;
        let recognized = labels.iter().find_map(|l| AnalyzerTarget::from_label(l));

        match recognized {
            Some(target) => (
                RoutingDecision::new(target, confidence, RoutingMethod::ExplicitHint)
                    .with_insight("explicit_categories", labels.join(",")),
                None,
            ),
            None => (
                RoutingDecision::new(
                    AnalyzerTarget::GeneralMentalHealth,
                    confidence,
                    RoutingMethod::ExplicitHint,
                )
                .with_insight("explicit_categories", labels.join(",")),
                Some(AnalysisFailure::new(
                    FailureKind::Orchestration,
                    "no recognizable category in explicit list; using general_mental_health",
                )),
            ),
        }
    }

    /// Run the detailed model analysis and reconcile it with routing
    async fn detailed_analysis(
        &self,
        text: &str,
        target: AnalyzerTarget,
        decision: &RoutingDecision,
        options: &AnalysisOptions,
        failures: &mut Vec<AnalysisFailure>,
    ) -> DetailedOutcome {
        let mut request = ChatRequest::new(prompts::analysis_messages(text, target))
            .with_model(self.invoker.default_model().to_owned())
            .with_temperature(self.config.model.analysis_temperature)
            .with_max_tokens(self.config.model.analysis_max_tokens);
        if let Some(params) = &options.provider_params {
            request = request.with_provider_params(params.clone());
        }

        let mut outcome = DetailedOutcome::routed(decision, target);

        let invocation =
            tokio::time::timeout(self.config.timeouts.model_call(), self.invoker.invoke(&request))
                .await
                .unwrap_or_else(|_| {
                    Err(EngineError::model_invocation("detailed analysis call timed out"))
                });

        let response = match invocation {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "detailed analysis invocation failed");
                failures.push(
                    AnalysisFailure::new(
                        FailureKind::LlmInvocation,
                        "detailed analysis invocation failed",
                    )
                    .with_error(&error)
                    .with_context(target.as_str()),
                );
                outcome.confidence *= self.config.orchestrator.invocation_failure_penalty;
                outcome.explanation =
                    "Routing-only verdict: the detailed model analysis could not be invoked."
                        .to_owned();
                return outcome;
            }
        };

        if response.content.trim().is_empty() {
            failures.push(
                AnalysisFailure::new(
                    FailureKind::LlmResponseEmpty,
                    "detailed analysis returned empty content",
                )
                .with_context(target.as_str()),
            );
            outcome.explanation =
                "Routing-only verdict: the model returned no analysis content.".to_owned();
            return outcome;
        }

        match parser::parse_analysis(&response.content) {
            Ok(verdict) => {
                // Reconcile: adopt the model's category only when it is more
                // confident than routing; confidence is the max of both
                // signals, never averaged down.
                let model_confidence = verdict.confidence.unwrap_or(0.0);
                let model_category = verdict
                    .category
                    .as_deref()
                    .map(AnalyzerTarget::from_model_label);

                if let Some(category) = model_category {
                    if category != outcome.category && model_confidence > decision.confidence {
                        debug!(
                            routed = %outcome.category,
                            proposed = %category,
                            "adopting model category over routing"
                        );
                        outcome.category = category;
                    }
                }
                outcome.confidence = decision.confidence.max(model_confidence);

                if let Some(has_issue) = verdict.has_mental_health_issue {
                    outcome.has_issue = has_issue;
                }
                if let Some(explanation) = verdict.explanation {
                    if !explanation.trim().is_empty() {
                        outcome.explanation = explanation;
                    }
                }
                if let Some(snippets) = verdict.supporting_evidence {
                    outcome.evidence = snippets;
                }
            }
            Err(failure) => {
                warn!(%failure, "detailed analysis response unusable");
                failures.push(
                    AnalysisFailure::new(
                        FailureKind::LlmResponseParsing,
                        "detailed analysis response could not be parsed",
                    )
                    .with_error(&failure)
                    .with_context(target.as_str()),
                );
                outcome.confidence *= self.config.orchestrator.parse_failure_penalty;
                outcome.explanation =
                    "Routing-only verdict: the model analysis response could not be parsed."
                        .to_owned();
            }
        }

        outcome
    }

    /// Call the evidence collaborator and merge its items into the result
    async fn attach_evidence(
        &self,
        text: &str,
        context: Option<&RoutingContext>,
        result: &mut AnalysisResult,
        failures: &mut Vec<AnalysisFailure>,
    ) {
        let cap = self.config.orchestrator.max_evidence_items;

        let extracted = match &self.evidence {
            Some(service) => {
                let extraction = tokio::time::timeout(
                    self.config.timeouts.side_effect(),
                    service.extract_supporting_evidence(
                        text,
                        result.category,
                        Some(&result.explanation),
                        context,
                    ),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(EngineError::EvidenceExtraction(
                        "evidence extraction timed out".to_owned(),
                    ))
                });
                match extraction {
                    Ok(bundle) => bundle.evidence_items,
                    Err(error) => {
                        warn!(%error, "evidence extraction failed");
                        failures.push(
                            AnalysisFailure::new(
                                FailureKind::EvidenceExtraction,
                                "evidence extraction failed",
                            )
                            .with_error(&error)
                            .with_context(result.category.as_str()),
                        );
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        };

        result.supporting_evidence =
            merge_evidence(std::mem::take(&mut result.supporting_evidence), extracted, cap);
    }
}

/// Working state of the detailed-analysis step
struct DetailedOutcome {
    has_issue: bool,
    category: AnalyzerTarget,
    confidence: f64,
    explanation: String,
    evidence: Vec<String>,
}

impl DetailedOutcome {
    fn routed(decision: &RoutingDecision, target: AnalyzerTarget) -> Self {
        Self {
            has_issue: !matches!(
                target,
                AnalyzerTarget::Wellness | AnalyzerTarget::Unknown
            ),
            category: target,
            confidence: decision.confidence,
            explanation: format!("Routed to {target} analysis."),
            evidence: Vec::new(),
        }
    }
}
