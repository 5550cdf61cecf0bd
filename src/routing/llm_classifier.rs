// ABOUTME: Model-backed routing classifier producing a category verdict from text
// ABOUTME: Degrades to an unknown decision with audit markers instead of failing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # LLM Classifier
//!
//! Builds a short classification prompt, invokes the model backend, and
//! parses the `{category, confidence}` verdict. Raw model categories map
//! through an immutable lookup table
//! ([`AnalyzerTarget::from_model_label`]); malformed or missing responses
//! degrade to an `unknown` decision with a bounded confidence and an insight
//! marker, never an error.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::TriageConfig;
use crate::llm::{parser, prompts, ChatRequest, ModelInvoker};
use crate::models::{AnalyzerTarget, RoutingDecision, RoutingMethod};

/// Model-backed routing classifier
pub struct LlmClassifier {
    invoker: Arc<dyn ModelInvoker>,
    config: Arc<TriageConfig>,
}

impl LlmClassifier {
    /// Create a classifier over the given model backend
    #[must_use]
    pub fn new(invoker: Arc<dyn ModelInvoker>, config: Arc<TriageConfig>) -> Self {
        Self { invoker, config }
    }

    /// Classify text into a routing decision; infallible by contract
    ///
    /// Invocation and parse failures degrade the decision rather than
    /// propagating: the result is `unknown` with confidence at or below the
    /// configured degraded ceiling, plus an `invocation_error` or
    /// `parse_error` insight for audit.
    pub async fn classify(&self, text: &str) -> RoutingDecision {
        let request = ChatRequest::new(prompts::classification_messages(text))
            .with_model(self.invoker.default_model().to_owned())
            .with_temperature(self.config.model.classification_temperature)
            .with_max_tokens(self.config.model.classification_max_tokens);

        // Deadline elapsing is an ordinary degraded outcome, not a crash
        let invocation =
            tokio::time::timeout(self.config.timeouts.model_call(), self.invoker.invoke(&request))
                .await
                .unwrap_or_else(|_| {
                    Err(crate::errors::EngineError::model_invocation(
                        "classification call timed out",
                    ))
                });

        let response = match invocation {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "routing classification invocation failed");
                return self
                    .degraded(0.1)
                    .with_insight("invocation_error", error.to_string());
            }
        };

        match parser::parse_classification(&response.content) {
            Ok(verdict) => {
                let target = AnalyzerTarget::from_model_label(&verdict.category);
                debug!(
                    raw_category = %verdict.category,
                    target_analyzer = %target,
                    confidence = verdict.confidence,
                    "routing classification verdict"
                );
                let mut decision = RoutingDecision::new(
                    target,
                    verdict.confidence,
                    RoutingMethod::LlmClassification,
                )
                .with_insight("raw_category", verdict.category);
                if let Some(reasoning) = verdict.reasoning {
                    decision = decision.with_insight("reasoning", reasoning);
                }
                decision
            }
            Err(failure) => {
                warn!(%failure, "routing classification response unusable");
                self.degraded(self.config.routing.degraded_confidence_ceiling)
                    .with_insight("parse_error", failure.to_string())
            }
        }
    }

    fn degraded(&self, confidence: f64) -> RoutingDecision {
        let ceiling = self.config.routing.degraded_confidence_ceiling;
        RoutingDecision::new(
            AnalyzerTarget::Unknown,
            confidence.min(ceiling),
            RoutingMethod::LlmClassification,
        )
    }
}
