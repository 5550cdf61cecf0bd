// ABOUTME: Main library entry point for the Solace mental-health triage engine
// ABOUTME: Routes free-form text to analysis paths and escalates crisis signals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

#![deny(unsafe_code)]

//! # Solace Triage Engine
//!
//! A library-level engine that takes free-form user text, decides which
//! specialized mental-health analysis path applies, invokes a language-model
//! classifier, fuses multiple signals into one confidence-scored verdict, and
//! triggers a safety-critical escalation workflow when risk indicators exceed
//! a threshold.
//!
//! ## Architecture
//!
//! - **Routing**: [`routing::TaskRouter`] fuses a deterministic keyword
//!   classifier with a model-backed classifier and contextual rules into a
//!   single [`models::RoutingDecision`].
//! - **Analysis**: [`analysis::AnalysisOrchestrator`] consumes the routing
//!   decision, optionally performs a deeper model-backed analysis, merges
//!   supporting evidence, and produces a [`models::AnalysisResult`].
//! - **Escalation**: [`escalation::CrisisEscalationHandler`] dispatches
//!   alerts and flags sessions for human review, best-effort and concurrent.
//! - **Collaborators**: the model backend ([`llm::ModelInvoker`]), the
//!   notifier, the session flagger, and the evidence extractor are abstract
//!   traits supplied by the embedding service.
//!
//! No failure is ever allowed to propagate as an error from the public entry
//! point: a crashed analysis must not silently drop a crisis signal, so every
//! degraded step is recorded in [`models::AnalysisResult::failures`] and the
//! request still resolves to a result.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use solace_triage::analysis::AnalysisOrchestrator;
//! use solace_triage::models::AnalysisRequest;
//! # use solace_triage::llm::{ModelInvoker, ChatRequest, ChatResponse};
//! # use solace_triage::errors::EngineResult;
//! # struct Backend;
//! # #[async_trait::async_trait]
//! # impl ModelInvoker for Backend {
//! #     fn name(&self) -> &'static str { "backend" }
//! #     fn default_model(&self) -> &str { "model" }
//! #     async fn invoke(&self, _r: &ChatRequest) -> EngineResult<ChatResponse> { unimplemented!() }
//! # }
//!
//! #[tokio::main]
//! async fn main() {
//!     let invoker: Arc<dyn solace_triage::llm::ModelInvoker> = Arc::new(Backend);
//!     let orchestrator = AnalysisOrchestrator::builder(invoker).build();
//!     let result = orchestrator
//!         .analyze_mental_health(AnalysisRequest::new("I feel overwhelmed lately"))
//!         .await;
//!     println!("{} ({:.2})", result.category, result.confidence);
//! }
//! ```

/// Analysis orchestration and evidence merging
pub mod analysis;

/// Injected configuration with environment overrides and validation
pub mod config;

/// Engine error types for collaborator boundaries
pub mod errors;

/// Crisis escalation workflow: alert dispatch and session flagging
pub mod escalation;

/// Model invoker abstraction, verdict parsing, and prompt construction
pub mod llm;

/// Production logging and structured output
pub mod logging;

/// Shared data model for routing decisions, results, and failures
pub mod models;

/// Text routing: keyword rules, model classification, and signal fusion
pub mod routing;
