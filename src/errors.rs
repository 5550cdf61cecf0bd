// ABOUTME: Unified error types for collaborator boundaries and configuration
// ABOUTME: Collaborator failures are recovered into AnalysisFailure records, never propagated
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # Engine Error Handling
//!
//! [`EngineError`] is the error type crossing collaborator boundaries: the
//! model invoker, the crisis notifier, the session flagger, and the evidence
//! extractor all return it. The orchestration layer recovers every variant
//! into an [`crate::models::AnalysisFailure`] record; callers of the public
//! entry point never see an `Err`.

use thiserror::Error;

/// Error type for collaborator and configuration failures
#[derive(Debug, Error)]
pub enum EngineError {
    /// The language-model backend failed to produce a response
    #[error("model invocation failed: {0}")]
    ModelInvocation(String),

    /// The model responded but the content could not be interpreted
    #[error("model response parsing failed: {0}")]
    ResponseParsing(String),

    /// Crisis alert dispatch failed
    #[error("crisis notification failed: {0}")]
    Notification(String),

    /// Session flagging for human review failed
    #[error("session flagging failed: {0}")]
    SessionFlagging(String),

    /// Evidence extraction collaborator failed
    #[error("evidence extraction failed: {0}")]
    EvidenceExtraction(String),

    /// Required configuration is missing or invalid
    #[error("configuration error: {0}")]
    Configuration(String),

    /// JSON serialization failure
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Model invocation failure with a message
    pub fn model_invocation(message: impl Into<String>) -> Self {
        Self::ModelInvocation(message.into())
    }

    /// Configuration failure with a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
