// ABOUTME: Model invoker abstraction for pluggable language-model backends
// ABOUTME: Defines the chat message contract consumed by routing and analysis
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # Model Invoker Service Provider Interface
//!
//! This module defines the contract a language-model backend must implement
//! to serve the triage engine. The engine only depends on the shape
//! "structured chat messages in, raw text out"; the concrete provider,
//! transport, and prompt-to-wire mapping belong to the embedding service.
//!
//! ## Example: Using an Invoker
//!
//! ```rust,no_run
//! use solace_triage::llm::{ModelInvoker, ChatMessage, ChatRequest};
//!
//! async fn example(invoker: &dyn ModelInvoker) {
//!     let messages = vec![
//!         ChatMessage::system("You are a mental-health triage classifier."),
//!         ChatMessage::user("I haven't slept properly in weeks."),
//!     ];
//!     let request = ChatRequest::new(messages).with_temperature(0.0);
//!     let response = invoker.invoke(&request).await;
//! }
//! ```

pub mod parser;
pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::EngineResult;

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// Convert to string representation for API calls
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Configuration for a chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Model identifier (provider-specific)
    pub model: Option<String>,
    /// Temperature for response randomness
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Opaque provider-specific parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_params: Option<serde_json::Value>,
}

impl ChatRequest {
    /// Create a new chat request with messages
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
            provider_params: None,
        }
    }

    /// Set the model to use
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Forward opaque provider-specific parameters
    #[must_use]
    pub fn with_provider_params(mut self, params: serde_json::Value) -> Self {
        self.provider_params = Some(params);
        self
    }
}

/// Response from a chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated message content
    pub content: String,
    /// Model used for generation
    pub model: String,
    /// Token usage statistics
    pub usage: Option<TokenUsage>,
    /// Finish reason (stop, length, etc.)
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// Response carrying only content, for backends without usage accounting
    #[must_use]
    pub fn from_content(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: None,
            finish_reason: None,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,
    /// Number of tokens in the completion
    pub completion_tokens: u32,
    /// Total tokens used
    pub total_tokens: u32,
}

// ============================================================================
// Invoker Trait
// ============================================================================

/// Language-model backend trait
///
/// Implement this trait to plug a model provider into the triage engine.
/// The engine holds the invoker behind `Arc<dyn ModelInvoker>` and calls it
/// from the routing classifier and the detailed-analysis step; both call
/// sites recover invocation errors locally.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Unique provider identifier (e.g. "gemini", "ollama")
    fn name(&self) -> &'static str;

    /// Default model to use if not specified in the request
    fn default_model(&self) -> &str;

    /// Perform a chat completion
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot produce a response.
    async fn invoke(&self, request: &ChatRequest) -> EngineResult<ChatResponse>;
}
