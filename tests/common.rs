// ABOUTME: Shared test utilities and mock collaborators for integration tests
// ABOUTME: Provides a scripted model invoker plus recording notifier, flagger, and evidence mocks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions
)]
//! Shared test utilities for `solace_triage`

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once};

use async_trait::async_trait;

use solace_triage::analysis::{EvidenceBundle, EvidenceService};
use solace_triage::errors::{EngineError, EngineResult};
use solace_triage::escalation::{CrisisNotificationHandler, SessionFlaggingService};
use solace_triage::llm::{ChatRequest, ChatResponse, ModelInvoker};
use solace_triage::models::{
    AnalyzerTarget, CrisisAlertContext, RoutingContext, SessionFlagParams,
};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Scripted model invoker: responses are consumed in order and every
/// request is recorded for prompt assertions
pub struct MockInvoker {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
    fail_all: AtomicBool,
}

impl MockInvoker {
    pub fn new() -> Self {
        init_test_logging();
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fail_all: AtomicBool::new(false),
        }
    }

    /// Invoker whose every call fails
    pub fn failing() -> Self {
        let invoker = Self::new();
        invoker.fail_all.store(true, Ordering::SeqCst);
        invoker
    }

    /// Queue a successful response
    pub fn push_ok(&self, content: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(content.to_owned()));
    }

    /// Queue a failed invocation
    pub fn push_err(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_owned()));
    }

    /// Number of invocations performed
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Clone of the n-th recorded request
    pub fn request(&self, index: usize) -> ChatRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

impl Default for MockInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelInvoker for MockInvoker {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn invoke(&self, request: &ChatRequest) -> EngineResult<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if self.fail_all.load(Ordering::SeqCst) {
            return Err(EngineError::model_invocation("mock backend unavailable"));
        }

        let scripted = self.responses.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(content)) => Ok(ChatResponse::from_content(content, "mock-model")),
            Some(Err(message)) => Err(EngineError::model_invocation(message)),
            // Benign default: an empty JSON object
            None => Ok(ChatResponse::from_content("{}", "mock-model")),
        }
    }
}

/// Notifier that records every alert and can be told to fail
pub struct RecordingNotifier {
    pub alerts: Mutex<Vec<CrisisAlertContext>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let notifier = Self::new();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CrisisNotificationHandler for RecordingNotifier {
    async fn send_crisis_alert(&self, alert: &CrisisAlertContext) -> EngineResult<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::Notification("alert channel down".into()));
        }
        Ok(())
    }
}

/// Flagging service that records every flag and can be told to fail
pub struct RecordingFlagger {
    pub flags: Mutex<Vec<SessionFlagParams>>,
    fail: AtomicBool,
}

impl RecordingFlagger {
    pub fn new() -> Self {
        Self {
            flags: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let flagger = Self::new();
        flagger.fail.store(true, Ordering::SeqCst);
        flagger
    }

    pub fn flag_count(&self) -> usize {
        self.flags.lock().unwrap().len()
    }
}

impl Default for RecordingFlagger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionFlaggingService for RecordingFlagger {
    async fn flag_session_for_review(&self, params: &SessionFlagParams) -> EngineResult<()> {
        self.flags.lock().unwrap().push(params.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::SessionFlagging("review store down".into()));
        }
        Ok(())
    }
}

/// Evidence service returning a fixed item list, or failing on demand
pub struct StaticEvidence {
    items: Vec<String>,
    fail: bool,
    /// User id seen on each extraction call, for context-forwarding asserts
    pub seen_user_ids: Mutex<Vec<Option<String>>>,
}

impl StaticEvidence {
    pub fn new(items: &[&str]) -> Self {
        Self {
            items: items.iter().map(|i| (*i).to_owned()).collect(),
            fail: false,
            seen_user_ids: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            items: Vec::new(),
            fail: true,
            seen_user_ids: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EvidenceService for StaticEvidence {
    async fn extract_supporting_evidence(
        &self,
        _text: &str,
        _category: AnalyzerTarget,
        _base_explanation: Option<&str>,
        context: Option<&RoutingContext>,
    ) -> EngineResult<EvidenceBundle> {
        self.seen_user_ids
            .lock()
            .unwrap()
            .push(context.and_then(|c| c.user_id.clone()));
        if self.fail {
            return Err(EngineError::EvidenceExtraction("extractor offline".into()));
        }
        Ok(EvidenceBundle {
            evidence_items: self.items.clone(),
            processing_metadata: serde_json::json!({"source": "static"}),
        })
    }
}
