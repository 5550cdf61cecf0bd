// ABOUTME: Configuration-driven thresholds for routing, fusion, and orchestration
// ABOUTME: Replaces module-level constants with injected, environment-overridable values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # Triage Configuration
//!
//! Every threshold the routing and orchestration logic branches on lives
//! here so tests can exercise boundary behavior deterministically. Values
//! load from defaults, can be overridden per `TRIAGE_*` environment
//! variables, and are validated before use.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ModelTier;

/// Configuration errors
#[derive(Debug, Error)]
pub enum TriageConfigError {
    /// An environment override did not parse as the expected type
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    /// Values parsed but violate an internal consistency rule
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Confidence values assigned by the routing stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingThresholds {
    /// Confidence assigned to explicit caller hints
    pub explicit_hint_confidence: f64,

    /// Confidence assigned to crisis-tier keyword matches
    pub crisis_keyword_confidence: f64,

    /// Confidence assigned to standard keyword matches
    pub standard_keyword_confidence: f64,

    /// Ceiling for decisions degraded by classification parse failure
    pub degraded_confidence_ceiling: f64,

    /// Floor confidence when neither routing signal produced a decision
    pub no_signal_confidence: f64,

    /// Additive corroboration boost when keyword and model signals agree
    pub agreement_boost: f64,

    /// Confidence assigned by contextual session-type rules
    pub contextual_rule_confidence: f64,
}

/// Thresholds governing the analysis orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorThresholds {
    /// Critical routing decisions above this confidence short-circuit to the
    /// crisis fast path, skipping detailed analysis
    pub crisis_fast_path_confidence: f64,

    /// Non-critical routing below this confidence widens detailed analysis
    /// to `general_mental_health`
    pub low_confidence_floor: f64,

    /// Confidence assumed when the caller asserts explicit categories
    pub explicit_category_confidence: f64,

    /// Final-category crisis results above this confidence trigger escalation
    pub crisis_result_confidence: f64,

    /// Multiplier applied to confidence when the model response fails to parse
    pub parse_failure_penalty: f64,

    /// Multiplier applied to confidence when model invocation fails
    pub invocation_failure_penalty: f64,

    /// Cap on merged supporting-evidence items
    pub max_evidence_items: usize,
}

/// Bounded parameters for model calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Temperature for detailed analysis calls (bounded at 0.3)
    pub analysis_temperature: f32,

    /// Max tokens for detailed analysis calls (bounded at 500)
    pub analysis_max_tokens: u32,

    /// Temperature for the short routing-classification call
    pub classification_temperature: f32,

    /// Max tokens for the routing-classification call
    pub classification_max_tokens: u32,
}

/// Deadlines applied to external collaborator calls
///
/// Timeouts are recorded as ordinary failures, never propagated as errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSettings {
    /// Deadline for model backend calls, in seconds
    pub model_call_secs: u64,

    /// Deadline for notification, flagging, and evidence calls, in seconds
    pub side_effect_secs: u64,
}

impl TimeoutSettings {
    /// Deadline for model backend calls
    #[must_use]
    pub const fn model_call(&self) -> Duration {
        Duration::from_secs(self.model_call_secs)
    }

    /// Deadline for notification, flagging, and evidence calls
    #[must_use]
    pub const fn side_effect(&self) -> Duration {
        Duration::from_secs(self.side_effect_secs)
    }
}

/// Main triage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Routing-stage confidence assignments
    pub routing: RoutingThresholds,
    /// Orchestrator decision thresholds
    pub orchestrator: OrchestratorThresholds,
    /// Bounded model-call parameters
    pub model: ModelParameters,
    /// Deadlines for external collaborator calls
    pub timeouts: TimeoutSettings,
    /// Tier used when the request does not specify one
    pub default_model_tier: ModelTier,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            routing: RoutingThresholds {
                explicit_hint_confidence: 0.9,
                crisis_keyword_confidence: 0.92,
                standard_keyword_confidence: 0.75,
                degraded_confidence_ceiling: 0.3,
                no_signal_confidence: 0.2,
                agreement_boost: 0.05,
                contextual_rule_confidence: 0.85,
            },
            orchestrator: OrchestratorThresholds {
                crisis_fast_path_confidence: 0.8,
                low_confidence_floor: 0.5,
                explicit_category_confidence: 0.9,
                crisis_result_confidence: 0.7,
                parse_failure_penalty: 0.5,
                invocation_failure_penalty: 0.3,
                max_evidence_items: 8,
            },
            model: ModelParameters {
                analysis_temperature: 0.2,
                analysis_max_tokens: 500,
                classification_temperature: 0.0,
                classification_max_tokens: 150,
            },
            timeouts: TimeoutSettings {
                model_call_secs: 30,
                side_effect_secs: 10,
            },
            default_model_tier: ModelTier::Standard,
        }
    }
}

impl TriageConfig {
    /// Load configuration from environment variables with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable contains an invalid value
    /// or the resulting configuration fails validation.
    pub fn from_env() -> Result<Self, TriageConfigError> {
        let mut config = Self::default();

        override_f64(
            "TRIAGE_CRISIS_FAST_PATH_CONFIDENCE",
            &mut config.orchestrator.crisis_fast_path_confidence,
        )?;
        override_f64(
            "TRIAGE_LOW_CONFIDENCE_FLOOR",
            &mut config.orchestrator.low_confidence_floor,
        )?;
        override_f64(
            "TRIAGE_CRISIS_RESULT_CONFIDENCE",
            &mut config.orchestrator.crisis_result_confidence,
        )?;
        override_f64("TRIAGE_AGREEMENT_BOOST", &mut config.routing.agreement_boost)?;
        override_f64(
            "TRIAGE_CRISIS_KEYWORD_CONFIDENCE",
            &mut config.routing.crisis_keyword_confidence,
        )?;

        if let Ok(val) = std::env::var("TRIAGE_MAX_EVIDENCE_ITEMS") {
            config.orchestrator.max_evidence_items = val.parse().map_err(|_| {
                TriageConfigError::InvalidThreshold("TRIAGE_MAX_EVIDENCE_ITEMS".into())
            })?;
        }

        if let Ok(val) = std::env::var("TRIAGE_ANALYSIS_TEMPERATURE") {
            config.model.analysis_temperature = val.parse().map_err(|_| {
                TriageConfigError::InvalidThreshold("TRIAGE_ANALYSIS_TEMPERATURE".into())
            })?;
        }

        if let Ok(val) = std::env::var("TRIAGE_ANALYSIS_MAX_TOKENS") {
            config.model.analysis_max_tokens = val.parse().map_err(|_| {
                TriageConfigError::InvalidThreshold("TRIAGE_ANALYSIS_MAX_TOKENS".into())
            })?;
        }

        if let Ok(val) = std::env::var("TRIAGE_MODEL_TIMEOUT_SECS") {
            config.timeouts.model_call_secs = val.parse().map_err(|_| {
                TriageConfigError::InvalidThreshold("TRIAGE_MODEL_TIMEOUT_SECS".into())
            })?;
        }

        if let Ok(val) = std::env::var("TRIAGE_SIDE_EFFECT_TIMEOUT_SECS") {
            config.timeouts.side_effect_secs = val.parse().map_err(|_| {
                TriageConfigError::InvalidThreshold("TRIAGE_SIDE_EFFECT_TIMEOUT_SECS".into())
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range or internally inconsistent.
    pub fn validate(&self) -> Result<(), TriageConfigError> {
        let unit_range_fields = [
            ("explicit_hint_confidence", self.routing.explicit_hint_confidence),
            ("crisis_keyword_confidence", self.routing.crisis_keyword_confidence),
            (
                "standard_keyword_confidence",
                self.routing.standard_keyword_confidence,
            ),
            (
                "degraded_confidence_ceiling",
                self.routing.degraded_confidence_ceiling,
            ),
            ("no_signal_confidence", self.routing.no_signal_confidence),
            ("agreement_boost", self.routing.agreement_boost),
            (
                "contextual_rule_confidence",
                self.routing.contextual_rule_confidence,
            ),
            (
                "crisis_fast_path_confidence",
                self.orchestrator.crisis_fast_path_confidence,
            ),
            ("low_confidence_floor", self.orchestrator.low_confidence_floor),
            (
                "explicit_category_confidence",
                self.orchestrator.explicit_category_confidence,
            ),
            (
                "crisis_result_confidence",
                self.orchestrator.crisis_result_confidence,
            ),
            ("parse_failure_penalty", self.orchestrator.parse_failure_penalty),
            (
                "invocation_failure_penalty",
                self.orchestrator.invocation_failure_penalty,
            ),
        ];

        for (name, value) in unit_range_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(TriageConfigError::ValidationFailed(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }

        if self.routing.crisis_keyword_confidence < self.routing.standard_keyword_confidence {
            return Err(TriageConfigError::ValidationFailed(
                "crisis_keyword_confidence must be >= standard_keyword_confidence".into(),
            ));
        }

        if self.orchestrator.max_evidence_items == 0 {
            return Err(TriageConfigError::ValidationFailed(
                "max_evidence_items must be > 0".into(),
            ));
        }

        // Detailed-analysis calls are bounded by contract
        if !(0.0..=0.3).contains(&self.model.analysis_temperature) {
            return Err(TriageConfigError::ValidationFailed(
                "analysis_temperature must be between 0 and 0.3".into(),
            ));
        }

        if self.model.analysis_max_tokens == 0 || self.model.analysis_max_tokens > 500 {
            return Err(TriageConfigError::ValidationFailed(
                "analysis_max_tokens must be between 1 and 500".into(),
            ));
        }

        if self.model.classification_max_tokens == 0 {
            return Err(TriageConfigError::ValidationFailed(
                "classification_max_tokens must be > 0".into(),
            ));
        }

        if self.timeouts.model_call_secs == 0 || self.timeouts.side_effect_secs == 0 {
            return Err(TriageConfigError::ValidationFailed(
                "collaborator timeouts must be > 0 seconds".into(),
            ));
        }

        Ok(())
    }
}

fn override_f64(var: &str, slot: &mut f64) -> Result<(), TriageConfigError> {
    if let Ok(val) = std::env::var(var) {
        *slot = val
            .parse()
            .map_err(|_| TriageConfigError::InvalidThreshold(var.into()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_validates() {
        assert!(TriageConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_threshold_fails_validation() {
        let mut config = TriageConfig::default();
        config.orchestrator.crisis_fast_path_confidence = 1.4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unbounded_temperature_fails_validation() {
        let mut config = TriageConfig::default();
        config.model.analysis_temperature = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let mut config = TriageConfig::default();
        config.timeouts.model_call_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn crisis_keyword_confidence_must_dominate_standard() {
        let mut config = TriageConfig::default();
        config.routing.crisis_keyword_confidence = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn environment_variable_override() {
        std::env::set_var("TRIAGE_CRISIS_FAST_PATH_CONFIDENCE", "0.85");
        std::env::set_var("TRIAGE_MAX_EVIDENCE_ITEMS", "4");

        let config = TriageConfig::from_env().unwrap();
        assert!((config.orchestrator.crisis_fast_path_confidence - 0.85).abs() < 0.001);
        assert_eq!(config.orchestrator.max_evidence_items, 4);

        std::env::remove_var("TRIAGE_CRISIS_FAST_PATH_CONFIDENCE");
        std::env::remove_var("TRIAGE_MAX_EVIDENCE_ITEMS");
    }

    #[test]
    #[serial]
    fn invalid_environment_override_is_rejected() {
        std::env::set_var("TRIAGE_LOW_CONFIDENCE_FLOOR", "not-a-number");
        assert!(TriageConfig::from_env().is_err());
        std::env::remove_var("TRIAGE_LOW_CONFIDENCE_FLOOR");
    }
}
