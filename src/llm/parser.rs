// ABOUTME: Schema-validating parser for language-model verdict responses
// ABOUTME: Returns tagged results so business logic never handles raw JSON errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # Verdict Parsing
//!
//! Model output is untrusted text: it may be empty, wrapped in markdown code
//! fences, surrounded by prose, or syntactically broken. This module isolates
//! all of that handling behind two typed entry points,
//! [`parse_classification`] and [`parse_analysis`], which either produce a
//! validated verdict or a [`ParseFailure`] naming the reason.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::clamp_confidence;

/// Reason a model response could not be interpreted
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseFailure {
    /// Response content was empty or whitespace
    #[error("response content is empty")]
    Empty,

    /// No JSON object could be located in the content
    #[error("no JSON object found in response")]
    NoJsonObject,

    /// A JSON object was located but did not parse
    #[error("malformed JSON: {0}")]
    Syntax(String),

    /// JSON parsed but required fields were missing or invalid
    #[error("schema violation: {0}")]
    Schema(String),
}

/// Verdict of the short routing-classification call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    /// Raw category label produced by the model
    pub category: String,
    /// Model-reported confidence, clamped to `[0, 1]`
    pub confidence: f64,
    /// Optional one-line reasoning for audit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Verdict of the detailed category analysis call
///
/// Every field is optional: the orchestrator treats each as a best-effort
/// signal and falls back to routed values for whatever is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisVerdict {
    /// Whether the model judged the text to indicate a concern
    #[serde(default)]
    pub has_mental_health_issue: Option<bool>,
    /// Category proposed by the model
    #[serde(default)]
    pub category: Option<String>,
    /// Model-reported confidence
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Model-produced explanation
    #[serde(default)]
    pub explanation: Option<String>,
    /// Supporting snippets quoted by the model
    #[serde(default)]
    pub supporting_evidence: Option<Vec<String>>,
}

/// Locate the outermost JSON object in model output
///
/// Strips markdown code fences and surrounding prose by slicing from the
/// first `{` to the last `}`. Returns `None` when no object is present.
#[must_use]
pub fn extract_json_block(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}

/// Parse and validate a routing-classification response
///
/// # Errors
///
/// Returns a [`ParseFailure`] naming why the content could not be
/// interpreted as a `{category, confidence}` verdict.
pub fn parse_classification(content: &str) -> Result<ClassificationVerdict, ParseFailure> {
    let block = locate(content)?;
    let mut verdict: ClassificationVerdict =
        serde_json::from_str(block).map_err(|e| ParseFailure::Syntax(e.to_string()))?;

    if verdict.category.trim().is_empty() {
        return Err(ParseFailure::Schema("category is empty".into()));
    }
    if verdict.confidence.is_nan() {
        return Err(ParseFailure::Schema("confidence is not a number".into()));
    }

    verdict.confidence = clamp_confidence(verdict.confidence);
    Ok(verdict)
}

/// Parse and validate a detailed-analysis response
///
/// # Errors
///
/// Returns a [`ParseFailure`] naming why the content could not be
/// interpreted as an analysis verdict.
pub fn parse_analysis(content: &str) -> Result<AnalysisVerdict, ParseFailure> {
    let block = locate(content)?;
    let mut verdict: AnalysisVerdict =
        serde_json::from_str(block).map_err(|e| ParseFailure::Syntax(e.to_string()))?;

    if let Some(confidence) = verdict.confidence {
        if confidence.is_nan() {
            return Err(ParseFailure::Schema("confidence is not a number".into()));
        }
        verdict.confidence = Some(clamp_confidence(confidence));
    }

    Ok(verdict)
}

fn locate(content: &str) -> Result<&str, ParseFailure> {
    if content.trim().is_empty() {
        return Err(ParseFailure::Empty);
    }
    extract_json_block(content).ok_or(ParseFailure::NoJsonObject)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_classification_json() {
        let verdict =
            parse_classification(r#"{"category": "anxiety", "confidence": 0.82}"#).unwrap();
        assert_eq!(verdict.category, "anxiety");
        assert!((verdict.confidence - 0.82).abs() < f64::EPSILON);
    }

    #[test]
    fn strips_code_fences_and_prose() {
        let content = "Here is my verdict:\n```json\n{\"category\": \"stress\", \"confidence\": 0.6}\n```\nLet me know.";
        let verdict = parse_classification(content).unwrap();
        assert_eq!(verdict.category, "stress");
    }

    #[test]
    fn clamps_out_of_range_confidence() {
        let verdict =
            parse_classification(r#"{"category": "crisis", "confidence": 3.5}"#).unwrap();
        assert!((verdict.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_content_is_tagged_empty() {
        assert_eq!(parse_classification("   \n"), Err(ParseFailure::Empty));
    }

    #[test]
    fn prose_without_json_is_tagged_no_object() {
        assert_eq!(
            parse_classification("I think this is about anxiety."),
            Err(ParseFailure::NoJsonObject)
        );
    }

    #[test]
    fn broken_json_is_tagged_syntax() {
        let result = parse_classification(r#"{"category": "anxiety", "confidence":"#);
        assert!(matches!(result, Err(ParseFailure::Syntax(_))));
    }

    #[test]
    fn empty_category_is_schema_violation() {
        let result = parse_classification(r#"{"category": "", "confidence": 0.5}"#);
        assert!(matches!(result, Err(ParseFailure::Schema(_))));
    }

    #[test]
    fn analysis_verdict_tolerates_partial_fields() {
        let verdict = parse_analysis(r#"{"category": "depression"}"#).unwrap();
        assert_eq!(verdict.category.as_deref(), Some("depression"));
        assert!(verdict.confidence.is_none());
        assert!(verdict.supporting_evidence.is_none());
    }

    #[test]
    fn analysis_verdict_full_payload() {
        let content = r#"{
            "has_mental_health_issue": true,
            "category": "anxiety",
            "confidence": 0.88,
            "explanation": "Recurring panic symptoms",
            "supporting_evidence": ["heart racing", "can't stop worrying"]
        }"#;
        let verdict = parse_analysis(content).unwrap();
        assert_eq!(verdict.has_mental_health_issue, Some(true));
        assert_eq!(verdict.supporting_evidence.map(|e| e.len()), Some(2));
    }
}
