// ABOUTME: Deterministic lexical rule matcher with a crisis-first ordered rule table
// ABOUTME: First matching rule wins; priority is table position, not match length
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # Keyword Classifier
//!
//! The fastest routing signal: an ordered rule table evaluated top to
//! bottom, crisis rules first. A rule matches via case-insensitive substring
//! or a compiled pattern. Deterministic by construction: identical text
//! always produces an identical decision.

use regex::Regex;
use tracing::debug;

use crate::config::RoutingThresholds;
use crate::models::{AnalyzerTarget, RoutingDecision, RoutingMethod};

/// Confidence tier a rule belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleTier {
    /// Crisis-tier rules, always evaluated first
    Crisis,
    /// Standard category rules
    Standard,
}

/// One entry in the ordered rule table
struct KeywordRule {
    target: AnalyzerTarget,
    tier: RuleTier,
    /// Case-insensitive substring terms
    terms: &'static [&'static str],
    /// Compiled patterns for matches substrings cannot express
    patterns: Vec<Regex>,
}

/// Ordered rule table source: `(target, tier, terms, raw patterns)`
///
/// Crisis rules come first; within a tier, table position is priority.
const RULE_TABLE: &[(
    AnalyzerTarget,
    RuleTier,
    &[&str],
    &[&str],
)] = &[
    (
        AnalyzerTarget::Crisis,
        RuleTier::Crisis,
        &[
            "kill myself",
            "suicide",
            "suicidal",
            "end my life",
            "end it all",
            "want to die",
            "wish i was dead",
            "better off dead",
            "no reason to live",
            "self-harm",
            "self harm",
            "hurt myself",
        ],
        &[r"(?i)\b(kill|hurt|harm)(ing)?\s+myself\b", r"(?i)\bend\s+it\s+all\b"],
    ),
    (
        AnalyzerTarget::Depression,
        RuleTier::Standard,
        &[
            "depressed",
            "depression",
            "hopeless",
            "worthless",
            "empty inside",
            "no energy for anything",
            "can't get out of bed",
        ],
        &[],
    ),
    (
        AnalyzerTarget::Anxiety,
        RuleTier::Standard,
        &[
            "panic attack",
            "anxiety",
            "anxious",
            "can't stop worrying",
            "heart racing",
            "on edge",
        ],
        &[],
    ),
    (
        AnalyzerTarget::Stress,
        RuleTier::Standard,
        &[
            "stressed",
            "overwhelmed",
            "burnout",
            "burned out",
            "too much pressure",
            "breaking point",
        ],
        &[],
    ),
    (
        AnalyzerTarget::Wellness,
        RuleTier::Standard,
        &[
            "meditation",
            "mindfulness",
            "self-care",
            "gratitude",
            "sleep habits",
            "feeling better lately",
        ],
        &[],
    ),
];

/// Deterministic lexical rule matcher
pub struct KeywordClassifier {
    rules: Vec<KeywordRule>,
    crisis_confidence: f64,
    standard_confidence: f64,
}

impl KeywordClassifier {
    /// Compile the rule table with the configured confidence tiers
    #[must_use]
    pub fn new(thresholds: &RoutingThresholds) -> Self {
        let rules = RULE_TABLE
            .iter()
            .map(|(target, tier, terms, raw_patterns)| KeywordRule {
                target: *target,
                tier: *tier,
                terms,
                patterns: raw_patterns
                    .iter()
                    .filter_map(|p| Regex::new(p).ok())
                    .collect(),
            })
            .collect();

        Self {
            rules,
            crisis_confidence: thresholds.crisis_keyword_confidence,
            standard_confidence: thresholds.standard_keyword_confidence,
        }
    }

    /// Classify text against the rule table; `None` when no rule matches
    ///
    /// The matched term is recorded in the decision's insights for audit and
    /// for the escalation handler's detected-risk list.
    #[must_use]
    pub fn classify(&self, text: &str) -> Option<RoutingDecision> {
        let lowered = text.to_lowercase();

        for rule in &self.rules {
            let matched_term = rule
                .terms
                .iter()
                .find(|term| lowered.contains(*term))
                .map(|term| (*term).to_owned())
                .or_else(|| {
                    rule.patterns
                        .iter()
                        .find_map(|p| p.find(text).map(|m| m.as_str().to_lowercase()))
                });

            if let Some(term) = matched_term {
                let confidence = match rule.tier {
                    RuleTier::Crisis => self.crisis_confidence,
                    RuleTier::Standard => self.standard_confidence,
                };
                debug!(target_analyzer = %rule.target, term = %term, "keyword rule matched");
                return Some(
                    RoutingDecision::new(rule.target, confidence, RoutingMethod::Keyword)
                        .with_insight("matched_term", term),
                );
            }
        }

        None
    }
}
