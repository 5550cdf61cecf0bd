// ABOUTME: Evidence extraction collaborator contract and snippet merging rules
// ABOUTME: Merged evidence is ordered, deduplicated, and capped by configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # Supporting Evidence
//!
//! Long-form evidence extraction is an external collaborator; the engine
//! only owns the merge rule: model-quoted snippets first, extractor items
//! after, order preserved, duplicates removed, capped at the configured
//! maximum.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::EngineResult;
use crate::models::{AnalyzerTarget, RoutingContext};

/// Result of an evidence extraction call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceBundle {
    /// Extracted supporting snippets, in extractor order
    pub evidence_items: Vec<String>,
    /// Extractor-reported processing metadata, opaque to the engine
    #[serde(default)]
    pub processing_metadata: serde_json::Value,
}

/// External collaborator that extracts supporting text snippets for a category
#[async_trait]
pub trait EvidenceService: Send + Sync {
    /// Extract supporting evidence for the resolved category
    ///
    /// The caller's routing context is forwarded so extractors can scope
    /// their lookups to the user or session.
    ///
    /// # Errors
    ///
    /// Returns an error when extraction fails; the orchestrator records the
    /// failure and proceeds without extractor evidence.
    async fn extract_supporting_evidence(
        &self,
        text: &str,
        category: AnalyzerTarget,
        base_explanation: Option<&str>,
        context: Option<&RoutingContext>,
    ) -> EngineResult<EvidenceBundle>;
}

/// Merge evidence lists: ordered, deduplicated, capped
///
/// Primary items (model-quoted snippets) keep precedence over extracted
/// items. Whitespace-only entries are dropped.
#[must_use]
pub fn merge_evidence(primary: Vec<String>, extracted: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for item in primary.into_iter().chain(extracted) {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if merged.len() >= cap {
            break;
        }
        if seen.insert(trimmed.to_owned()) {
            merged.push(trimmed.to_owned());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn merge_preserves_order_and_precedence() {
        let merged = merge_evidence(items(&["a", "b"]), items(&["c", "d"]), 8);
        assert_eq!(merged, items(&["a", "b", "c", "d"]));
    }

    #[test]
    fn merge_deduplicates_across_sources() {
        let merged = merge_evidence(items(&["a", "b"]), items(&["b", "a", "c"]), 8);
        assert_eq!(merged, items(&["a", "b", "c"]));
    }

    #[test]
    fn merge_respects_cap() {
        let extracted: Vec<String> = (0..20).map(|i| format!("item {i}")).collect();
        let merged = merge_evidence(Vec::new(), extracted, 8);
        assert_eq!(merged.len(), 8);
        assert_eq!(merged[0], "item 0");
    }

    #[test]
    fn merge_drops_blank_entries() {
        let merged = merge_evidence(items(&["a", "  ", ""]), items(&["b"]), 8);
        assert_eq!(merged, items(&["a", "b"]));
    }
}
