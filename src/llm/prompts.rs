// ABOUTME: Prompt construction for routing classification and category analysis
// ABOUTME: Only the contract matters: text in, structured JSON verdict out
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Solace Labs

//! # Prompt Builders
//!
//! Builds the two prompt shapes the engine sends to the model backend: a
//! short routing-classification prompt and a category-specific detailed
//! analysis prompt. Both instruct the model to answer with a single JSON
//! object matching the schemas in [`crate::llm::parser`].

use crate::models::AnalyzerTarget;

use super::ChatMessage;

/// System prompt for the routing-classification call
const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You are a triage classifier for a mental-health support service. \
Classify the user's message into exactly one category: \
crisis, depression, anxiety, stress, wellness, or general_mental_health. \
Use crisis only for content indicating risk of harm to self or others. \
Respond with a single JSON object and nothing else: \
{\"category\": \"<category>\", \"confidence\": <0.0-1.0>, \"reasoning\": \"<one sentence>\"}";

/// System prompt preamble for the detailed analysis call
const ANALYSIS_SYSTEM_PROMPT: &str = "\
You are a clinical-support analysis assistant. Analyze the user's message \
and respond with a single JSON object and nothing else: \
{\"has_mental_health_issue\": <bool>, \"category\": \"<category>\", \
\"confidence\": <0.0-1.0>, \"explanation\": \"<2-3 sentences>\", \
\"supporting_evidence\": [\"<verbatim snippet>\", ...]}";

/// Build the message sequence for the routing-classification call
#[must_use]
pub fn classification_messages(text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT),
        ChatMessage::user(text),
    ]
}

/// Build the message sequence for the detailed analysis call
///
/// The system message carries category-specific guidance so the model
/// focuses on the routed analysis path.
#[must_use]
pub fn analysis_messages(text: &str, category: AnalyzerTarget) -> Vec<ChatMessage> {
    let system = format!(
        "{ANALYSIS_SYSTEM_PROMPT}\n\nFocus area: {}. {}",
        category.as_str(),
        category_guidance(category)
    );
    vec![ChatMessage::system(system), ChatMessage::user(text)]
}

fn category_guidance(category: AnalyzerTarget) -> &'static str {
    match category {
        AnalyzerTarget::Crisis => {
            "Assess immediacy of risk, protective factors, and any stated plan or means."
        }
        AnalyzerTarget::Depression => {
            "Assess mood, anhedonia, sleep, energy, self-worth, and duration of symptoms."
        }
        AnalyzerTarget::Anxiety => {
            "Assess worry patterns, physical symptoms, panic indicators, and avoidance."
        }
        AnalyzerTarget::Stress => {
            "Assess stressors, coping capacity, and signs of overload or burnout."
        }
        AnalyzerTarget::Wellness => {
            "Assess positive coping, habits, and opportunities to reinforce wellbeing."
        }
        AnalyzerTarget::GeneralMentalHealth | AnalyzerTarget::Unknown => {
            "Assess the text broadly for any mental-health concern before narrowing."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;

    #[test]
    fn classification_prompt_carries_user_text() {
        let messages = classification_messages("I feel on edge");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].content, "I feel on edge");
    }

    #[test]
    fn analysis_prompt_names_the_target_category() {
        let messages = analysis_messages("text", AnalyzerTarget::GeneralMentalHealth);
        assert!(messages[0].content.contains("general_mental_health"));
    }
}
