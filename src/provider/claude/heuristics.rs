//! Advisory request classifiers for routing decisions.
//!
//! Keyword and length heuristics over the concatenated message text. Purely
//! advisory: nothing here affects correctness of a call, the scores only
//! feed an external router choosing between backends.

use serde::Serialize;

use crate::provider::estimate_tokens;
use crate::types::GenerationRequest;

/// Content length (estimated tokens) under which this backend is considered
/// a good fit for quick responses.
const SHORT_CONTENT_TOKENS: u64 = 2000;

const CONVERSATIONAL_INDICATORS: [&str; 9] = [
    "conversation",
    "chat",
    "dialogue",
    "discuss",
    "talk",
    "ask",
    "tell me",
    "what do you think",
    "help me understand",
];

const SUMMARIZATION_INDICATORS: [&str; 9] = [
    "summarize",
    "summary",
    "key points",
    "highlights",
    "main ideas",
    "brief",
    "concise",
    "overview",
    "essence",
];

const ANALYSIS_INDICATORS: [&str; 9] = [
    "analyze",
    "analysis",
    "classify",
    "categorize",
    "evaluate",
    "compare",
    "contrast",
    "assess",
    "review",
];

const GREETING_INDICATORS: [&str; 5] = ["hello", "hi", "how are", "what do you", "tell me"];
const SUMMARY_HINTS: [&str; 4] = ["summarize", "summary", "key points", "main"];
const ANALYSIS_HINTS: [&str; 4] = ["analyze", "analysis", "evaluate", "compare"];
const CLASSIFICATION_HINTS: [&str; 3] = ["classify", "categorize", "type of"];
const STRUCTURED_INDICATORS: [&str; 7] =
    ["list", "table", "json", "xml", "csv", "format", "structure"];

/// Content traits detected in a request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestCharacteristics {
    pub is_conversational: bool,
    pub is_summarization: bool,
    pub is_analysis: bool,
    pub is_classification: bool,
    /// Estimated tokens across all message contents.
    pub content_length: u64,
    pub is_multilingual: bool,
    pub has_structured_data: bool,
}

/// Suitability verdict for routing a request to this backend.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAnalysis {
    /// Score in `0.0..=1.0`; higher means a better fit.
    pub suitability_score: f64,
    pub characteristics: RequestCharacteristics,
    pub recommended: bool,
    pub optimization_tips: Vec<String>,
}

/// Temperature presets suggested per task style.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TemperaturePresets {
    pub creative: f32,
    pub balanced: f32,
    pub precise: f32,
    pub analytical: f32,
}

pub(crate) fn temperature_presets() -> TemperaturePresets {
    TemperaturePresets {
        creative: 0.9,
        balanced: 0.7,
        precise: 0.3,
        analytical: 0.2,
    }
}

fn concatenated_content(request: &GenerationRequest) -> String {
    request
        .messages
        .iter()
        .map(|msg| msg.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Whether this backend is a cost-effective choice for the request.
///
/// Fast conversational, summarization, and analysis work fits; so does any
/// short request regardless of content.
pub(crate) fn is_cost_effective(request: &GenerationRequest) -> bool {
    let content = concatenated_content(request);
    let lower = content.to_lowercase();

    let has_conversational = contains_any(&lower, &CONVERSATIONAL_INDICATORS);
    let has_summarization = contains_any(&lower, &SUMMARIZATION_INDICATORS);
    let has_analysis = contains_any(&lower, &ANALYSIS_INDICATORS);
    let is_short = estimate_tokens(&content) < SHORT_CONTENT_TOKENS;

    has_conversational || has_summarization || has_analysis || is_short
}

/// Scores how well the request matches this backend's strengths.
pub(crate) fn analyze(request: &GenerationRequest) -> RequestAnalysis {
    let content = concatenated_content(request);
    let lower = content.to_lowercase();

    let characteristics = RequestCharacteristics {
        is_conversational: contains_any(&lower, &GREETING_INDICATORS),
        is_summarization: contains_any(&lower, &SUMMARY_HINTS),
        is_analysis: contains_any(&lower, &ANALYSIS_HINTS),
        is_classification: contains_any(&lower, &CLASSIFICATION_HINTS),
        content_length: estimate_tokens(&content),
        is_multilingual: is_multilingual(&content),
        has_structured_data: contains_any(&lower, &STRUCTURED_INDICATORS),
    };

    let mut suitability_score: f64 = 0.0;
    if characteristics.is_conversational {
        suitability_score += 0.3;
    }
    if characteristics.is_summarization {
        suitability_score += 0.25;
    }
    if characteristics.is_analysis {
        suitability_score += 0.2;
    }
    if characteristics.is_classification {
        suitability_score += 0.15;
    }
    if characteristics.content_length < SHORT_CONTENT_TOKENS {
        suitability_score += 0.1;
    }
    let suitability_score = suitability_score.min(1.0);

    let optimization_tips = optimization_tips(&characteristics);

    RequestAnalysis {
        suitability_score,
        recommended: suitability_score > 0.4,
        characteristics,
        optimization_tips,
    }
}

/// More than 10% non-ASCII characters counts as multilingual content.
fn is_multilingual(content: &str) -> bool {
    if content.is_empty() {
        return false;
    }
    let total = content.chars().count();
    let non_ascii = content.chars().filter(|ch| !ch.is_ascii()).count();
    non_ascii * 10 > total
}

fn optimization_tips(characteristics: &RequestCharacteristics) -> Vec<String> {
    let mut tips = Vec::new();
    if characteristics.is_conversational {
        tips.push("excels at natural conversation".to_string());
    }
    if characteristics.is_summarization {
        tips.push("well suited for quick, accurate summarization".to_string());
    }
    if characteristics.content_length > 4000 {
        tips.push("consider splitting long content for better performance".to_string());
    }
    if characteristics.is_multilingual {
        tips.push("strong multilingual capabilities".to_string());
    }
    if characteristics.has_structured_data {
        tips.push("good at analyzing and restructuring data".to_string());
    }
    tips
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    fn request_with_text(text: &str) -> GenerationRequest {
        GenerationRequest::builder()
            .message(ChatMessage::user(text))
            .build()
            .expect("valid request")
    }

    #[test]
    fn short_requests_are_cost_effective_regardless_of_content() {
        let request = request_with_text("translate this number: 42");
        assert!(is_cost_effective(&request));
    }

    #[test]
    fn long_non_matching_content_is_not_cost_effective() {
        // ~12500 estimated tokens of filler with none of the indicator words.
        let request = request_with_text(&"zq ".repeat(25_000));
        assert!(!is_cost_effective(&request));
    }

    #[test]
    fn long_summarization_request_remains_cost_effective() {
        let text = format!("summarize the following document: {}", "zq ".repeat(25_000));
        assert!(is_cost_effective(&request_with_text(&text)));
    }

    #[test]
    fn analysis_request_scores_and_recommends() {
        let request = request_with_text("Please analyze and compare these two proposals. Hello!");
        let analysis = analyze(&request);

        assert!(analysis.characteristics.is_conversational);
        assert!(analysis.characteristics.is_analysis);
        // 0.3 conversational + 0.2 analysis + 0.1 short content.
        assert!((analysis.suitability_score - 0.6).abs() < 1e-9);
        assert!(analysis.recommended);
    }

    #[test]
    fn neutral_request_is_not_recommended() {
        let request = request_with_text("Write a poem about mountains.");
        let analysis = analyze(&request);
        assert!(analysis.suitability_score <= 0.4);
        assert!(!analysis.recommended);
    }

    #[test]
    fn suitability_score_is_capped_at_one() {
        let request = request_with_text(
            "hello, summarize the main points, analyze and classify what type of text this is",
        );
        let analysis = analyze(&request);
        assert!(analysis.suitability_score <= 1.0);
    }

    #[test]
    fn detects_multilingual_content() {
        let request = request_with_text("これは日本語のテキストです");
        let analysis = analyze(&request);
        assert!(analysis.characteristics.is_multilingual);

        let ascii = analyze(&request_with_text("plain english text"));
        assert!(!ascii.characteristics.is_multilingual);
    }

    #[test]
    fn detects_structured_data_keywords() {
        let analysis = analyze(&request_with_text("convert this json into a table"));
        assert!(analysis.characteristics.has_structured_data);
    }

    #[test]
    fn temperature_presets_are_ordered() {
        let presets = temperature_presets();
        assert!(presets.analytical < presets.precise);
        assert!(presets.precise < presets.balanced);
        assert!(presets.balanced < presets.creative);
    }
}
