use planner_core::TopicInput;
use serde::{Deserialize, Serialize};

/// Topics used when a response cannot be decoded or contains nothing usable.
const FALLBACK_TOPICS: &[(&str, f64)] = &[
    ("Introduction", 5.0),
    ("Core Concepts", 8.0),
    ("Advanced Topics", 7.0),
];

/// Expected shape of a topic-extraction response.
#[derive(Debug, Deserialize)]
struct TopicResponse {
    topics: Vec<RawTopic>,
}

#[derive(Debug, Deserialize)]
struct RawTopic {
    name: String,
    weight: f64,
}

/// Where a set of extracted topics came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    /// Decoded from the model response.
    Response,
    /// The response was unusable; the fixed fallback set was used.
    Fallback,
}

/// Weighted topics ready for allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicExtraction {
    pub topics: Vec<TopicInput>,
    pub source: ExtractionSource,
    /// Entries dropped for a blank name or a non-positive weight.
    pub dropped: usize,
}

impl TopicExtraction {
    pub fn fallback() -> Self {
        Self {
            topics: FALLBACK_TOPICS
                .iter()
                .map(|(name, weight)| TopicInput::new(*name, *weight))
                .collect(),
            source: ExtractionSource::Fallback,
            dropped: 0,
        }
    }
}

/// Decode a topic-extraction response of the form
/// `{"topics": [{"name": "...", "weight": 8}]}`.
///
/// Markdown code fences around the JSON are ignored. Never fails: anything
/// that does not decode, or decodes to no valid topics, yields
/// [`TopicExtraction::fallback`].
pub fn parse_topic_response(raw: &str) -> TopicExtraction {
    let body = strip_code_fences(raw);

    let response: TopicResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Topic response is not valid JSON, using fallback topics: {}", e);
            return TopicExtraction::fallback();
        }
    };

    let total = response.topics.len();
    let topics: Vec<TopicInput> = response
        .topics
        .into_iter()
        .filter_map(|t| {
            let name = t.name.trim();
            if name.is_empty() || !t.weight.is_finite() || t.weight <= 0.0 {
                return None;
            }
            Some(TopicInput::new(name, t.weight))
        })
        .collect();
    let dropped = total - topics.len();

    if dropped > 0 {
        tracing::warn!("Dropped {} invalid topic entries from response", dropped);
    }

    if topics.is_empty() {
        tracing::warn!("Topic response contained no usable topics, using fallback topics");
        return TopicExtraction {
            dropped,
            ..TopicExtraction::fallback()
        };
    }

    TopicExtraction {
        topics,
        source: ExtractionSource::Response,
        dropped,
    }
}

/// Remove a leading ```` ``` ```` / ```` ```json ```` line and a trailing ```` ``` ````.
fn strip_code_fences(raw: &str) -> &str {
    let mut body = raw.trim();

    if let Some(rest) = body.strip_prefix("```") {
        // Skip an optional language tag on the opening fence.
        let tag_len = rest
            .find(|c: char| !c.is_alphanumeric())
            .unwrap_or(rest.len());
        body = rest[tag_len..].trim_start();
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest.trim_end();
    }

    body
}
