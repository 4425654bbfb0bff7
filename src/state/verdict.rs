//! Match verdict emitted once per invocation.

use serde::Serialize;

/// Outcome of comparing a verification frame against a profile photo.
///
/// Serialized as a single JSON object. Fields that do not apply to the
/// outcome are omitted, so a success carries `similarity` and `match` while
/// a failure carries `error`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchVerdict {
    /// Whether the comparison ran to completion.
    pub success: bool,
    /// Similarity in `[0, 1]`; higher means more alike.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    /// Whether `similarity` reached the match threshold.
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub is_match: Option<bool>,
    /// Human-readable reason the comparison did not complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MatchVerdict {
    /// A completed comparison.
    pub fn matched(similarity: f32, is_match: bool) -> Self {
        Self {
            success: true,
            similarity: Some(similarity),
            is_match: Some(is_match),
            error: None,
        }
    }

    /// A comparison that stopped early.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            similarity: None,
            is_match: None,
            error: Some(error.into()),
        }
    }

    /// Serialize as one compact JSON line (without the trailing newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
