use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Trend,
    Event,
    Advice,
}

/// A synthesized finding: a stable slug id, the kind of finding, a
/// pre-rendered sentence, and the structured values behind it for
/// programmatic consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub kind: InsightKind,
    pub text: String,
    pub data: Value,
}

impl Insight {
    pub fn new(id: &str, kind: InsightKind, text: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.to_string(),
            kind,
            text: text.into(),
            data,
        }
    }
}
