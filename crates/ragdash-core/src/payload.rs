//! Response payloads returned by the RAG backend.
//!
//! Shapes are only partially known, so every field has a default and unknown
//! fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::{lenient_citations, lenient_string, Citation};

/// Body of a successful `/api/chat` response (`response` field)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_citations")]
    pub sources: Option<Vec<Citation>>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Token accounting reported by the inference model
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input: Option<u64>,
    #[serde(default)]
    pub output: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub processing_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub sample_text: String,
    #[serde(default)]
    pub top_source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct ClusterData {
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

/// Sentiment split across the library; the backend may send counts or fractions
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Sentiment {
    #[serde(default)]
    pub positive: f64,
    #[serde(default)]
    pub neutral: f64,
    #[serde(default)]
    pub negative: f64,
}

impl Sentiment {
    pub fn total(&self) -> f64 {
        self.positive + self.neutral + self.negative
    }

    /// Percentage of `value` in the whole split, 0 when nothing was scored
    pub fn percent(&self, value: f64) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            0.0
        } else {
            value / total * 100.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TimePoint {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub count: u64,
}

/// Embedding model, vector store and LLM the backend pipeline runs with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_db: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
}

/// Result of `/api/status`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BackendStatus {
    #[serde(default)]
    pub config: PipelineConfig,
    /// Library card: document/block counts, embedding state, and so on
    #[serde(default)]
    pub library: Option<Map<String, Value>>,
}

impl BackendStatus {
    /// Library card entries rendered as `(key, value)` text pairs
    pub fn library_rows(&self) -> Vec<(String, String)> {
        self.library
            .iter()
            .flatten()
            .map(|(key, value)| (key.clone(), display_value(value)))
            .collect()
    }
}

/// Result of `/api/ingest`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub stats: Option<Value>,
}

impl IngestReport {
    /// One-line summary of the returned stats, if any
    pub fn summary(&self) -> Option<String> {
        match self.stats.as_ref()? {
            Value::Object(map) if map.is_empty() => None,
            Value::Object(map) => Some(
                map.iter()
                    .map(|(k, v)| format!("{}: {}", k, display_value(v)))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Value::Null => None,
            other => Some(display_value(other)),
        }
    }
}

/// Render a loose JSON value as plain text (strings unquoted)
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}
