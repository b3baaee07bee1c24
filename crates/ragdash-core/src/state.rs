//! UI-agnostic application state types
//!
//! The conversation types here are shared by the terminal UI and the one-shot
//! CLI commands, and don't depend on any specific UI framework.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A backend-supplied pointer to the document passage behind an answer.
///
/// The payload is opaque: missing or oddly typed fields fall back to defaults
/// instead of failing the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_source: String,
    #[serde(default, deserialize_with = "lenient_page", skip_serializing_if = "Option::is_none")]
    pub page_num: Option<u32>,
    /// Retrieved passage text, when the backend includes it
    #[serde(default, deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Retrieval distance, when the backend includes it
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl Citation {
    pub fn new(file_source: &str, page_num: Option<u32>) -> Self {
        Self {
            file_source: file_source.to_string(),
            page_num,
            text: None,
            distance: None,
        }
    }

    /// Page to show for this citation; pages are 1-based and default to the first
    pub fn page(&self) -> u32 {
        self.page_num.unwrap_or(1)
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (p. {})", self.file_source, self.page())
    }
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Citation>>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            sources: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            sources: None,
        }
    }

    /// An assistant answer carrying whatever sources the backend returned
    pub fn answer(content: impl Into<String>, sources: Option<Vec<Citation>>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            sources,
        }
    }

    /// Citations in received order; empty when the backend sent none
    pub fn citations(&self) -> &[Citation] {
        self.sources.as_deref().unwrap_or(&[])
    }
}

/// Transcript plus in-flight flag for one chat view.
///
/// Append-only: there is no edit, delete or eviction. The store lives exactly
/// as long as the view that owns it.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
    pending: bool,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Label for the submit control
    pub fn submit_label(&self) -> &'static str {
        if self.pending {
            "Thinking…"
        } else {
            "Send"
        }
    }
}

pub(crate) fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Citation list of a reply. Entries that are not objects are skipped, and a
/// non-array value counts as no sources.
pub(crate) fn lenient_citations<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<Citation>>, D::Error> {
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| Citation::deserialize(item).ok())
            .collect(),
    ))
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_page<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let page = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(page
        .filter(|&p| p > 0)
        .and_then(|p| u32::try_from(p).ok()))
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        _ => None,
    })
}
