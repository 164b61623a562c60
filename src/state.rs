//! UI-agnostic transcript types
//!
//! These are shared by the exchange controller, the renderer and the backend
//! and don't depend on ratatui.

use serde::{Deserialize, Serialize};

/// One rendered line of the conversation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub text: String,
    pub sender: Sender,
}

impl TranscriptEntry {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            text: text.into(),
            sender,
        }
    }
}

/// Who produced a transcript entry. Only used for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai")]
    Assistant,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "You:",
            Sender::Assistant => "AI:",
        }
    }
}
