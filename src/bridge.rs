//! Contract between the exchange controller and the backend.
//!
//! The controller calls into the backend through [`Backend`]. The backend calls
//! back into the UI only through a [`UiHandle`], which turns each request into a
//! [`BridgeEvent`] for the controller's event loop to apply.

use anyhow::Result;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::mpsc;

/// Result of a backend query: `{"response": "..."}`.
///
/// An empty string, `null` and a missing field all mean "no reply".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryReply {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub response: Option<String>,
}

impl QueryReply {
    pub fn text(response: impl Into<String>) -> Self {
        let response = response.into();
        Self {
            response: (!response.is_empty()).then_some(response),
        }
    }

    pub fn empty() -> Self {
        Self { response: None }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

pub trait Backend: Send + Sync {
    /// Answer one user message. Single result, no streaming.
    fn query(&self, text: String) -> BoxFuture<'static, Result<QueryReply>>;

    /// Deliver the user's answer to the last prompt. Nothing is returned.
    fn prompt_answer(&self, text: String);
}

/// Everything that can arrive at the controller from outside the keyboard.
#[derive(Debug)]
pub enum BridgeEvent {
    /// The backend wants the next submission routed to `prompt_answer`.
    Prompt(String),
    /// A plain assistant message pushed by the backend.
    Message(String),
    /// The backend asked for the transcript to be cleared.
    ClearTranscript,
    /// A spawned query finished.
    Reply(Result<QueryReply>),
}

/// The UI capabilities handed to the backend.
#[derive(Debug, Clone)]
pub struct UiHandle {
    tx: mpsc::UnboundedSender<BridgeEvent>,
}

impl UiHandle {
    pub fn new(tx: mpsc::UnboundedSender<BridgeEvent>) -> Self {
        Self { tx }
    }

    /// Create a handle together with the receiving end the event loop listens on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BridgeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn set_prompt(&self, text: impl Into<String>) {
        self.send(BridgeEvent::Prompt(text.into()));
    }

    pub fn send_message(&self, text: impl Into<String>) {
        self.send(BridgeEvent::Message(text.into()));
    }

    pub fn clear_chat(&self) {
        self.send(BridgeEvent::ClearTranscript);
    }

    pub(crate) fn sender(&self) -> mpsc::UnboundedSender<BridgeEvent> {
        self.tx.clone()
    }

    fn send(&self, event: BridgeEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("UI event loop is gone; dropping bridge event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_with_text() {
        let reply: QueryReply = serde_json::from_str(r#"{"response":"Hello"}"#).unwrap();
        assert_eq!(reply.response.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_reply_without_text() {
        for json in [r#"{"response":""}"#, r#"{"response":null}"#, r#"{}"#] {
            let reply: QueryReply = serde_json::from_str(json).unwrap();
            assert_eq!(reply, QueryReply::empty(), "{}", json);
        }
        assert_eq!(QueryReply::text(""), QueryReply::empty());
    }

    #[tokio::test]
    async fn test_ui_handle_enqueues_events_in_order() {
        let (ui, mut rx) = UiHandle::channel();
        ui.send_message("one");
        ui.set_prompt("Pick a number");
        ui.clear_chat();

        assert!(matches!(rx.recv().await, Some(BridgeEvent::Message(m)) if m == "one"));
        assert!(matches!(rx.recv().await, Some(BridgeEvent::Prompt(p)) if p == "Pick a number"));
        assert!(matches!(rx.recv().await, Some(BridgeEvent::ClearTranscript)));
    }
}
