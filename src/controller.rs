//! The message exchange state machine.
//!
//! Every user submission is either a normal query, which locks the input until
//! the backend answers, or the answer to a prompt the backend pushed earlier,
//! which is handed to the backend without locking anything.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use crate::bridge::{Backend, BridgeEvent, QueryReply, UiHandle};
use crate::input::InputGate;
use crate::state::{Sender, TranscriptEntry};
use crate::transcript::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    AwaitingReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Transcript,
}

#[derive(Debug, Clone, Default)]
pub struct ExchangeOptions {
    /// Rendered as an assistant entry when a query fails. `None` renders nothing.
    pub error_reply: Option<String>,
    /// Give up on a query after this long. `None` waits indefinitely.
    pub query_timeout: Option<Duration>,
}

pub struct ExchangeController {
    transcript: Transcript,
    gate: InputGate,
    prompt_waiting: bool,
    focus: Focus,
    backend: Arc<dyn Backend>,
    events: mpsc::UnboundedSender<BridgeEvent>,
    options: ExchangeOptions,
}

impl ExchangeController {
    pub fn new(
        welcome: impl Into<String>,
        backend: Arc<dyn Backend>,
        ui: &UiHandle,
        options: ExchangeOptions,
    ) -> Self {
        Self {
            transcript: Transcript::new(TranscriptEntry::new(welcome, Sender::Assistant)),
            gate: InputGate::new(),
            prompt_waiting: false,
            focus: Focus::Input,
            backend,
            events: ui.sender(),
            options,
        }
    }

    pub fn state(&self) -> ExchangeState {
        if self.gate.is_disabled() {
            ExchangeState::AwaitingReply
        } else {
            ExchangeState::Idle
        }
    }

    pub fn is_prompt_waiting(&self) -> bool {
        self.prompt_waiting
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn gate(&self) -> &InputGate {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut InputGate {
        &mut self.gate
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
    }

    /// Interface load: anchor the transcript to its newest entry.
    pub fn on_load(&mut self) {
        self.transcript.scroll_to_end();
    }

    /// Any key other than the submit trigger brings focus back to the input.
    pub fn refocus_input(&mut self) {
        self.focus = Focus::Input;
    }

    pub fn submit(&mut self) {
        let text = self.gate.take_value();
        if text.is_empty() {
            return;
        }

        self.transcript.push(text.clone(), Sender::User);

        if self.prompt_waiting {
            self.prompt_waiting = false;
            tracing::debug!("routing submission to prompt answer");
            self.backend.prompt_answer(text);
            return;
        }

        self.gate.set_disabled(true);
        tracing::debug!("dispatching query; input locked");

        let query = self.backend.query(text);
        let events = self.events.clone();
        let timeout = self.options.query_timeout;
        tokio::spawn(async move {
            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, query).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow!("backend did not answer within {:?}", limit)),
                },
                None => query.await,
            };
            if events.send(BridgeEvent::Reply(result)).is_err() {
                tracing::warn!("query finished after the UI shut down");
            }
        });
    }

    /// Apply the outcome of a spawned query. The input is unlocked on every path.
    pub fn finish_query(&mut self, result: Result<QueryReply>) {
        match result {
            Ok(QueryReply {
                response: Some(text),
            }) if !text.is_empty() => {
                self.transcript.push(text, Sender::Assistant);
            }
            Ok(_) => {
                tracing::debug!("backend returned no reply");
            }
            Err(err) => {
                tracing::error!("backend query failed: {:#}", err);
                // A prompt raised by this query has no one left to answer it
                if self.prompt_waiting {
                    tracing::debug!("dropping prompt mode with the failed query");
                    self.prompt_waiting = false;
                }
                if let Some(reply) = self.options.error_reply.clone() {
                    self.transcript.push(reply, Sender::Assistant);
                }
            }
        }
        self.gate.set_disabled(false);
    }

    pub fn set_prompt(&mut self, message: impl Into<String>) {
        self.transcript.push(message, Sender::Assistant);
        self.prompt_waiting = true;
        self.gate.set_disabled(false);
        self.transcript.scroll_to_end();
        self.focus = Focus::Input;
    }

    pub fn send_message(&mut self, text: impl Into<String>) {
        self.transcript.push(text, Sender::Assistant);
    }

    /// Drop every entry but the header. Lock and prompt state are left alone.
    pub fn clear_chat(&mut self) {
        self.transcript.clear();
    }

    pub fn handle_bridge_event(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::Prompt(message) => self.set_prompt(message),
            BridgeEvent::Message(text) => self.send_message(text),
            BridgeEvent::ClearTranscript => self.clear_chat(),
            BridgeEvent::Reply(result) => self.finish_query(result),
        }
    }
}
