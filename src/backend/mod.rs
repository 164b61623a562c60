//! The local backend: matches a message to a built-in action and runs it.
//!
//! Actions may ask the user follow-up questions with
//! [`ActionContext::request_input`]; the answer comes back through
//! [`Backend::prompt_answer`].

pub mod actions;
pub mod ollama;

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use futures_util::future::BoxFuture;
use tokio::sync::oneshot;

use crate::bridge::{Backend, QueryReply, UiHandle};
use crate::config::Config;
pub use ollama::OllamaClient;

// Messages made only of these words get no reply at all.
const STOPWORDS: &[&str] = &[
    "ok", "okay", "k", "hm", "hmm", "ah", "oh", "alright", "thanks", "thank", "you",
];

const REPEAT_TRIGGERS: &[&str] = &["repeat", "again", "once more"];

const NO_QUESTION_REPLY: &str = "There is no question waiting for an answer.";

pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;

    /// Phrases that select this action when they appear as whole words in a message.
    fn triggers(&self) -> &'static [&'static str];

    /// Shown instead of a reply when `run` fails.
    fn error_reply(&self) -> &'static str {
        "Sorry, that didn't work."
    }

    fn run(&self, ctx: ActionContext) -> BoxFuture<'static, Result<Option<String>>>;
}

/// Pending follow-up question. At most one is outstanding; arming a new one
/// abandons the previous one.
#[derive(Clone, Default)]
pub struct PromptSlot {
    pending: Arc<Mutex<Option<oneshot::Sender<String>>>>,
}

impl PromptSlot {
    fn lock(&self) -> MutexGuard<'_, Option<oneshot::Sender<String>>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn arm(&self) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        *self.lock() = Some(tx);
        rx
    }

    /// Hand `text` to the waiting action. Returns false if nothing was waiting.
    fn answer(&self, text: String) -> bool {
        match self.lock().take() {
            Some(tx) => tx.send(text).is_ok(),
            None => false,
        }
    }
}

pub struct ActionContext {
    pub input: String,
    ui: UiHandle,
    prompts: PromptSlot,
}

impl ActionContext {
    pub fn new(input: String, ui: UiHandle, prompts: PromptSlot) -> Self {
        Self { input, ui, prompts }
    }

    pub fn ui(&self) -> &UiHandle {
        &self.ui
    }

    /// Show `prompt` in the chat and wait for the user's next message.
    pub async fn request_input(&self, prompt: &str) -> Result<String> {
        let answer = self.prompts.arm();
        self.ui.set_prompt(prompt);
        answer
            .await
            .map_err(|_| anyhow!("prompt \"{}\" was abandoned", prompt))
    }
}

/// What to do with a message no action claims.
#[derive(Clone)]
pub enum Fallback {
    Reply(String),
    Ollama { client: OllamaClient, model: String },
}

enum Intent {
    Stopword,
    Repeat,
    Action(Arc<dyn Action>),
    Unknown,
}

#[derive(Default)]
struct History {
    last_action: Option<Arc<dyn Action>>,
    last_input: Option<String>,
}

struct Inner {
    actions: Vec<Arc<dyn Action>>,
    ui: UiHandle,
    prompts: PromptSlot,
    history: Mutex<History>,
    fallback: Fallback,
}

#[derive(Clone)]
pub struct ActionBackend {
    inner: Arc<Inner>,
}

impl ActionBackend {
    pub fn new(config: &Config, ui: UiHandle) -> Self {
        let actions: Vec<Arc<dyn Action>> = vec![
            Arc::new(actions::ClearChat),
            Arc::new(actions::RandomNumber),
            Arc::new(actions::CurrentTime),
            Arc::new(actions::TellJoke::new(&config.joke_url)),
            Arc::new(actions::OpenWebsite::new()),
            Arc::new(actions::Greet::new(config.user_name.clone())),
        ];

        let fallback = match &config.fallback_model {
            Some(model) => Fallback::Ollama {
                client: OllamaClient::new(&config.ollama_url),
                model: model.clone(),
            },
            None => Fallback::Reply(config.fallback_reply.clone()),
        };

        Self::with_actions(actions, ui, fallback)
    }

    pub fn with_actions(actions: Vec<Arc<dyn Action>>, ui: UiHandle, fallback: Fallback) -> Self {
        Self {
            inner: Arc::new(Inner {
                actions,
                ui,
                prompts: PromptSlot::default(),
                history: Mutex::new(History::default()),
                fallback,
            }),
        }
    }

    pub fn action_names(&self) -> Vec<&'static str> {
        self.inner.actions.iter().map(|a| a.name()).collect()
    }

    fn classify(&self, text: &str) -> Intent {
        let words = normalize(text);
        if words.iter().all(|w| STOPWORDS.contains(&w.as_str())) {
            return Intent::Stopword;
        }
        if REPEAT_TRIGGERS.iter().any(|t| contains_phrase(&words, t)) {
            return Intent::Repeat;
        }
        self.inner
            .actions
            .iter()
            .find(|action| action.triggers().iter().any(|t| contains_phrase(&words, t)))
            .map(|action| Intent::Action(action.clone()))
            .unwrap_or(Intent::Unknown)
    }
}

impl Inner {
    fn history(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remember(&self, action: Option<Arc<dyn Action>>, input: String) {
        let mut history = self.history();
        history.last_action = action;
        history.last_input = Some(input);
    }

    async fn run_action(&self, action: &Arc<dyn Action>, input: String) -> Option<String> {
        let ctx = ActionContext::new(input, self.ui.clone(), self.prompts.clone());
        tracing::info!(action = action.name(), input = %ctx.input, "running action");
        match action.run(ctx).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(action = action.name(), "action failed: {:#}", err);
                Some(action.error_reply().to_string())
            }
        }
    }

    async fn respond(self: Arc<Self>, intent: Intent, text: String) -> Result<QueryReply> {
        match intent {
            Intent::Stopword => {
                self.remember(None, text);
                Ok(QueryReply::empty())
            }
            Intent::Repeat => {
                let last = {
                    let history = self.history();
                    history.last_action.clone().zip(history.last_input.clone())
                };
                match last {
                    Some((action, input)) => {
                        let reply = self.run_action(&action, input).await;
                        Ok(QueryReply::text(reply.unwrap_or_default()))
                    }
                    None => Ok(QueryReply::text("There is nothing to repeat yet.")),
                }
            }
            Intent::Action(action) => {
                let reply = self.run_action(&action, text.clone()).await;
                self.remember(Some(action), text);
                Ok(QueryReply::text(reply.unwrap_or_default()))
            }
            Intent::Unknown => {
                self.remember(None, text.clone());
                match &self.fallback {
                    Fallback::Reply(reply) => Ok(QueryReply::text(reply.clone())),
                    Fallback::Ollama { client, model } => {
                        tracing::info!(model = %model, "no action matched; asking Ollama");
                        let answer = client.query(model, &text).await?;
                        Ok(QueryReply::text(answer.trim()))
                    }
                }
            }
        }
    }
}

impl Backend for ActionBackend {
    fn query(&self, text: String) -> BoxFuture<'static, Result<QueryReply>> {
        let intent = self.classify(&text);
        let inner = self.inner.clone();
        Box::pin(inner.respond(intent, text))
    }

    fn prompt_answer(&self, text: String) {
        if !self.inner.prompts.answer(text) {
            tracing::warn!("prompt answer arrived with no question pending");
            self.inner.ui.send_message(NO_QUESTION_REPLY);
        }
    }
}

/// Lower-case words with punctuation stripped.
fn normalize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let phrase: Vec<&str> = phrase.split_whitespace().collect();
    if phrase.is_empty() || phrase.len() > words.len() {
        return false;
    }
    words
        .windows(phrase.len())
        .any(|window| window.iter().zip(&phrase).all(|(w, p)| w == p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BridgeEvent;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Echo;

    impl Action for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn triggers(&self) -> &'static [&'static str] {
            &["echo"]
        }

        fn run(&self, ctx: ActionContext) -> BoxFuture<'static, Result<Option<String>>> {
            Box::pin(async move { Ok(Some(format!("echo: {}", ctx.input))) })
        }
    }

    struct Broken;

    impl Action for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn triggers(&self) -> &'static [&'static str] {
            &["break it"]
        }

        fn error_reply(&self) -> &'static str {
            "It broke."
        }

        fn run(&self, _ctx: ActionContext) -> BoxFuture<'static, Result<Option<String>>> {
            Box::pin(async move { Err(anyhow!("always fails")) })
        }
    }

    fn backend(actions: Vec<Arc<dyn Action>>) -> (ActionBackend, UnboundedReceiver<BridgeEvent>) {
        let (ui, rx) = UiHandle::channel();
        let fallback = Fallback::Reply("Sorry, I did not understand that.".to_string());
        (ActionBackend::with_actions(actions, ui, fallback), rx)
    }

    fn builtin() -> (ActionBackend, UnboundedReceiver<BridgeEvent>) {
        let (ui, rx) = UiHandle::channel();
        (ActionBackend::new(&Config::default(), ui), rx)
    }

    async fn expect_prompt(rx: &mut UnboundedReceiver<BridgeEvent>) -> String {
        match rx.recv().await {
            Some(BridgeEvent::Prompt(prompt)) => prompt,
            other => panic!("expected a prompt, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize("Hey, what TIME is it?!"), vec!["hey", "what", "time", "is", "it"]);
    }

    #[test]
    fn test_contains_phrase_needs_whole_words() {
        let words = normalize("this is a random thought");
        assert!(contains_phrase(&words, "random"));
        assert!(!contains_phrase(&words, "hi"));
        assert!(!contains_phrase(&words, "random number"));
    }

    #[test]
    fn test_builtin_names() {
        let (backend, _rx) = builtin();
        assert_eq!(
            backend.action_names(),
            vec![
                "clear_chat",
                "random_number",
                "current_time",
                "tell_joke",
                "open_website",
                "greet"
            ]
        );
    }

    #[tokio::test]
    async fn test_stopwords_get_no_reply() {
        let (backend, _rx) = backend(vec![Arc::new(Echo)]);
        for text in ["ok", "Thank you!", "hmm..."] {
            let reply = backend.query(text.to_string()).await.unwrap();
            assert_eq!(reply, QueryReply::empty(), "{}", text);
        }
    }

    #[tokio::test]
    async fn test_unknown_message_uses_fallback_reply() {
        let (backend, _rx) = backend(vec![Arc::new(Echo)]);
        let reply = backend.query("what is the meaning of life".to_string()).await.unwrap();
        assert_eq!(reply, QueryReply::text("Sorry, I did not understand that."));
    }

    #[tokio::test]
    async fn test_action_error_becomes_error_reply() {
        let (backend, _rx) = backend(vec![Arc::new(Broken)]);
        let reply = backend.query("please break it".to_string()).await.unwrap();
        assert_eq!(reply, QueryReply::text("It broke."));
    }

    #[tokio::test]
    async fn test_repeat_reruns_last_action_with_last_input() {
        let (backend, _rx) = backend(vec![Arc::new(Echo)]);

        let nothing = backend.query("repeat".to_string()).await.unwrap();
        assert_eq!(nothing, QueryReply::text("There is nothing to repeat yet."));

        backend.query("echo hello".to_string()).await.unwrap();
        let again = backend.query("again please".to_string()).await.unwrap();
        assert_eq!(again, QueryReply::text("echo: echo hello"));
    }

    #[tokio::test]
    async fn test_unknown_message_forgets_last_action() {
        let (backend, _rx) = backend(vec![Arc::new(Echo)]);
        backend.query("echo hello".to_string()).await.unwrap();
        backend.query("something else".to_string()).await.unwrap();
        let again = backend.query("repeat".to_string()).await.unwrap();
        assert_eq!(again, QueryReply::text("There is nothing to repeat yet."));
    }

    async fn expect_message(rx: &mut UnboundedReceiver<BridgeEvent>) -> String {
        match rx.recv().await {
            Some(BridgeEvent::Message(text)) => text,
            other => panic!("expected a message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prompt_answer_without_question_is_reported() {
        let (backend, mut rx) = backend(vec![]);
        backend.prompt_answer("7".to_string());
        assert!(backend.inner.prompts.lock().is_none());
        assert_eq!(expect_message(&mut rx).await, NO_QUESTION_REPLY);
    }

    #[tokio::test]
    async fn test_prompt_answer_after_abandoned_question_is_reported() {
        let (backend, mut rx) = builtin();
        let pending = tokio::spawn(backend.query("random number".to_string()));
        expect_prompt(&mut rx).await;

        pending.abort();
        assert!(pending.await.is_err());

        backend.prompt_answer("5".to_string());
        assert_eq!(expect_message(&mut rx).await, NO_QUESTION_REPLY);
    }

    #[tokio::test]
    async fn test_random_number_prompts_for_range() {
        let (backend, mut rx) = builtin();
        let pending = tokio::spawn(backend.query("give me a random number".to_string()));

        assert_eq!(
            expect_prompt(&mut rx).await,
            "What is the smallest value the number may have?"
        );
        backend.prompt_answer("seven".to_string());
        assert_eq!(expect_prompt(&mut rx).await, "Please enter a whole number (e.g. 1).");
        backend.prompt_answer("5".to_string());
        assert_eq!(expect_prompt(&mut rx).await, "How large may the number be at most?");
        backend.prompt_answer(" 5 ".to_string());

        let reply = pending.await.unwrap().unwrap();
        assert_eq!(reply, QueryReply::text("Your number is 5."));
    }

    #[tokio::test]
    async fn test_random_number_swaps_reversed_bounds() {
        let (backend, mut rx) = builtin();
        let pending = tokio::spawn(backend.query("pick a number".to_string()));

        expect_prompt(&mut rx).await;
        backend.prompt_answer("9".to_string());
        expect_prompt(&mut rx).await;
        backend.prompt_answer("3".to_string());

        let reply = pending.await.unwrap().unwrap();
        let text = reply.response.unwrap();
        let number: i64 = text
            .trim_start_matches("Your number is ")
            .trim_end_matches('.')
            .parse()
            .unwrap();
        assert!((3..=9).contains(&number));
    }

    #[tokio::test]
    async fn test_clear_chat_intent() {
        let (backend, mut rx) = builtin();
        let reply = backend.query("Please clear the chat".to_string()).await.unwrap();
        assert_eq!(reply, QueryReply::text("The chat has been cleared."));
        assert!(matches!(rx.recv().await, Some(BridgeEvent::ClearTranscript)));
    }

    #[tokio::test]
    async fn test_greeting_intent() {
        let (backend, _rx) = builtin();
        let reply = backend.query("Hi there".to_string()).await.unwrap();
        assert_eq!(reply, QueryReply::text("Hello! How can I help you?"));
    }
}
