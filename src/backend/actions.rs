//! Built-in actions of the local backend.

use anyhow::{anyhow, Result};
use futures_util::future::BoxFuture;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;

use super::{Action, ActionContext};

pub struct Greet {
    user_name: Option<String>,
}

impl Greet {
    pub fn new(user_name: Option<String>) -> Self {
        Self { user_name }
    }
}

impl Action for Greet {
    fn name(&self) -> &'static str {
        "greet"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &["hello", "hi", "hey", "good morning", "good evening", "greetings"]
    }

    fn run(&self, _ctx: ActionContext) -> BoxFuture<'static, Result<Option<String>>> {
        let reply = match &self.user_name {
            Some(name) => format!("Hello {}! How can I help you?", name),
            None => "Hello! How can I help you?".to_string(),
        };
        Box::pin(async move { Ok(Some(reply)) })
    }
}

pub struct CurrentTime;

impl Action for CurrentTime {
    fn name(&self) -> &'static str {
        "current_time"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &["what time", "time is it", "current time", "clock"]
    }

    fn error_reply(&self) -> &'static str {
        "Sorry, I couldn't read the clock."
    }

    fn run(&self, _ctx: ActionContext) -> BoxFuture<'static, Result<Option<String>>> {
        let now = chrono::Local::now();
        Box::pin(async move { Ok(Some(format!("It is {}.", now.format("%H:%M")))) })
    }
}

/// Asks for a range through two prompts and picks a number inside it.
pub struct RandomNumber;

impl RandomNumber {
    async fn fetch_number(ctx: &ActionContext, prompt: &str) -> Result<i64> {
        let mut answer = ctx.request_input(prompt).await?;
        loop {
            match answer.trim().parse::<i64>() {
                Ok(n) => return Ok(n),
                Err(_) => {
                    answer = ctx
                        .request_input("Please enter a whole number (e.g. 1).")
                        .await?;
                }
            }
        }
    }
}

impl Action for RandomNumber {
    fn name(&self) -> &'static str {
        "random_number"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &["random number", "pick a number", "roll a number", "random"]
    }

    fn error_reply(&self) -> &'static str {
        "Sorry, I couldn't pick a number."
    }

    fn run(&self, ctx: ActionContext) -> BoxFuture<'static, Result<Option<String>>> {
        Box::pin(async move {
            let smallest =
                Self::fetch_number(&ctx, "What is the smallest value the number may have?").await?;
            let biggest = Self::fetch_number(&ctx, "How large may the number be at most?").await?;

            let (low, high) = if smallest <= biggest {
                (smallest, biggest)
            } else {
                (biggest, smallest)
            };
            let number = rand::thread_rng().gen_range(low..=high);
            Ok(Some(format!("Your number is {}.", number)))
        })
    }
}

#[derive(Deserialize)]
struct JokeResponse {
    joke: Option<String>,
}

pub struct TellJoke {
    client: Client,
    url: String,
}

impl TellJoke {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }
}

impl Action for TellJoke {
    fn name(&self) -> &'static str {
        "tell_joke"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &["joke", "make me laugh", "something funny"]
    }

    fn error_reply(&self) -> &'static str {
        "Sorry, I couldn't think of a joke right now."
    }

    fn run(&self, _ctx: ActionContext) -> BoxFuture<'static, Result<Option<String>>> {
        let client = self.client.clone();
        let url = self.url.clone();
        Box::pin(async move {
            let response = client.get(&url).send().await?;
            if !response.status().is_success() {
                return Err(anyhow!("joke service answered {}", response.status()));
            }
            let body: JokeResponse = response.json().await?;
            let joke = body.joke.ok_or_else(|| anyhow!("joke service sent no joke"))?;
            Ok(Some(joke))
        })
    }
}

/// Opens the first URL-looking word of the message in the default browser.
pub struct OpenWebsite {
    opener: fn(&str) -> std::io::Result<()>,
}

impl Default for OpenWebsite {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenWebsite {
    pub fn new() -> Self {
        Self::with_opener(|url| open::that(url))
    }

    pub fn with_opener(opener: fn(&str) -> std::io::Result<()>) -> Self {
        Self { opener }
    }
}

impl Action for OpenWebsite {
    fn name(&self) -> &'static str {
        "open_website"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &["open", "visit", "go to", "website"]
    }

    fn error_reply(&self) -> &'static str {
        "Sorry, I couldn't find a website to open in that message."
    }

    fn run(&self, ctx: ActionContext) -> BoxFuture<'static, Result<Option<String>>> {
        let opener = self.opener;
        Box::pin(async move {
            let url = find_url(&ctx.input).ok_or_else(|| anyhow!("no website in \"{}\"", ctx.input))?;
            let target = url.clone();
            // Launching the browser may block until the launcher exits
            tokio::task::spawn_blocking(move || opener(&target)).await??;
            Ok(Some(format!("Opening {}.", url)))
        })
    }
}

/// First word of `text` that looks like a web address, with a scheme added if missing.
pub fn find_url(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| {
                matches!(c, '"' | '\'' | '(' | ')' | '<' | '>' | ',' | '.' | '!' | '?' | ';')
            })
        })
        .find(|word| looks_like_url(word))
        .map(|word| {
            if word.contains("://") {
                word.to_string()
            } else {
                format!("https://{}", word)
            }
        })
}

fn looks_like_url(word: &str) -> bool {
    if let Some((scheme, rest)) = word.split_once("://") {
        return matches!(scheme.to_ascii_lowercase().as_str(), "http" | "https") && !rest.is_empty();
    }
    let host = word.split('/').next().unwrap_or_default();
    match host.rsplit_once('.') {
        Some((name, tld)) => {
            !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
                && tld.len() >= 2
                && tld.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

/// Clears the transcript and confirms it.
pub struct ClearChat;

impl Action for ClearChat {
    fn name(&self) -> &'static str {
        "clear_chat"
    }

    fn triggers(&self) -> &'static [&'static str] {
        &["clear chat", "clear the chat", "clear history", "wipe chat"]
    }

    fn run(&self, ctx: ActionContext) -> BoxFuture<'static, Result<Option<String>>> {
        ctx.ui().clear_chat();
        Box::pin(async move { Ok(Some("The chat has been cleared.".to_string())) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PromptSlot;
    use crate::bridge::{BridgeEvent, UiHandle};

    fn context(input: &str) -> (ActionContext, tokio::sync::mpsc::UnboundedReceiver<BridgeEvent>) {
        let (ui, rx) = UiHandle::channel();
        (ActionContext::new(input.to_string(), ui, PromptSlot::default()), rx)
    }

    #[tokio::test]
    async fn test_greet_uses_configured_name() {
        let (ctx, _rx) = context("hi");
        let reply = Greet::new(Some("Ada".to_string())).run(ctx).await.unwrap();
        assert_eq!(reply.as_deref(), Some("Hello Ada! How can I help you?"));
    }

    #[tokio::test]
    async fn test_current_time_format() {
        let (ctx, _rx) = context("what time is it");
        let reply = CurrentTime.run(ctx).await.unwrap().unwrap();
        // "It is HH:MM."
        assert_eq!(reply.len(), "It is 00:00.".len());
        assert!(reply.starts_with("It is "));
    }

    #[tokio::test]
    async fn test_clear_chat_asks_ui_and_confirms() {
        let (ctx, mut rx) = context("clear chat");
        let reply = ClearChat.run(ctx).await.unwrap();
        assert_eq!(reply.as_deref(), Some("The chat has been cleared."));
        assert!(matches!(rx.recv().await, Some(BridgeEvent::ClearTranscript)));
    }

    #[test]
    fn test_find_url_picks_first_address() {
        assert_eq!(
            find_url("please open example.com and rust-lang.org").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            find_url("visit (http://localhost:8080/docs).").as_deref(),
            Some("http://localhost:8080/docs")
        );
        assert_eq!(
            find_url("go to www.example.org/path?q=1!").as_deref(),
            Some("https://www.example.org/path?q=1")
        );
    }

    #[test]
    fn test_find_url_ignores_plain_words() {
        assert_eq!(find_url("open the website e.g. later"), None);
        assert_eq!(find_url("version 1.20 is out"), None);
        assert_eq!(find_url("ftp://example.com"), None);
        assert_eq!(find_url(""), None);
    }

    fn open_ok(_url: &str) -> std::io::Result<()> {
        Ok(())
    }

    fn open_fails(_url: &str) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no browser"))
    }

    #[tokio::test]
    async fn test_open_website_reports_url() {
        let (ctx, _rx) = context("open example.com please");
        let reply = OpenWebsite::with_opener(open_ok).run(ctx).await.unwrap();
        assert_eq!(reply.as_deref(), Some("Opening https://example.com."));
    }

    #[tokio::test]
    async fn test_open_website_fails_without_url_or_browser() {
        let (ctx, _rx) = context("open something");
        assert!(OpenWebsite::with_opener(open_ok).run(ctx).await.is_err());

        let (ctx, _rx) = context("open example.com");
        assert!(OpenWebsite::with_opener(open_fails).run(ctx).await.is_err());
    }
}
