use std::sync::Arc;

use anyhow::Result;

mod app;
mod backend;
mod bridge;
mod config;
mod controller;
mod handler;
mod input;
mod logging;
mod state;
mod transcript;
mod tui;
mod ui;

use app::App;
use backend::{ActionBackend, OllamaClient};
use bridge::UiHandle;
use config::Config;
use controller::ExchangeController;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    let log_path = logging::init(&config.log_level)?;
    tracing::info!(log = %log_path.display(), "starting chatbridge");

    // Write the defaults out on first run so there is a file to edit
    let config_path = Config::get_config_path()?;
    if !config_path.exists() {
        match config.save() {
            Ok(()) => tracing::info!(path = %config_path.display(), "wrote default config"),
            Err(err) => tracing::warn!("could not write default config: {:#}", err),
        }
    }

    let (ui_handle, mut bridge_events) = UiHandle::channel();

    if let Some(model) = &config.fallback_model {
        if let Some(notice) = check_fallback_model(&config.ollama_url, model).await {
            ui_handle.send_message(notice);
        }
    }

    let backend = ActionBackend::new(&config, ui_handle.clone());
    tracing::info!(actions = ?backend.action_names(), "local backend ready");

    let controller = ExchangeController::new(
        config.welcome_message.clone(),
        Arc::new(backend),
        &ui_handle,
        config.exchange_options(),
    );
    let mut app = App::new(config.title.clone(), controller);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    app.controller.on_load();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            // One event at a time; each runs to completion before the next
            tokio::select! {
                Some(event) = events.next() => handler::handle_event(&mut app, event),
                Some(event) = bridge_events.recv() => app.controller.handle_bridge_event(event),
                else => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    tracing::info!("shutting down");
    result
}

/// Check the configured fallback model up front. Returns a notice for the chat
/// when it isn't usable; never fatal.
async fn check_fallback_model(ollama_url: &str, model: &str) -> Option<String> {
    let client = OllamaClient::new(ollama_url);
    match client.has_model(model).await {
        Ok(true) => {
            tracing::info!(model, "fallback model available");
            None
        }
        Ok(false) => {
            tracing::warn!(model, "fallback model not found");
            Some(format!("Model {} is not installed. Run: ollama pull {}", model, model))
        }
        Err(err) => {
            tracing::warn!("could not reach Ollama at {}: {:#}", ollama_url, err);
            Some("Ollama is not reachable. Make sure it is running with: ollama serve".to_string())
        }
    }
}
