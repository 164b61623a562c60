use ratatui::layout::Rect;

use crate::controller::{ExchangeController, ExchangeState};

pub struct App {
    pub should_quit: bool,
    pub title: String,
    pub controller: ExchangeController,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub transcript_area: Option<Rect>,
    pub send_area: Option<Rect>,
}

impl App {
    pub fn new(title: impl Into<String>, controller: ExchangeController) -> Self {
        Self {
            should_quit: false,
            title: title.into(),
            controller,
            animation_frame: 0,
            transcript_area: None,
            send_area: None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.controller.state() == ExchangeState::AwaitingReply
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_waiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        } else {
            self.animation_frame = 0;
        }
    }
}
