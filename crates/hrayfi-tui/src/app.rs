use std::sync::Arc;

use hrayfi_core::{
    ChatError, ChatSession, CompletionBackend, Config, OpenRouterClient, PendingRequest,
    SubmitOutcome,
};
use ratatui::layout::Rect;
use tokio::task::JoinHandle;

use crate::ui;

/// The request currently running on a background task.
pub struct InFlight {
    pending: PendingRequest,
    task: JoinHandle<Result<Option<String>, ChatError>>,
}

pub struct App {
    pub should_quit: bool,
    pub session: ChatSession,
    pub backend: Arc<dyn CompletionBackend>,
    pub in_flight: Option<InFlight>,

    // Input editing
    pub input_cursor: usize, // cursor position in chars

    // Chat scrolling
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the chat area, updated on render
    pub chat_width: u16,  // Inner width of the chat area, updated on render

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Areas for mouse hit-testing (updated during render)
    pub button_area: Option<Rect>,
    pub panel_area: Option<Rect>,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let client = OpenRouterClient::from_config(config);
        Self::with_backend(Arc::new(client), config.model())
    }

    pub fn with_backend(backend: Arc<dyn CompletionBackend>, model: &str) -> Self {
        Self {
            should_quit: false,
            session: ChatSession::new(model),
            backend,
            in_flight: None,
            input_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            button_area: None,
            panel_area: None,
        }
    }

    pub fn open_panel(&mut self) {
        self.session.open();
        self.scroll_chat_to_bottom();
    }

    pub fn close_panel(&mut self) {
        self.session.close();
    }

    /// Submit the input buffer and run the request on a background task.
    pub fn send(&mut self) {
        let pending = match self.session.submit_input() {
            SubmitOutcome::Dispatched(pending) => pending,
            SubmitOutcome::Rejected(_) => return,
        };

        let backend = Arc::clone(&self.backend);
        let request = pending.request().clone();
        let task = tokio::spawn(async move { backend.complete(&request).await });

        self.in_flight = Some(InFlight { pending, task });
        self.input_cursor = 0;
        self.animation_frame = 0;

        // Scroll to bottom so "thinking" is visible
        self.scroll_chat_to_bottom();
    }

    /// Record the reply once the background request has finished.
    pub async fn poll_reply(&mut self) {
        let finished = self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.task.is_finished());
        if !finished {
            return;
        }

        if let Some(InFlight { pending, task }) = self.in_flight.take() {
            let result = task
                .await
                .unwrap_or_else(|err| Err(ChatError::Task(err.to_string())));
            self.session.finish(pending, result);
            self.scroll_chat_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = (self.chat_scroll + 1).min(self.max_chat_scroll());
    }

    /// Scroll chat to bottom so the latest message is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    fn max_chat_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            16
        };
        self.chat_line_count().saturating_sub(visible_height)
    }

    /// Rendered height of the chat once wrapped to the chat width.
    pub fn chat_line_count(&self) -> u16 {
        // Before the first render the chat width is unknown; assume the default panel
        let wrap_width = if self.chat_width > 0 {
            self.chat_width
        } else {
            46
        };

        let lines = ui::chat_paragraph(self).line_count(wrap_width);
        u16::try_from(lines).unwrap_or(u16::MAX)
    }
}
