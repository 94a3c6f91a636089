//! Chat session state and the submit/complete cycle.
//!
//! A submission is split in two so the caller decides how to await the
//! network: [`ChatSession::begin_submit`] runs synchronously and hands back a
//! [`PendingRequest`], and [`ChatSession::finish`] records the outcome.
//! [`ChatSession::submit`] chains both for callers that can simply await.

use tracing::{debug, error, warn};

use crate::ai::{CompletionBackend, CompletionRequest};
use crate::error::ChatError;
use crate::persona::{ERROR_REPLY, FALLBACK_REPLY, WELCOME_MESSAGE};
use crate::state::{Message, MessageId, Role, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
}

/// Why a submission was ignored. Neither case touches the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The text was empty or whitespace only.
    EmptyInput,
    /// A request is already in flight.
    Busy,
}

/// Ticket for the request that is currently in flight.
///
/// Only [`ChatSession::begin_submit`] creates one, and [`ChatSession::finish`]
/// consumes it, so each dispatched request completes exactly once.
#[derive(Debug)]
#[must_use = "a pending request must be passed back to ChatSession::finish"]
pub struct PendingRequest {
    user_message: MessageId,
    request: CompletionRequest,
}

impl PendingRequest {
    pub fn user_message(&self) -> MessageId {
        self.user_message
    }

    pub fn request(&self) -> &CompletionRequest {
        &self.request
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Dispatched(PendingRequest),
    Rejected(Rejection),
}

pub struct ChatSession {
    transcript: Transcript,
    model: String,
    is_open: bool,
    input: String,
    phase: Phase,
}

impl ChatSession {
    pub fn new(model: &str) -> Self {
        Self {
            transcript: Transcript::seeded(WELCOME_MESSAGE),
            model: model.to_string(),
            is_open: false,
            input: String::new(),
            phase: Phase::Idle,
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.snapshot()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Submitting
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn open(&mut self) {
        self.is_open = true;
    }

    /// Hide the panel. An in-flight request keeps running.
    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn toggle(&mut self) {
        self.is_open = !self.is_open;
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Whether submitting now would dispatch a request.
    pub fn can_send(&self) -> bool {
        !self.is_loading() && !self.input.trim().is_empty()
    }

    /// Submit whatever is in the input buffer.
    pub fn submit_input(&mut self) -> SubmitOutcome {
        let text = self.input.clone();
        self.begin_submit(&text)
    }

    /// Validate, record the user message and build the outbound request.
    pub fn begin_submit(&mut self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            debug!("ignoring empty submission");
            return SubmitOutcome::Rejected(Rejection::EmptyInput);
        }
        if self.is_loading() {
            warn!("ignoring submission while a request is in flight");
            return SubmitOutcome::Rejected(Rejection::Busy);
        }

        self.phase = Phase::Submitting;
        let user_message = self.transcript.append(text, Role::User);
        self.input.clear();

        let request = CompletionRequest::from_transcript(&self.model, &self.transcript);
        debug!(%user_message, messages = request.messages.len(), "submission dispatched");

        SubmitOutcome::Dispatched(PendingRequest {
            user_message,
            request,
        })
    }

    /// Record the outcome of a dispatched request as one assistant message
    /// and return to idle. Failures become a fixed apology.
    pub fn finish(
        &mut self,
        pending: PendingRequest,
        result: Result<Option<String>, ChatError>,
    ) -> MessageId {
        let text = match result {
            Ok(Some(content)) if !content.is_empty() => content,
            Ok(_) => {
                warn!(
                    user_message = %pending.user_message,
                    "completion had no content, using fallback reply"
                );
                FALLBACK_REPLY.to_string()
            }
            Err(err) => {
                error!(
                    user_message = %pending.user_message,
                    error = %err,
                    "completion request failed"
                );
                ERROR_REPLY.to_string()
            }
        };

        self.phase = Phase::Idle;
        self.transcript.append(text, Role::Assistant)
    }

    /// Full submit cycle against `backend`. Returns the id of the assistant
    /// message, or the reason nothing was sent.
    pub async fn submit<B>(&mut self, backend: &B, text: &str) -> Result<MessageId, Rejection>
    where
        B: CompletionBackend + ?Sized,
    {
        let pending = match self.begin_submit(text) {
            SubmitOutcome::Dispatched(pending) => pending,
            SubmitOutcome::Rejected(rejection) => return Err(rejection),
        };
        let result = backend.complete(pending.request()).await;
        Ok(self.finish(pending, result))
    }
}
