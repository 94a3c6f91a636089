//! UI-agnostic transcript types
//!
//! The transcript is append-only: messages are never edited or removed, and
//! insertion order is display order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque message identifier. Ids grow with insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The sender of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Role name used by chat-completion APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single entry in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub role: Role,
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Ordered message history for one session.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
    seed: Option<MessageId>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transcript whose first message is an assistant greeting.
    /// The greeting is displayed but left out of [`Transcript::conversation`].
    pub fn seeded(welcome: &str) -> Self {
        let mut transcript = Self::new();
        let id = transcript.append(welcome, Role::Assistant);
        transcript.seed = Some(id);
        transcript
    }

    pub fn append(&mut self, text: impl Into<String>, role: Role) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            text: text.into(),
            role,
        });
        id
    }

    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Messages that take part in the conversation with the model.
    pub fn conversation(&self) -> impl Iterator<Item = &Message> {
        let seed = self.seed;
        self.messages.iter().filter(move |m| Some(m.id) != seed)
    }

    pub fn seed_id(&self) -> Option<MessageId> {
        self.seed
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
