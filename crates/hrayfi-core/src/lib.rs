pub mod ai;
pub mod config;
pub mod error;
pub mod persona;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::{CompletionBackend, CompletionRequest, OpenRouterClient, RequestMessage};
pub use config::Config;
pub use error::ChatError;
pub use session::{ChatSession, PendingRequest, Phase, Rejection, SubmitOutcome};
pub use state::{Message, MessageId, Role, Transcript};
