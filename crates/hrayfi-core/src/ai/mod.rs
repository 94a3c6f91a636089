pub mod openrouter;

pub use openrouter::{CompletionRequest, OpenRouterClient, RequestMessage};

use async_trait::async_trait;

use crate::error::ChatError;

/// Something that can turn a chat request into a reply.
///
/// `Ok(None)` means the endpoint answered but carried no usable content.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, ChatError>;
}
