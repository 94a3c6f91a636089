//! Fixed strings that give the assistant its voice.

/// Name sent as the `X-Title` header and shown in the panel header.
pub const ASSISTANT_TITLE: &str = "Hrayfi Assistant";

/// Seed message shown when the session starts. Never sent to the model.
pub const WELCOME_MESSAGE: &str =
    "Hello! I am the Hrayfi Assistant. How can I help you with Moroccan artisan products today?";

/// System instruction that opens every outbound request.
pub const SYSTEM_PROMPT: &str = "You are the Hrayfi Assistant, an expert in Moroccan artisan products. Provide helpful, culturally-aware recommendations. Be polite, concise, and helpful.";

/// Used when the endpoint answers successfully but without any content.
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't process your request right now.";

/// Used when the request fails outright (transport error or non-2xx status).
pub const ERROR_REPLY: &str =
    "There was an error communicating with the AI. Please try again later.";
