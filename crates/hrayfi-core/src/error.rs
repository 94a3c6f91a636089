use thiserror::Error;

/// Failure of a single completion request.
///
/// None of these reach the end user: the session turns every variant into
/// the same apology message and only logs the detail.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The endpoint answered with a non-success status.
    #[error("API error: {status} - {}", .message.as_deref().unwrap_or("Unknown error"))]
    Api { status: u16, message: Option<String> },

    /// No response was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success status whose body was not valid JSON.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The task running the request stopped before producing a result.
    #[error("request task failed: {0}")]
    Task(String),
}
