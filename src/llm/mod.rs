pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("completion response had no text content")]
    EmptyResponse,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Opaque text-completion boundary. One prompt in, generated text out; model
/// and temperature are chosen by the caller per request.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        model: &str,
        temperature: f32,
        prompt: &str,
    ) -> Result<Completion, CompletionError>;
}
