use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::media::AudioAsset;

pub mod openai;

pub use openai::OpenAiClient;

#[derive(thiserror::Error, Debug)]
pub enum TranscriptionError {
    #[error("transcription request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transcription service rejected the request: {0}")]
    Api(String),
}

#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation service rejected the request: {0}")]
    Api(String),
}

/// Speech-to-text backend.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribe the audio track. `prompt` is optional guidance for the
    /// model; an empty string means none.
    async fn transcribe(
        &self,
        audio: &AudioAsset,
        language: &str,
        prompt: &str,
    ) -> Result<String, TranscriptionError>;
}

/// Text-generation backend producing the raw (untrusted) content reply.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(
        &self,
        instruction: &str,
        transcript_excerpt: &str,
    ) -> Result<String, GenerationError>;
}
