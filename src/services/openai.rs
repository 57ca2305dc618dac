use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart;
use serde_json::{json, Value};

use super::{GenerationError, GenerationService, TranscriptionError, TranscriptionService};
use crate::config::Config;
use crate::media::AudioAsset;

/// Uploads can be large; allow plenty of time end to end.
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// OpenAI-backed implementation of both service traits.
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    api_base: String,
    whisper_model: String,
    chat_model: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String, config: &Config) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            api_base: config.openai.api_base.trim_end_matches('/').to_string(),
            whisper_model: config.openai.whisper_model.clone(),
            chat_model: config.openai.chat_model.clone(),
            client,
        })
    }

    fn transcription_url(&self) -> String {
        format!("{}/audio/transcriptions", self.api_base)
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl TranscriptionService for OpenAiClient {
    async fn transcribe(
        &self,
        audio: &AudioAsset,
        language: &str,
        prompt: &str,
    ) -> Result<String, TranscriptionError> {
        let part = multipart::Part::bytes(audio.bytes.clone())
            .file_name(audio.filename.clone())
            .mime_str(audio.mime_type())?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("model", self.whisper_model.clone())
            .text("language", language.to_string())
            .text("response_format", "text");
        if !prompt.is_empty() {
            form = form.text("prompt", prompt.to_string());
        }

        tracing::debug!(
            "Uploading {} ({} bytes) for transcription",
            audio.filename,
            audio.bytes.len()
        );

        let response = self
            .client
            .post(self.transcription_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TranscriptionError::Api(api_error_message(&body)));
        }

        // response_format=text makes the body the transcript itself
        Ok(body.trim().to_string())
    }
}

#[async_trait]
impl GenerationService for OpenAiClient {
    async fn generate(
        &self,
        instruction: &str,
        transcript_excerpt: &str,
    ) -> Result<String, GenerationError> {
        let payload = json!({
            "model": self.chat_model,
            "messages": [
                {"role": "system", "content": instruction},
                {"role": "user", "content": transcript_excerpt},
            ],
            "temperature": 0.7,
        });

        let response = self
            .client
            .post(self.chat_completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GenerationError::Api(api_error_message(&body)));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|err| GenerationError::Api(format!("unreadable response: {err}")))?;

        message_content(&value)
            .map(str::to_string)
            .ok_or_else(|| GenerationError::Api("response had no message content".to_string()))
    }
}

/// Pull the human-readable message out of an OpenAI error body, falling back
/// to a bounded slice of the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(|message| message.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

fn message_content(value: &Value) -> Option<&str> {
    value
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_follow_the_configured_base() {
        let mut config = Config::default();
        config.openai.api_base = "http://localhost:9099/v1/".to_string();

        let client = OpenAiClient::new("test-key".to_string(), &config).unwrap();
        assert_eq!(
            client.transcription_url(),
            "http://localhost:9099/v1/audio/transcriptions"
        );
        assert_eq!(
            client.chat_completions_url(),
            "http://localhost:9099/v1/chat/completions"
        );
    }

    #[test]
    fn test_api_error_message_prefers_the_structured_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(api_error_message(body), "Incorrect API key provided");
    }

    #[test]
    fn test_api_error_message_falls_back_to_the_raw_body() {
        assert_eq!(api_error_message("502 Bad Gateway"), "502 Bad Gateway");

        let long = "x".repeat(500);
        assert_eq!(api_error_message(&long).chars().count(), 200);
    }

    #[test]
    fn test_message_content_reads_the_first_choice() {
        let value = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "hello"}}
            ]
        });
        assert_eq!(message_content(&value), Some("hello"));
    }

    #[test]
    fn test_message_content_handles_missing_choices() {
        assert_eq!(message_content(&json!({"choices": []})), None);
        assert_eq!(message_content(&json!({})), None);
    }
}
