use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::content::{ContentBundle, ContentNormalizer, ContentRequest};
use crate::media::{AudioAsset, ExtractionError, MediaAsset, MediaExtractor, MediaKind};
use crate::services::{GenerationService, OpenAiClient, TranscriptionError, TranscriptionService};

/// Where a run currently is, and where a failed run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Extracting,
    Transcribing,
    Generating,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Extracting => "extracting audio",
            PipelineStage::Transcribing => "transcribing",
            PipelineStage::Generating => "generating content",
        };
        write!(f, "{name}")
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),
}

/// A run that stopped before producing a transcript.
///
/// When extraction already succeeded, the extracted audio rides along in
/// `recovered_audio` so the caller can keep it for a retry instead of paying
/// for extraction twice.
#[derive(thiserror::Error, Debug)]
#[error("pipeline failed while {stage}: {source}")]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    #[source]
    pub source: StageError,
    pub recovered_audio: Option<AudioAsset>,
}

/// Everything a finished run produced. `bundle` is absent when content
/// generation was skipped; `warning` then says why. `audio` carries the
/// extracted track when the input was a video.
#[derive(Debug)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub transcript: String,
    pub bundle: Option<ContentBundle>,
    pub warning: Option<String>,
    pub audio: Option<AudioAsset>,
    pub completed_at: DateTime<Utc>,
}

/// Drives one upload through extraction, transcription and generation.
///
/// Extraction and transcription failures end the run. Generation problems do
/// not: by then the expensive work is done, so the transcript is returned
/// with a warning instead of being thrown away.
pub struct Pipeline {
    config: Config,
    extractor: MediaExtractor,
    transcriber: Box<dyn TranscriptionService>,
    normalizer: ContentNormalizer,
}

impl Pipeline {
    pub fn new(config: Config) -> crate::Result<Self> {
        let api_key = config.api_key()?;
        let client = OpenAiClient::new(api_key, &config)?;
        Ok(Self::with_services(
            config,
            Box::new(client.clone()),
            Box::new(client),
        ))
    }

    /// Build a pipeline with explicit service implementations.
    pub fn with_services(
        config: Config,
        transcriber: Box<dyn TranscriptionService>,
        generator: Box<dyn GenerationService>,
    ) -> Self {
        let extractor = MediaExtractor::from_config(&config);
        Self {
            config,
            extractor,
            transcriber,
            normalizer: ContentNormalizer::new(generator),
        }
    }

    pub async fn run(
        &self,
        asset: MediaAsset,
        request: &ContentRequest,
        guidance_prompt: &str,
    ) -> Result<PipelineReport, PipelineFailure> {
        let run_id = Uuid::new_v4();
        tracing::info!(
            "[{}] Received '{}' ({}, {} bytes declared)",
            run_id,
            asset.filename,
            asset.kind.as_str(),
            asset.declared_size
        );

        let (audio, extracted) = match asset.kind {
            MediaKind::Video => {
                tracing::info!("[{}] Stage: {}", run_id, PipelineStage::Extracting);
                let audio = self.extractor.extract(&asset).await.map_err(|err| {
                    PipelineFailure {
                        stage: PipelineStage::Extracting,
                        source: err.into(),
                        recovered_audio: None,
                    }
                })?;
                (audio, true)
            }
            // audio uploads go straight to transcription
            MediaKind::Audio => (asset.into_audio(), false),
        };

        tracing::info!("[{}] Stage: {}", run_id, PipelineStage::Transcribing);
        let transcript = match self
            .transcriber
            .transcribe(&audio, &self.config.transcription.language, guidance_prompt)
            .await
        {
            Ok(transcript) => transcript,
            Err(err) => {
                return Err(PipelineFailure {
                    stage: PipelineStage::Transcribing,
                    source: err.into(),
                    recovered_audio: extracted.then_some(audio),
                });
            }
        };
        tracing::info!(
            "[{}] Transcript ready ({} chars)",
            run_id,
            transcript.chars().count()
        );

        tracing::info!("[{}] Stage: {}", run_id, PipelineStage::Generating);
        let (bundle, warning) = match self.normalizer.normalize(&transcript, request).await {
            Ok(bundle) => (Some(bundle), None),
            Err(err) => {
                tracing::warn!("[{}] Content generation skipped: {}", run_id, err);
                (None, Some(err.to_string()))
            }
        };

        tracing::info!("[{}] Done", run_id);
        Ok(PipelineReport {
            run_id,
            transcript,
            bundle,
            warning,
            audio: extracted.then_some(audio),
            completed_at: Utc::now(),
        })
    }
}
